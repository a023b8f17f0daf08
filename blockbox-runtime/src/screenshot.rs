//! Container screenshots: capture strategies, downscaling, encoding and delivery.
//!
//! Capture goes through an ordered list of strategies chosen per platform. A
//! strategy failure is logged and the next one is tried; the user only sees
//! an error when every strategy fails. The loading overlay added to the
//! container is removed on every exit path.

use async_trait::async_trait;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::oneshot;

use blockbox_core::feature::ImageFormat;
use blockbox_core::markup::{escape_html, Element, Node};
use blockbox_core::render::ACTIONS_CLASS;

use crate::binder::ScreenshotBinding;
use crate::busy::{BusyAction, BusySet};
use crate::clipboard::{Blob, Clipboard, ClipboardImage};
use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::toast::{Notifier, Toast, ToastKind};

pub const LOADING_CLASS: &str = "blockbox-screenshot-loading";

// --- Platform detection ---

/// Browser traits that decide strategy order and canvas limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Platform {
    pub apple: bool,
    pub safari: bool,
    pub mobile: bool,
}

impl Platform {
    /// Detect from the user agent and `navigator.maxTouchPoints`. iPadOS
    /// reports a desktop Mac user agent, so touch support on "Macintosh"
    /// counts as an Apple mobile device.
    pub fn detect(user_agent: &str, max_touch_points: u32) -> Platform {
        static APPLE_REGEX: OnceLock<Regex> = OnceLock::new();
        static MOBILE_REGEX: OnceLock<Regex> = OnceLock::new();
        static NOT_SAFARI_REGEX: OnceLock<Regex> = OnceLock::new();
        let apple_re = APPLE_REGEX.get_or_init(|| Regex::new(r"iPhone|iPad|iPod|Macintosh").unwrap());
        let mobile_re = MOBILE_REGEX.get_or_init(|| Regex::new(r"Mobi|Android|iPhone|iPad|iPod").unwrap());
        let not_safari_re = NOT_SAFARI_REGEX
            .get_or_init(|| Regex::new(r"Chrome|Chromium|CriOS|FxiOS|EdgiOS|Edg/|OPR|Android").unwrap());

        let ipados = user_agent.contains("Macintosh") && max_touch_points > 1;
        Platform {
            apple: apple_re.is_match(user_agent),
            safari: user_agent.contains("Safari") && !not_safari_re.is_match(user_agent),
            mobile: mobile_re.is_match(user_agent) || ipados,
        }
    }

    // Desktop Chrome and Firefox on a Mac get the full canvas.
    fn constrained(&self) -> bool {
        self.safari || self.mobile
    }

    pub fn max_canvas_dimension(&self, config: &RuntimeConfig) -> u32 {
        if self.constrained() {
            config.max_canvas_constrained
        } else {
            config.max_canvas_desktop
        }
    }

    /// Strategies to try, in order.
    /// WebKit engines (Safari, and every browser on iOS/iPadOS) prefer html-to-image.
    pub fn strategy_order(&self) -> [StrategyKind; 3] {
        if self.safari || (self.apple && self.mobile) {
            [StrategyKind::HtmlToImage, StrategyKind::Html2Canvas, StrategyKind::ForeignObject]
        } else {
            [StrategyKind::Html2Canvas, StrategyKind::HtmlToImage, StrategyKind::ForeignObject]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// DOM-to-raster library that handles WebKit quirks
    HtmlToImage,
    /// Generic DOM-to-canvas library
    Html2Canvas,
    /// SVG `<foreignObject>` drawn onto a canvas, no library needed
    ForeignObject,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::HtmlToImage => "html-to-image",
            StrategyKind::Html2Canvas => "html2canvas",
            StrategyKind::ForeignObject => "foreign-object",
        }
    }
}

// --- Capture planning ---

/// Layout size of the captured element as measured by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementMetrics {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

/// Output scale and pixel size for one capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturePlan {
    pub scale: f64,
    pub width: u32,
    pub height: u32,
}

impl CapturePlan {
    /// Scale at the device pixel ratio, reduced so neither side exceeds `max_dimension`.
    pub fn fit(metrics: &ElementMetrics, max_dimension: u32) -> CapturePlan {
        let width = metrics.width.max(1.0);
        let height = metrics.height.max(1.0);
        let mut scale = if metrics.device_pixel_ratio > 0.0 { metrics.device_pixel_ratio } else { 1.0 };
        let max = max_dimension as f64;
        if width * scale > max || height * scale > max {
            let reduced = (max / width).min(max / height);
            tracing::debug!(from = scale, to = reduced, "downscaling screenshot to fit canvas limit");
            scale = reduced;
        }
        CapturePlan {
            scale,
            width: ((width * scale).round() as u32).clamp(1, max_dimension),
            height: ((height * scale).round() as u32).clamp(1, max_dimension),
        }
    }
}

/// What a strategy captures: the element's markup (controls removed) and size
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub html: String,
    pub metrics: ElementMetrics,
    pub background: String,
}

// --- Raster images ---

#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    pub fn new(pixels: RgbaImage) -> Self {
        RasterImage { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Shrink (never enlarge) so neither side exceeds `max_dimension`.
    pub fn fit_within(self, max_dimension: u32) -> RasterImage {
        let (w, h) = (self.width(), self.height());
        if w <= max_dimension && h <= max_dimension {
            return self;
        }
        let ratio = (max_dimension as f64 / w as f64).min(max_dimension as f64 / h as f64);
        let nw = ((w as f64 * ratio).round() as u32).clamp(1, max_dimension);
        let nh = ((h as f64 * ratio).round() as u32).clamp(1, max_dimension);
        RasterImage::new(image::imageops::resize(&self.pixels, nw, nh, FilterType::Triangle))
    }

    /// Encode as PNG, or JPEG at `quality` (0.1 to 1.0) flattened onto white.
    pub fn encode(&self, format: ImageFormat, quality: f64) -> RuntimeResult<Blob> {
        let mut bytes = Vec::new();
        match format {
            ImageFormat::Png => {
                PngEncoder::new(&mut bytes).write_image(
                    self.pixels.as_raw(),
                    self.width(),
                    self.height(),
                    ExtendedColorType::Rgba8,
                )?;
            }
            ImageFormat::Jpeg => {
                let rgb = flatten_onto_white(&self.pixels);
                let q = (quality.clamp(0.1, 1.0) * 100.0).round() as u8;
                JpegEncoder::new_with_quality(&mut bytes, q).write_image(
                    &rgb,
                    self.width(),
                    self.height(),
                    ExtendedColorType::Rgb8,
                )?;
            }
        }
        Ok(Blob {
            mime: format.mime().to_string(),
            bytes,
        })
    }
}

fn flatten_onto_white(pixels: &RgbaImage) -> Vec<u8> {
    let mut out = Vec::with_capacity((pixels.width() * pixels.height() * 3) as usize);
    for Rgba([r, g, b, a]) in pixels.pixels() {
        let alpha = *a as u32;
        for channel in [*r, *g, *b] {
            out.push(((channel as u32 * alpha + 255 * (255 - alpha)) / 255) as u8);
        }
    }
    out
}

// --- Strategies ---

#[async_trait]
pub trait CaptureStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;
    async fn capture(&self, request: &CaptureRequest, plan: &CapturePlan) -> RuntimeResult<RasterImage>;
}

/// Script loader and renderer for a DOM-to-raster library
#[async_trait]
pub trait CaptureLibraryHost: Send + Sync {
    /// Load the library script from `url`; resolves immediately when already loaded.
    async fn load(&self, kind: StrategyKind, url: &str) -> RuntimeResult<()>;
    async fn render(&self, kind: StrategyKind, request: &CaptureRequest, plan: &CapturePlan) -> RuntimeResult<RasterImage>;
}

/// Draws an image URL onto a canvas of the planned size
#[async_trait]
pub trait CanvasHost: Send + Sync {
    async fn draw_image_url(&self, url: &str, plan: &CapturePlan) -> RuntimeResult<RasterImage>;
}

pub struct LibraryStrategy {
    kind: StrategyKind,
    url: String,
    host: Arc<dyn CaptureLibraryHost>,
    load_timeout: Duration,
    capture_timeout: Duration,
}

impl LibraryStrategy {
    /// Fails for [`StrategyKind::ForeignObject`], which has no library to load.
    pub fn new(kind: StrategyKind, host: Arc<dyn CaptureLibraryHost>, config: &RuntimeConfig) -> RuntimeResult<Self> {
        let url = match kind {
            StrategyKind::Html2Canvas => config.html2canvas_url.clone(),
            StrategyKind::HtmlToImage => config.html_to_image_url.clone(),
            StrategyKind::ForeignObject => {
                return Err(RuntimeError::LibraryUnavailable(kind.name().to_string()));
            }
        };
        Ok(LibraryStrategy {
            kind,
            url,
            host,
            load_timeout: config.library_load_timeout(),
            capture_timeout: config.capture_timeout(),
        })
    }
}

#[async_trait]
impl CaptureStrategy for LibraryStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn capture(&self, request: &CaptureRequest, plan: &CapturePlan) -> RuntimeResult<RasterImage> {
        tokio::time::timeout(self.load_timeout, self.host.load(self.kind, &self.url))
            .await
            .map_err(|_| RuntimeError::LibraryLoadTimeout(self.kind.name().to_string()))??;
        tokio::time::timeout(self.capture_timeout, self.host.render(self.kind, request, plan))
            .await
            .map_err(|_| RuntimeError::CaptureTimeout(self.capture_timeout.as_millis() as u64))?
    }
}

pub struct ForeignObjectStrategy {
    canvas: Arc<dyn CanvasHost>,
    capture_timeout: Duration,
}

impl ForeignObjectStrategy {
    pub fn new(canvas: Arc<dyn CanvasHost>, config: &RuntimeConfig) -> Self {
        ForeignObjectStrategy {
            canvas,
            capture_timeout: config.capture_timeout(),
        }
    }
}

/// Wrap markup in an SVG `<foreignObject>` and return it as a base64 data URL.
pub fn foreign_object_data_url(request: &CaptureRequest) -> String {
    let width = request.metrics.width.ceil().max(1.0);
    let height = request.metrics.height.ceil().max(1.0);
    let svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\">\
<foreignObject x=\"0\" y=\"0\" width=\"100%\" height=\"100%\">\
<div xmlns=\"http://www.w3.org/1999/xhtml\" style=\"background:{bg};\">{html}</div>\
</foreignObject></svg>",
        w = width,
        h = height,
        bg = escape_html(&request.background),
        html = request.html,
    );
    format!(
        "data:image/svg+xml;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(svg.as_bytes())
    )
}

#[async_trait]
impl CaptureStrategy for ForeignObjectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ForeignObject
    }

    async fn capture(&self, request: &CaptureRequest, plan: &CapturePlan) -> RuntimeResult<RasterImage> {
        let url = foreign_object_data_url(request);
        tokio::time::timeout(self.capture_timeout, self.canvas.draw_image_url(&url, plan))
            .await
            .map_err(|_| RuntimeError::CaptureTimeout(self.capture_timeout.as_millis() as u64))?
    }
}

// --- Delivery ---

/// Object URL and anchor-click download support
pub trait Downloader: Send + Sync {
    fn create_object_url(&self, blob: &Blob) -> RuntimeResult<String>;
    fn trigger_download(&self, url: &str, filename: &str) -> RuntimeResult<()>;
    fn revoke_object_url(&self, url: &str);
}

/// Revokes its object URL when dropped.
struct ObjectUrl<'a> {
    downloader: &'a dyn Downloader,
    url: String,
}

impl Drop for ObjectUrl<'_> {
    fn drop(&mut self) {
        self.downloader.revoke_object_url(&self.url);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenshotOutcome {
    Copied,
    Downloaded,
    Busy,
    Failed,
}

pub struct ScreenshotAction {
    strategies: Vec<Arc<dyn CaptureStrategy>>,
    clipboard: Option<Arc<dyn Clipboard>>,
    downloader: Arc<dyn Downloader>,
    notifier: Arc<dyn Notifier>,
    busy: BusySet,
    config: RuntimeConfig,
}

impl ScreenshotAction {
    pub fn new(
        strategies: Vec<Arc<dyn CaptureStrategy>>,
        clipboard: Option<Arc<dyn Clipboard>>,
        downloader: Arc<dyn Downloader>,
        notifier: Arc<dyn Notifier>,
        busy: BusySet,
        config: RuntimeConfig,
    ) -> Self {
        ScreenshotAction {
            strategies,
            clipboard,
            downloader,
            notifier,
            busy,
            config,
        }
    }

    /// Capture the binding's target and deliver it to the clipboard, falling
    /// back to a download.
    pub async fn take(
        &self,
        instance_id: &str,
        container: &mut Element,
        binding: &ScreenshotBinding,
        metrics: ElementMetrics,
        platform: Platform,
    ) -> ScreenshotOutcome {
        let Some(_guard) = self.busy.try_acquire(instance_id, BusyAction::Screenshot) else {
            return ScreenshotOutcome::Busy;
        };

        let request = match capture_request(container, binding, metrics) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(instance = instance_id, error = %err, "screenshot target missing");
                self.toast(ToastKind::Error, "Screenshot failed");
                return ScreenshotOutcome::Failed;
            }
        };

        container
            .children
            .push(Node::Element(Element::new("div").with_class(LOADING_CLASS)));
        let result = self.capture_and_deliver(&request, binding, platform).await;
        container.remove_descendants_with_class(LOADING_CLASS);

        match result {
            Ok(outcome) => {
                let message = match outcome {
                    ScreenshotOutcome::Copied => "Screenshot copied to clipboard!",
                    _ => "Screenshot downloaded",
                };
                self.toast(ToastKind::Success, message);
                outcome
            }
            Err(err) => {
                tracing::warn!(instance = instance_id, error = %err, "screenshot failed");
                self.toast(ToastKind::Error, "Screenshot failed");
                ScreenshotOutcome::Failed
            }
        }
    }

    async fn capture_and_deliver(
        &self,
        request: &CaptureRequest,
        binding: &ScreenshotBinding,
        platform: Platform,
    ) -> RuntimeResult<ScreenshotOutcome> {
        let clipboard = self.clipboard.as_ref().filter(|c| c.supports_images());

        // Safari: hand the clipboard a pending item before capture starts.
        if let (true, Some(clipboard)) = (platform.safari, clipboard) {
            let (tx, rx) = oneshot::channel();
            let produce = async {
                let blob = self.capture_blob(request, binding, platform).await?;
                // The receiver is gone only if the write already failed.
                let _ = tx.send(blob.clone());
                Ok::<Blob, RuntimeError>(blob)
            };
            let (written, produced) = tokio::join!(clipboard.write_image(ClipboardImage::Pending(rx)), produce);
            let blob = produced?;
            return match written {
                Ok(()) => Ok(ScreenshotOutcome::Copied),
                Err(err) => {
                    tracing::debug!(error = %err, "clipboard image write failed, downloading");
                    self.download(&blob, binding)
                }
            };
        }

        let blob = self.capture_blob(request, binding, platform).await?;
        if let Some(clipboard) = clipboard {
            match clipboard.write_image(ClipboardImage::Ready(blob.clone())).await {
                Ok(()) => return Ok(ScreenshotOutcome::Copied),
                Err(err) => tracing::debug!(error = %err, "clipboard image write failed, downloading"),
            }
        }
        self.download(&blob, binding)
    }

    async fn capture_blob(
        &self,
        request: &CaptureRequest,
        binding: &ScreenshotBinding,
        platform: Platform,
    ) -> RuntimeResult<Blob> {
        let max = platform.max_canvas_dimension(&self.config);
        let image = self.capture(request, platform, max).await?;
        image.fit_within(max).encode(binding.format, binding.quality)
    }

    /// Run strategies in platform order until one produces an image.
    pub async fn capture(&self, request: &CaptureRequest, platform: Platform, max: u32) -> RuntimeResult<RasterImage> {
        let plan = CapturePlan::fit(&request.metrics, max);
        let mut failures = Vec::new();
        for kind in platform.strategy_order() {
            let Some(strategy) = self.strategies.iter().find(|s| s.kind() == kind) else {
                continue;
            };
            let captured = strategy.capture(request, &plan).await.and_then(|image| {
                if image.width() == 0 || image.height() == 0 {
                    Err(RuntimeError::CaptureFailed("empty image".to_string()))
                } else {
                    Ok(image)
                }
            });
            match captured {
                Ok(image) => {
                    tracing::debug!(strategy = kind.name(), width = image.width(), height = image.height(), "captured");
                    return Ok(image);
                }
                Err(err) => {
                    tracing::warn!(strategy = kind.name(), error = %err, "capture strategy failed");
                    failures.push(format!("{}: {}", kind.name(), err));
                }
            }
        }
        if failures.is_empty() {
            failures.push("no strategies configured".to_string());
        }
        Err(RuntimeError::AllStrategiesFailed(failures.join("; ")))
    }

    fn download(&self, blob: &Blob, binding: &ScreenshotBinding) -> RuntimeResult<ScreenshotOutcome> {
        let url = ObjectUrl {
            downloader: self.downloader.as_ref(),
            url: self.downloader.create_object_url(blob)?,
        };
        let filename = format!("{}.{}", binding.filename, binding.format.extension());
        self.downloader.trigger_download(&url.url, &filename)?;
        Ok(ScreenshotOutcome::Downloaded)
    }

    fn toast(&self, kind: ToastKind, message: &str) {
        self.notifier.notify(Toast {
            kind,
            message: message.to_string(),
            duration_ms: self.config.toast_duration_ms,
        });
    }
}

/// Markup of the capture target with the action row removed.
fn capture_request(
    container: &Element,
    binding: &ScreenshotBinding,
    metrics: ElementMetrics,
) -> RuntimeResult<CaptureRequest> {
    let mut target = container
        .find_by_id(&binding.target)
        .cloned()
        .ok_or_else(|| RuntimeError::TargetNotFound(binding.target.clone()))?;
    target.remove_descendants_with_class(ACTIONS_CLASS);
    target.remove_descendants_with_class(LOADING_CLASS);
    Ok(CaptureRequest {
        html: target.to_html(),
        metrics,
        background: "#ffffff".to_string(),
    })
}
