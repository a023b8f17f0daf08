//! Page-level runtime: binds containers once and routes user interactions.

use dashmap::DashMap;
use std::sync::Arc;

use blockbox_core::markup::Element;

use crate::binder::{bind_all, ContainerBinding};
use crate::busy::BusySet;
use crate::clipboard::{Clipboard, CopyAction, CopyOutcome, LegacyCopy};
use crate::collapse::{ClickPath, CollapseController, SlideAnimation};
use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::screenshot::{CaptureStrategy, Downloader, ElementMetrics, Platform, ScreenshotAction, ScreenshotOutcome};
use crate::storage::KeyValueStore;
use crate::toast::Notifier;

/// Browser capabilities the runtime drives.
pub struct RuntimeHost {
    pub store: Arc<dyn KeyValueStore>,
    pub notifier: Arc<dyn Notifier>,
    /// `None` when the async Clipboard API is missing
    pub clipboard: Option<Arc<dyn Clipboard>>,
    pub legacy_copy: Option<Arc<dyn LegacyCopy>>,
    pub downloader: Arc<dyn Downloader>,
    pub strategies: Vec<Arc<dyn CaptureStrategy>>,
}

/// Bound containers, keyed by instance id.
pub type BindingStore = DashMap<String, ContainerBinding>;

pub struct BlockboxRuntime {
    bindings: BindingStore,
    collapse: CollapseController,
    copy: CopyAction,
    screenshot: ScreenshotAction,
}

impl BlockboxRuntime {
    pub fn new(config: RuntimeConfig, host: RuntimeHost) -> Self {
        let busy = BusySet::new();
        BlockboxRuntime {
            bindings: DashMap::new(),
            collapse: CollapseController::new(host.store, config.clone()),
            copy: CopyAction::new(
                host.clipboard.clone(),
                host.legacy_copy,
                host.notifier.clone(),
                busy.clone(),
                config.clone(),
            ),
            screenshot: ScreenshotAction::new(
                host.strategies,
                host.clipboard,
                host.downloader,
                host.notifier,
                busy,
                config,
            ),
        }
    }

    /// Bind new containers under `root` and restore their collapse state.
    /// Returns the ids bound by this call.
    pub fn bind(&self, root: &mut Element) -> Vec<String> {
        let mut ids = Vec::new();
        for binding in bind_all(root) {
            if let Some(container) = root.find_by_id_mut(&binding.id) {
                self.collapse.restore(container, &binding);
            }
            ids.push(binding.id.clone());
            self.bindings.insert(binding.id.clone(), binding);
        }
        ids
    }

    pub fn binding(&self, instance_id: &str) -> Option<ContainerBinding> {
        self.bindings.get(instance_id).map(|b| b.clone())
    }

    /// Forget a container removed from the page.
    pub fn unbind(&self, instance_id: &str) {
        self.bindings.remove(instance_id);
    }

    pub fn header_click(
        &self,
        root: &mut Element,
        instance_id: &str,
        path: &ClickPath,
    ) -> RuntimeResult<Option<SlideAnimation>> {
        let binding = self.lookup(instance_id)?;
        let container = find_container(root, instance_id)?;
        Ok(self.collapse.on_header_click(container, &binding, path))
    }

    pub async fn copy(&self, root: &Element, instance_id: &str) -> RuntimeResult<CopyOutcome> {
        let binding = self.lookup(instance_id)?;
        let copy = binding.copy.ok_or_else(|| disabled(instance_id, "copy"))?;
        let container = root
            .find_by_id(instance_id)
            .ok_or_else(|| RuntimeError::TargetNotFound(instance_id.to_string()))?;
        Ok(self.copy.copy(instance_id, container, &copy).await)
    }

    pub async fn screenshot(
        &self,
        root: &mut Element,
        instance_id: &str,
        metrics: ElementMetrics,
        platform: Platform,
    ) -> RuntimeResult<ScreenshotOutcome> {
        let binding = self.lookup(instance_id)?;
        let shot = binding.screenshot.ok_or_else(|| disabled(instance_id, "screenshot"))?;
        let container = find_container(root, instance_id)?;
        Ok(self.screenshot.take(instance_id, container, &shot, metrics, platform).await)
    }

    // Clone out of the map so no shard lock is held across an await.
    fn lookup(&self, instance_id: &str) -> RuntimeResult<ContainerBinding> {
        self.binding(instance_id)
            .ok_or_else(|| RuntimeError::TargetNotFound(instance_id.to_string()))
    }
}

fn disabled(instance_id: &str, feature: &str) -> RuntimeError {
    RuntimeError::FeatureDisabled {
        instance: instance_id.to_string(),
        feature: feature.to_string(),
    }
}

fn find_container<'a>(root: &'a mut Element, instance_id: &str) -> RuntimeResult<&'a mut Element> {
    root.find_by_id_mut(instance_id)
        .ok_or_else(|| RuntimeError::TargetNotFound(instance_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{Blob, ClipboardImage};
    use crate::screenshot::{CapturePlan, CaptureRequest, RasterImage, StrategyKind};
    use crate::storage::MemoryStore;
    use crate::toast::ToastLog;
    use async_trait::async_trait;
    use blockbox_core::render::{BODY_CLASS, COLLAPSED_CLASS, COLLAPSE_TOGGLE_CLASS, HIDDEN_CLASS};
    use blockbox_core::{render_block, BlockInstance, Preset, RenderContext};
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClipboard {
        text: Mutex<Vec<String>>,
        images: Mutex<usize>,
    }

    #[async_trait]
    impl Clipboard for RecordingClipboard {
        async fn write_text(&self, text: &str) -> RuntimeResult<()> {
            self.text.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn write_html(&self, _html: &str, plain: &str) -> RuntimeResult<()> {
            self.write_text(plain).await
        }

        async fn write_image(&self, image: ClipboardImage) -> RuntimeResult<()> {
            if let ClipboardImage::Pending(rx) = image {
                rx.await.map_err(|_| RuntimeError::ClipboardRejected("dropped".into()))?;
            }
            *self.images.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct NoDownloads;

    impl Downloader for NoDownloads {
        fn create_object_url(&self, _blob: &Blob) -> RuntimeResult<String> {
            Err(RuntimeError::Download("unsupported".into()))
        }

        fn trigger_download(&self, _url: &str, _filename: &str) -> RuntimeResult<()> {
            Ok(())
        }

        fn revoke_object_url(&self, _url: &str) {}
    }

    struct BlankCanvas;

    #[async_trait]
    impl CaptureStrategy for BlankCanvas {
        fn kind(&self) -> StrategyKind {
            StrategyKind::ForeignObject
        }

        async fn capture(&self, _request: &CaptureRequest, plan: &CapturePlan) -> RuntimeResult<RasterImage> {
            Ok(RasterImage::new(RgbaImage::from_pixel(plan.width, plan.height, Rgba([255, 255, 255, 255]))))
        }
    }

    const ALL_FEATURES: &str = r#"{
        "collapse": {"enabled": true, "defaultState": "collapsed"},
        "copyText": {"enabled": true},
        "screenshot": {"enabled": true}
    }"#;

    fn page() -> Element {
        page_with(ALL_FEATURES)
    }

    fn page_with(features: &str) -> Element {
        let mut preset = Preset::new("Faq", "faq");
        preset.features = serde_json::from_str(features).unwrap();
        let instance = BlockInstance {
            instance_id: Some("q1".to_string()),
            ..BlockInstance::for_preset("faq")
        };
        Element::new("main").with_child(render_block(
            &mut RenderContext::default(),
            &instance,
            Some(&preset),
            "<p>Yes, it works offline.</p>",
        ))
    }

    fn runtime(store: Arc<MemoryStore>, clipboard: Arc<RecordingClipboard>) -> BlockboxRuntime {
        BlockboxRuntime::new(
            RuntimeConfig::default(),
            RuntimeHost {
                store,
                notifier: Arc::new(ToastLog::new()),
                clipboard: Some(clipboard as Arc<dyn Clipboard>),
                legacy_copy: None,
                downloader: Arc::new(NoDownloads),
                strategies: vec![Arc::new(BlankCanvas) as Arc<dyn CaptureStrategy>],
            },
        )
    }

    #[test]
    fn test_bind_restores_and_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        store.set("blockbox-collapse-q1", "expanded").unwrap();
        let rt = runtime(store, Arc::new(RecordingClipboard::default()));
        let mut root = page();

        assert!(root.find_by_id("q1").unwrap().has_class(COLLAPSED_CLASS));
        assert_eq!(rt.bind(&mut root), vec!["q1".to_string()]);
        let container = root.find_by_id("q1").unwrap();
        assert!(!container.has_class(COLLAPSED_CLASS));
        assert!(!container.find_by_class(BODY_CLASS).unwrap().has_class(HIDDEN_CLASS));
        assert!(rt.bind(&mut root).is_empty());
    }

    #[tokio::test]
    async fn test_interactions_route_to_container() {
        let store = Arc::new(MemoryStore::new());
        let clipboard = Arc::new(RecordingClipboard::default());
        let rt = runtime(store.clone(), clipboard.clone());
        let mut root = page();
        rt.bind(&mut root);

        let anim = rt
            .header_click(&mut root, "q1", &ClickPath::new([COLLAPSE_TOGGLE_CLASS]))
            .unwrap();
        assert!(anim.is_some());
        assert_eq!(store.get("blockbox-collapse-q1").unwrap().as_deref(), Some("expanded"));

        assert_eq!(rt.copy(&root, "q1").await, Ok(CopyOutcome::Copied));
        assert_eq!(*clipboard.text.lock().unwrap(), vec!["Yes, it works offline.".to_string()]);

        let metrics = ElementMetrics { width: 120.0, height: 80.0, device_pixel_ratio: 1.0 };
        let outcome = rt
            .screenshot(&mut root, "q1", metrics, Platform::default())
            .await;
        assert_eq!(outcome, Ok(ScreenshotOutcome::Copied));
        assert_eq!(*clipboard.images.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_or_unbound_container() {
        let rt = runtime(Arc::new(MemoryStore::new()), Arc::new(RecordingClipboard::default()));
        let root = page();
        assert_eq!(
            rt.copy(&root, "q1").await,
            Err(RuntimeError::TargetNotFound("q1".to_string()))
        );
        rt.unbind("q1");
        assert!(rt.binding("q1").is_none());
    }

    #[tokio::test]
    async fn test_disabled_feature_is_not_a_missing_target() {
        let rt = runtime(Arc::new(MemoryStore::new()), Arc::new(RecordingClipboard::default()));
        let mut root = page_with(r#"{"collapse": {"enabled": true}}"#);
        rt.bind(&mut root);

        assert_eq!(
            rt.copy(&root, "q1").await,
            Err(RuntimeError::FeatureDisabled { instance: "q1".to_string(), feature: "copy".to_string() })
        );
        let metrics = ElementMetrics { width: 120.0, height: 80.0, device_pixel_ratio: 1.0 };
        assert_eq!(
            rt.screenshot(&mut root, "q1", metrics, Platform::default()).await,
            Err(RuntimeError::FeatureDisabled { instance: "q1".to_string(), feature: "screenshot".to_string() })
        );
    }
}
