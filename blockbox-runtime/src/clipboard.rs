//! Clipboard capabilities and the copy-text action.

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tokio::sync::oneshot;

use blockbox_core::feature::CopyFormat;
use blockbox_core::markup::{strip_tags, Element};
use blockbox_core::render::{ACTIONS_CLASS, BODY_CLASS};

use crate::binder::CopyBinding;
use crate::busy::{BusyAction, BusySet};
use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::toast::{Notifier, Toast, ToastKind};

/// Encoded bytes with their MIME type
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Image payload for a clipboard write. Safari requires the clipboard item
/// to be created inside the user gesture, before the image exists, so the
/// item may carry a value that is only resolved later.
#[derive(Debug)]
pub enum ClipboardImage {
    Ready(Blob),
    Pending(oneshot::Receiver<Blob>),
}

/// Async Clipboard API
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> RuntimeResult<()>;

    /// Write HTML with a plain-text alternative.
    async fn write_html(&self, html: &str, plain: &str) -> RuntimeResult<()>;

    async fn write_image(&self, image: ClipboardImage) -> RuntimeResult<()>;

    fn supports_images(&self) -> bool {
        true
    }
}

/// Pre-Clipboard-API path: hidden textarea + `execCommand("copy")`.
pub trait LegacyCopy: Send + Sync {
    fn exec_copy(&self, text: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    CopiedLegacy,
    Empty,
    Busy,
    Failed,
}

/// Text and markup extracted from a container body, controls removed
#[derive(Debug, Clone, PartialEq)]
pub struct CopyPayload {
    pub text: String,
    pub html: String,
}

/// Extract the copy payload from `container`. The target is looked up by id,
/// falling back to the container's body.
pub fn extract_payload(container: &Element, target: &str) -> RuntimeResult<CopyPayload> {
    let mut body = container
        .find_by_id(target)
        .or_else(|| container.find_by_class(BODY_CLASS))
        .cloned()
        .ok_or_else(|| RuntimeError::TargetNotFound(target.to_string()))?;
    body.remove_descendants_with_class(ACTIONS_CLASS);
    body.remove_descendants_with_class("blockbox-action");
    let html = strip_buttons(&body.inner_html());
    Ok(CopyPayload {
        text: normalize_text(&strip_tags(&html)),
        html,
    })
}

/// Buttons embedded in authored content are controls, not copyable text.
fn strip_buttons(html: &str) -> String {
    static BUTTON_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = BUTTON_REGEX.get_or_init(|| Regex::new(r"(?is)<button\b[^>]*>.*?</button>").unwrap());
    re.replace_all(html, "").into_owned()
}

/// Trim each line and collapse runs of blank lines.
fn normalize_text(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

pub struct CopyAction {
    clipboard: Option<Arc<dyn Clipboard>>,
    legacy: Option<Arc<dyn LegacyCopy>>,
    notifier: Arc<dyn Notifier>,
    busy: BusySet,
    config: RuntimeConfig,
}

impl CopyAction {
    pub fn new(
        clipboard: Option<Arc<dyn Clipboard>>,
        legacy: Option<Arc<dyn LegacyCopy>>,
        notifier: Arc<dyn Notifier>,
        busy: BusySet,
        config: RuntimeConfig,
    ) -> Self {
        CopyAction {
            clipboard,
            legacy,
            notifier,
            busy,
            config,
        }
    }

    pub async fn copy(&self, instance_id: &str, container: &Element, binding: &CopyBinding) -> CopyOutcome {
        let Some(_guard) = self.busy.try_acquire(instance_id, BusyAction::Copy) else {
            return CopyOutcome::Busy;
        };

        let payload = match extract_payload(container, &binding.target) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(instance = instance_id, error = %err, "copy target missing");
                self.toast(ToastKind::Error, "Nothing to copy");
                return CopyOutcome::Failed;
            }
        };
        if payload.text.is_empty() {
            self.toast(ToastKind::Info, "Nothing to copy");
            return CopyOutcome::Empty;
        }

        match self.write(&payload, binding.format).await {
            Ok(()) => {
                self.toast(ToastKind::Success, "Copied to clipboard!");
                return CopyOutcome::Copied;
            }
            Err(err) => tracing::debug!(instance = instance_id, error = %err, "clipboard write failed, trying legacy copy"),
        }

        if self.legacy.as_ref().is_some_and(|l| l.exec_copy(&payload.text)) {
            self.toast(ToastKind::Success, "Copied to clipboard!");
            return CopyOutcome::CopiedLegacy;
        }

        tracing::warn!(instance = instance_id, "all copy methods failed");
        self.toast(ToastKind::Error, "Copy failed. Please select the text and copy it manually.");
        CopyOutcome::Failed
    }

    async fn write(&self, payload: &CopyPayload, format: CopyFormat) -> RuntimeResult<()> {
        let clipboard = self.clipboard.as_ref().ok_or(RuntimeError::ClipboardUnavailable)?;
        match format {
            CopyFormat::Text => clipboard.write_text(&payload.text).await,
            CopyFormat::Html => clipboard.write_html(&payload.html, &payload.text).await,
        }
    }

    fn toast(&self, kind: ToastKind, message: &str) {
        self.notifier.notify(Toast {
            kind,
            message: message.to_string(),
            duration_ms: self.config.toast_duration_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind_all;
    use crate::toast::ToastLog;
    use blockbox_core::{render_block, BlockInstance, Preset, RenderContext};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeClipboard {
        reject: bool,
        written: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Clipboard for FakeClipboard {
        async fn write_text(&self, text: &str) -> RuntimeResult<()> {
            if self.reject {
                return Err(RuntimeError::ClipboardRejected("NotAllowedError".into()));
            }
            self.written.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn write_html(&self, html: &str, _plain: &str) -> RuntimeResult<()> {
            self.write_text(html).await
        }

        async fn write_image(&self, _image: ClipboardImage) -> RuntimeResult<()> {
            Err(RuntimeError::ClipboardUnavailable)
        }
    }

    struct FakeLegacy(bool);

    impl LegacyCopy for FakeLegacy {
        fn exec_copy(&self, _text: &str) -> bool {
            self.0
        }
    }

    fn container(content: &str, format: &str) -> (Element, CopyBinding) {
        let mut preset = Preset::new("Code", "code");
        preset.features = serde_json::from_str(&format!(
            r#"{{"copyText": {{"enabled": true, "format": "{}"}}, "screenshot": {{"enabled": true}}}}"#,
            format
        ))
        .unwrap();
        let instance = BlockInstance {
            instance_id: Some("c1".to_string()),
            ..BlockInstance::for_preset("code")
        };
        let mut el = render_block(&mut RenderContext::default(), &instance, Some(&preset), content);
        let binding = bind_all(&mut el).remove(0).copy.unwrap();
        (el, binding)
    }

    fn action(clipboard: Option<Arc<FakeClipboard>>, legacy: bool, log: Arc<ToastLog>) -> CopyAction {
        CopyAction::new(
            clipboard.map(|c| c as Arc<dyn Clipboard>),
            Some(Arc::new(FakeLegacy(legacy)) as Arc<dyn LegacyCopy>),
            log,
            BusySet::new(),
            RuntimeConfig::default(),
        )
    }

    #[test]
    fn test_extract_strips_controls_and_tags() {
        let (el, binding) = container(
            "<p>Line one</p>\n\n<p>  Line two  </p><div class=\"blockbox-actions\"><button>Copy</button></div>",
            "text",
        );
        let payload = extract_payload(&el, &binding.target).unwrap();
        assert_eq!(payload.text, "Line one\n\nLine two");
    }

    #[test]
    fn test_extract_ignores_sibling_action_row() {
        let (el, binding) = container("<p>Only this</p>", "text");
        assert!(el.find_by_class(ACTIONS_CLASS).is_some());
        assert_eq!(extract_payload(&el, &binding.target).unwrap().text, "Only this");
    }

    #[tokio::test]
    async fn test_copy_text_via_clipboard() {
        let (el, binding) = container("<p>npm install</p>", "text");
        let clipboard = Arc::new(FakeClipboard::default());
        let log = Arc::new(ToastLog::new());
        let outcome = action(Some(clipboard.clone()), false, log.clone()).copy("c1", &el, &binding).await;
        assert_eq!(outcome, CopyOutcome::Copied);
        assert_eq!(*clipboard.written.lock().unwrap(), vec!["npm install".to_string()]);
        assert_eq!(log.last().unwrap().kind, ToastKind::Success);
    }

    #[tokio::test]
    async fn test_copy_html_format() {
        let (el, binding) = container("<p><b>bold</b></p>", "html");
        let clipboard = Arc::new(FakeClipboard::default());
        let outcome = action(Some(clipboard.clone()), false, Arc::new(ToastLog::new()))
            .copy("c1", &el, &binding)
            .await;
        assert_eq!(outcome, CopyOutcome::Copied);
        assert_eq!(*clipboard.written.lock().unwrap(), vec!["<p><b>bold</b></p>".to_string()]);
    }

    #[tokio::test]
    async fn test_rejected_clipboard_falls_back_to_legacy() {
        let (el, binding) = container("<p>text</p>", "text");
        let clipboard = Arc::new(FakeClipboard { reject: true, ..Default::default() });
        let log = Arc::new(ToastLog::new());
        let outcome = action(Some(clipboard), true, log.clone()).copy("c1", &el, &binding).await;
        assert_eq!(outcome, CopyOutcome::CopiedLegacy);
        assert_eq!(log.toasts().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_toast_only_when_everything_fails() {
        let (el, binding) = container("<p>text</p>", "text");
        let log = Arc::new(ToastLog::new());
        let outcome = action(None, false, log.clone()).copy("c1", &el, &binding).await;
        assert_eq!(outcome, CopyOutcome::Failed);
        assert_eq!(log.toasts().len(), 1);
        assert_eq!(log.last().unwrap().kind, ToastKind::Error);
    }

    #[tokio::test]
    async fn test_busy_instance_is_skipped() {
        let (el, binding) = container("<p>text</p>", "text");
        let busy = BusySet::new();
        let _held = busy.try_acquire("c1", BusyAction::Copy).unwrap();
        let action = CopyAction::new(
            Some(Arc::new(FakeClipboard::default()) as Arc<dyn Clipboard>),
            None,
            Arc::new(ToastLog::new()),
            busy.clone(),
            RuntimeConfig::default(),
        );
        assert_eq!(action.copy("c1", &el, &binding).await, CopyOutcome::Busy);
    }

    #[tokio::test]
    async fn test_empty_body() {
        let (el, binding) = container("  ", "text");
        let outcome = action(Some(Arc::new(FakeClipboard::default())), true, Arc::new(ToastLog::new()))
            .copy("c1", &el, &binding)
            .await;
        assert_eq!(outcome, CopyOutcome::Empty);
    }
}
