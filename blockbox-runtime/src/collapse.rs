//! Expand/collapse state machine for collapsible containers.

use std::sync::Arc;

use blockbox_core::feature::CollapseState;
use blockbox_core::markup::Element;
use blockbox_core::render::{
    ACTIONS_CLASS, BODY_CLASS, COLLAPSED_CLASS, COLLAPSE_TOGGLE_CLASS, HIDDEN_CLASS,
};

use crate::binder::ContainerBinding;
use crate::config::RuntimeConfig;
use crate::storage::KeyValueStore;

/// Classes of controls whose clicks must not toggle the container
const CONTROL_CLASSES: &[&str] = &[ACTIONS_CLASS, "blockbox-action", "blockbox-menu", "blockbox-dropdown"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideDirection {
    Up,
    Down,
}

/// Body animation the host should run after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideAnimation {
    pub direction: SlideDirection,
    pub duration_ms: u32,
}

/// Where a header click landed: the classes of every element from the click
/// target up to the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClickPath {
    pub classes: Vec<String>,
}

impl ClickPath {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ClickPath {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    fn inside_control(&self) -> bool {
        self.classes
            .iter()
            .flat_map(|c| c.split_whitespace())
            .any(|c| CONTROL_CLASSES.contains(&c))
    }
}

pub struct CollapseController {
    store: Arc<dyn KeyValueStore>,
    config: RuntimeConfig,
}

impl CollapseController {
    pub fn new(store: Arc<dyn KeyValueStore>, config: RuntimeConfig) -> Self {
        CollapseController { store, config }
    }

    /// Persisted state when present, else the authored default.
    pub fn initial_state(&self, binding: &ContainerBinding) -> CollapseState {
        let default = binding
            .collapse
            .as_ref()
            .map(|c| c.default_state)
            .unwrap_or_default();
        match self.store.get(&self.config.storage_key(&binding.id)) {
            Ok(Some(saved)) => CollapseState::parse(&saved).unwrap_or(default),
            Ok(None) => default,
            Err(err) => {
                tracing::warn!(instance = %binding.id, error = %err, "could not read collapse state");
                default
            }
        }
    }

    /// Bring a freshly bound container in line with its initial state.
    pub fn restore(&self, container: &mut Element, binding: &ContainerBinding) -> Option<CollapseState> {
        binding.collapse.as_ref()?;
        let state = self.initial_state(binding);
        apply_state(container, state);
        Some(state)
    }

    /// Handle a click on the header. Returns the animation to run, or `None`
    /// when the click came from a control or the container isn't collapsible.
    pub fn on_header_click(
        &self,
        container: &mut Element,
        binding: &ContainerBinding,
        path: &ClickPath,
    ) -> Option<SlideAnimation> {
        let collapse = binding.collapse.as_ref()?;
        if path.inside_control() {
            return None;
        }

        let next = current_state(container).toggled();
        apply_state(container, next);
        if let Err(err) = self
            .store
            .set(&self.config.storage_key(&binding.id), next.as_str())
        {
            tracing::warn!(instance = %binding.id, error = %err, "could not persist collapse state");
        }

        Some(SlideAnimation {
            direction: match next {
                CollapseState::Collapsed => SlideDirection::Up,
                CollapseState::Expanded => SlideDirection::Down,
            },
            duration_ms: collapse.animation_speed,
        })
    }
}

pub fn current_state(container: &Element) -> CollapseState {
    if container.has_class(COLLAPSED_CLASS) {
        CollapseState::Collapsed
    } else {
        CollapseState::Expanded
    }
}

fn apply_state(container: &mut Element, state: CollapseState) {
    let collapsed = state == CollapseState::Collapsed;
    if collapsed {
        container.add_class(COLLAPSED_CLASS);
    } else {
        container.remove_class(COLLAPSED_CLASS);
    }
    if let Some(body) = container.find_by_class_mut(BODY_CLASS) {
        if collapsed {
            body.add_class(HIDDEN_CLASS);
        } else {
            body.remove_class(HIDDEN_CLASS);
        }
    }
    if let Some(toggle) = container.find_by_class_mut(COLLAPSE_TOGGLE_CLASS) {
        toggle.set_attr("aria-expanded", (!collapsed).to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind_all;
    use crate::error::{RuntimeError, RuntimeResult};
    use crate::storage::MemoryStore;
    use blockbox_core::{render_block, BlockInstance, Preset, RenderContext};
    use pretty_assertions::assert_eq;

    fn container(default_state: &str) -> Element {
        let mut preset = Preset::new("Faq", "faq");
        preset.features = serde_json::from_str(&format!(
            r#"{{"collapse": {{"enabled": true, "defaultState": "{}"}}, "copyText": {{"enabled": true}}}}"#,
            default_state
        ))
        .unwrap();
        let instance = BlockInstance {
            instance_id: Some("faq-1".to_string()),
            ..BlockInstance::for_preset("faq")
        };
        render_block(&mut RenderContext::default(), &instance, Some(&preset), "<p>answer</p>")
    }

    fn setup(default_state: &str, store: Arc<MemoryStore>) -> (Element, ContainerBinding, CollapseController) {
        let mut el = container(default_state);
        let binding = bind_all(&mut el).remove(0);
        let controller = CollapseController::new(store, RuntimeConfig::default());
        (el, binding, controller)
    }

    #[test]
    fn test_toggle_persists_and_animates() {
        let store = Arc::new(MemoryStore::new());
        let (mut el, binding, controller) = setup("expanded", store.clone());

        let anim = controller.on_header_click(&mut el, &binding, &ClickPath::new([COLLAPSE_TOGGLE_CLASS]));
        assert_eq!(anim, Some(SlideAnimation { direction: SlideDirection::Up, duration_ms: 300 }));
        assert_eq!(current_state(&el), CollapseState::Collapsed);
        assert!(el.find_by_class(BODY_CLASS).unwrap().has_class(HIDDEN_CLASS));
        assert_eq!(
            el.find_by_class(COLLAPSE_TOGGLE_CLASS).unwrap().attr("aria-expanded"),
            Some("false")
        );
        assert_eq!(store.get("blockbox-collapse-faq-1").unwrap().as_deref(), Some("collapsed"));

        let anim = controller.on_header_click(&mut el, &binding, &ClickPath::new(["blockbox-title"]));
        assert_eq!(anim.map(|a| a.direction), Some(SlideDirection::Down));
        assert_eq!(store.get("blockbox-collapse-faq-1").unwrap().as_deref(), Some("expanded"));
    }

    #[test]
    fn test_persisted_state_beats_default() {
        let store = Arc::new(MemoryStore::new());
        store.set("blockbox-collapse-faq-1", "expanded").unwrap();
        let (mut el, binding, controller) = setup("collapsed", store);
        assert!(el.has_class(COLLAPSED_CLASS));
        assert_eq!(controller.restore(&mut el, &binding), Some(CollapseState::Expanded));
        assert!(!el.has_class(COLLAPSED_CLASS));
        assert!(!el.find_by_class(BODY_CLASS).unwrap().has_class(HIDDEN_CLASS));
    }

    #[test]
    fn test_garbage_in_storage_uses_default() {
        let store = Arc::new(MemoryStore::new());
        store.set("blockbox-collapse-faq-1", "sideways").unwrap();
        let (_, binding, controller) = setup("collapsed", store);
        assert_eq!(controller.initial_state(&binding), CollapseState::Collapsed);
    }

    #[test]
    fn test_clicks_on_controls_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        let (mut el, binding, controller) = setup("expanded", store.clone());
        let path = ClickPath::new(["blockbox-action blockbox-copy-button", ACTIONS_CLASS]);
        assert_eq!(controller.on_header_click(&mut el, &binding, &path), None);
        assert_eq!(current_state(&el), CollapseState::Expanded);
        assert!(store.is_empty());
    }

    /// `localStorage` blocked, as in some private browsing modes
    struct BlockedStore;

    impl KeyValueStore for BlockedStore {
        fn get(&self, _key: &str) -> RuntimeResult<Option<String>> {
            Err(RuntimeError::Storage("SecurityError".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> RuntimeResult<()> {
            Err(RuntimeError::Storage("QuotaExceededError".into()))
        }

        fn remove(&self, _key: &str) -> RuntimeResult<()> {
            Err(RuntimeError::Storage("SecurityError".into()))
        }
    }

    #[test]
    fn test_blocked_storage_still_toggles() {
        let mut el = container("collapsed");
        let binding = bind_all(&mut el).remove(0);
        let controller = CollapseController::new(Arc::new(BlockedStore), RuntimeConfig::default());
        assert_eq!(controller.restore(&mut el, &binding), Some(CollapseState::Collapsed));

        let anim = controller.on_header_click(&mut el, &binding, &ClickPath::new(["blockbox-title"]));
        assert_eq!(anim.map(|a| a.direction), Some(SlideDirection::Down));
        assert_eq!(current_state(&el), CollapseState::Expanded);
    }
}
