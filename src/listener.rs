//! Stage change listener for value models
//!
//! Keeps one notice subscription per stage for as long as at least one
//! registered model reads from that stage. Only resyncs of recognized,
//! still valid prims refresh the models: plain value edits are already
//! applied by the model that made them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use regex::Regex;

use crate::config::PropertyConfig;
use crate::error::ConfigError;
use crate::events::Subscription;
use crate::stage::{ObjectsChanged, SdfPath, Stage, StageHandle, StageId};

/// A model the listener can refresh
pub trait ListenedModel {
    /// Stage the model is bound to
    fn stage(&self) -> &StageHandle;

    /// Re-read the stage, returns whether the model changed
    fn refresh(&self) -> bool;
}

#[derive(Default)]
struct ListenerState {
    models: Vec<Rc<dyn ListenedModel>>,
    listeners: HashMap<StageId, Subscription>,
}

fn model_address(model: &dyn ListenedModel) -> *const () {
    model as *const dyn ListenedModel as *const ()
}

/// Refreshes registered models when the structure of their stage changes
pub struct UsdListener {
    state: Rc<RefCell<ListenerState>>,
    node_pattern: Regex,
}

impl UsdListener {
    pub fn new(config: &PropertyConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_pattern(config.node_identifier_regex()?))
    }

    /// Listener reacting to resynced prims whose path matches `node_pattern`
    pub fn with_pattern(node_pattern: Regex) -> Self {
        Self {
            state: Rc::new(RefCell::new(ListenerState::default())),
            node_pattern,
        }
    }

    /// Start refreshing `model`, subscribing to its stage if nothing else does
    pub fn add_model(&self, model: Rc<dyn ListenedModel>) {
        let (already_added, stage_listened) = {
            let state = self.state.borrow();
            let address = model_address(model.as_ref());
            (
                state.models.iter().any(|m| model_address(m.as_ref()) == address),
                state.models.iter().any(|m| m.stage().id() == model.stage().id()),
            )
        };
        if already_added {
            log::debug!("Model already listened, ignoring");
            return;
        }
        if !stage_listened {
            self.enable_listener(model.stage());
        }
        self.state.borrow_mut().models.push(model);
    }

    /// Stop refreshing `model`, unsubscribing from its stage if it was the last one
    pub fn remove_model(&self, model: &dyn ListenedModel) {
        let stage_id = model.stage().id();
        let stage_still_listened = {
            let mut state = self.state.borrow_mut();
            let address = model_address(model);
            state.models.retain(|m| model_address(m.as_ref()) != address);
            state.models.iter().any(|m| m.stage().id() == stage_id)
        };
        if !stage_still_listened {
            self.disable_listener(stage_id);
        }
    }

    /// Refresh every registered model, e.g. after an undo
    pub fn refresh_all(&self) {
        let models: Vec<Rc<dyn ListenedModel>> = self.state.borrow().models.clone();
        for model in models {
            model.refresh();
        }
    }

    /// Revoke every subscription and forget every model
    pub fn destroy(&self) {
        let (models, listeners) = {
            let mut state = self.state.borrow_mut();
            (
                std::mem::take(&mut state.models),
                std::mem::take(&mut state.listeners),
            )
        };
        drop(listeners);
        drop(models);
    }

    pub fn model_count(&self) -> usize {
        self.state.borrow().models.len()
    }

    pub fn active_subscription_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    pub fn is_listening(&self, stage: StageId) -> bool {
        self.state.borrow().listeners.contains_key(&stage)
    }

    fn enable_listener(&self, stage: &StageHandle) {
        let stage_id = stage.id();
        if self.is_listening(stage_id) {
            debug_assert!(false, "stage is already listened");
            return;
        }
        let state = Rc::downgrade(&self.state);
        let weak_stage = Rc::downgrade(stage);
        let pattern = self.node_pattern.clone();
        let subscription = stage.subscribe(Rc::new(move |notice: &ObjectsChanged| {
            let (Some(state), Some(stage)) = (state.upgrade(), weak_stage.upgrade()) else {
                return;
            };
            on_usd_changed(&state, stage.as_ref(), notice, &pattern);
        }));
        log::debug!("Listening to stage {:?}", stage_id);
        self.state.borrow_mut().listeners.insert(stage_id, subscription);
    }

    fn disable_listener(&self, stage_id: StageId) {
        let subscription = self.state.borrow_mut().listeners.remove(&stage_id);
        if let Some(subscription) = subscription {
            log::debug!("Stopped listening to stage {:?}", stage_id);
            subscription.revoke();
        }
    }
}

/// A resync is structural when it targets a recognized prim that still exists
fn is_structural_change(stage: &dyn Stage, path: &SdfPath, pattern: &Regex) -> bool {
    !path.is_property_path() && pattern.is_match(path.as_str()) && stage.is_prim_valid(path)
}

fn on_usd_changed(state: &RefCell<ListenerState>, stage: &dyn Stage, notice: &ObjectsChanged, pattern: &Regex) {
    let models: Vec<Rc<dyn ListenedModel>> = state
        .borrow()
        .models
        .iter()
        .filter(|model| model.stage().id() == stage.id())
        .cloned()
        .collect();
    if models.is_empty() {
        return;
    }
    let should_refresh = notice
        .resynced_paths
        .iter()
        .any(|path| is_structural_change(stage, path, pattern));
    if !should_refresh {
        return;
    }
    log::debug!("Refreshing {} model(s) after resync", models.len());
    for model in models {
        model.refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::InMemoryStage;
    use std::cell::Cell;

    const MESH_A: &str = "/RootNode/meshes/mesh_0123456789ABCDEF";
    const MESH_B: &str = "/RootNode/meshes/mesh_FEDCBA9876543210";

    struct CountingModel {
        stage: StageHandle,
        refreshes: Cell<usize>,
    }

    impl CountingModel {
        fn new(stage: &StageHandle) -> Rc<Self> {
            Rc::new(Self {
                stage: stage.clone(),
                refreshes: Cell::new(0),
            })
        }
    }

    impl ListenedModel for CountingModel {
        fn stage(&self) -> &StageHandle {
            &self.stage
        }

        fn refresh(&self) -> bool {
            self.refreshes.set(self.refreshes.get() + 1);
            true
        }
    }

    fn listener() -> UsdListener {
        UsdListener::new(&PropertyConfig::default()).unwrap()
    }

    fn stage() -> (Rc<InMemoryStage>, StageHandle) {
        let stage = Rc::new(InMemoryStage::new());
        stage.define_prim(MESH_A);
        stage.define_prim(MESH_B);
        let handle: StageHandle = stage.clone();
        (stage, handle)
    }

    #[test]
    fn test_one_subscription_per_stage() {
        let (stage, handle) = stage();
        let listener = listener();
        let first = CountingModel::new(&handle);
        let second = CountingModel::new(&handle);

        listener.add_model(first.clone());
        listener.add_model(second.clone());
        assert_eq!(listener.active_subscription_count(), 1);
        assert_eq!(stage.subscriber_count(), 1);

        listener.remove_model(first.as_ref());
        assert_eq!(stage.subscriber_count(), 1);
        assert!(listener.is_listening(stage.id()));

        listener.remove_model(second.as_ref());
        assert_eq!(stage.subscriber_count(), 0);
        assert_eq!(listener.active_subscription_count(), 0);
    }

    #[test]
    fn test_same_model_added_once() {
        let (_stage, handle) = stage();
        let listener = listener();
        let model = CountingModel::new(&handle);
        listener.add_model(model.clone());
        listener.add_model(model.clone());
        assert_eq!(listener.model_count(), 1);
    }

    #[test]
    fn test_resync_refreshes_once_per_notice() {
        let (stage, handle) = stage();
        let listener = listener();
        let model = CountingModel::new(&handle);
        listener.add_model(model.clone());

        stage.emit(&ObjectsChanged {
            resynced_paths: vec![SdfPath::new(MESH_A), SdfPath::new(MESH_B)],
            ..Default::default()
        });
        assert_eq!(model.refreshes.get(), 1);
    }

    #[test]
    fn test_non_structural_changes_are_ignored() {
        let (stage, handle) = stage();
        let listener = listener();
        let model = CountingModel::new(&handle);
        listener.add_model(model.clone());

        let ignored = [
            format!("{}.size", MESH_A),
            "/World/Cube".to_string(),
            "/RootNode/meshes/mesh_AAAAAAAAAAAAAAAA".to_string(),
        ];
        for path in ignored {
            stage.emit(&ObjectsChanged {
                resynced_paths: vec![SdfPath::new(path)],
                ..Default::default()
            });
        }
        stage.emit(&ObjectsChanged {
            changed_info_only_paths: vec![SdfPath::new(MESH_A)],
            ..Default::default()
        });
        assert_eq!(model.refreshes.get(), 0);
    }

    #[test]
    fn test_models_on_other_stages_are_untouched() {
        let (stage, handle) = stage();
        let (_other_stage, other_handle) = self::stage();
        let listener = listener();
        let model = CountingModel::new(&handle);
        let other = CountingModel::new(&other_handle);
        listener.add_model(model.clone());
        listener.add_model(other.clone());
        assert_eq!(listener.active_subscription_count(), 2);

        stage.emit(&ObjectsChanged {
            resynced_paths: vec![SdfPath::new(MESH_A)],
            ..Default::default()
        });
        assert_eq!(model.refreshes.get(), 1);
        assert_eq!(other.refreshes.get(), 0);

        listener.refresh_all();
        assert_eq!(model.refreshes.get(), 2);
        assert_eq!(other.refreshes.get(), 1);
    }

    #[test]
    fn test_destroy_revokes_subscriptions() {
        let (stage, handle) = stage();
        let listener = listener();
        listener.add_model(CountingModel::new(&handle));
        listener.destroy();
        assert_eq!(stage.subscriber_count(), 0);
        assert_eq!(listener.model_count(), 0);
    }
}
