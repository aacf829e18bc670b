// ============================================================================
// Shared Stack
// ============================================================================
//
// Process-wide default model, store coordinator and working context, built
// lazily on first use. Records fall back to this context whenever they are
// not handed one explicitly.
//
// The model, store URL and store options are read once, when the coordinator
// is first built. Changing them afterwards is recorded but has no effect on
// the running stack.
//
// ============================================================================

use crate::context::Context;
use crate::core::Result;
use crate::schema::ManagedObjectModel;
use crate::storage::{
    DurabilityMode, StoreConfig, StoreCoordinator, StoreOptions, default_store_url,
};
use lazy_static::lazy_static;
use log::{debug, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

lazy_static! {
    static ref SHARED_STACK: Mutex<SharedStack> = Mutex::new(SharedStack::default());
}

#[derive(Default)]
struct SharedStack {
    model: Option<Arc<ManagedObjectModel>>,
    store_url: Option<PathBuf>,
    options: Option<StoreOptions>,
    coordinator: Option<Arc<StoreCoordinator>>,
    context: Option<Context>,
}

impl SharedStack {
    fn coordinator(&mut self) -> Result<Arc<StoreCoordinator>> {
        if let Some(coordinator) = &self.coordinator {
            return Ok(coordinator.clone());
        }

        let model = match &self.model {
            Some(model) => model.clone(),
            None => Arc::new(ManagedObjectModel::merged_from_registered()?),
        };
        let store_url = self.store_url.clone().unwrap_or_else(default_store_url);
        let options = self.options.unwrap_or_default();

        if options.durability != DurabilityMode::None {
            if let Some(parent) = store_url.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!(
            "Opening shared store at {} ({} entities)",
            store_url.display(),
            model.entity_names().len()
        );
        let coordinator = Arc::new(StoreCoordinator::open(
            StoreConfig::new(store_url.clone())
                .model(model.clone())
                .options(options),
        )?);

        self.model = Some(model);
        self.store_url = Some(store_url);
        self.options = Some(options);
        self.coordinator = Some(coordinator.clone());
        Ok(coordinator)
    }

    fn warn_if_built(&self, setting: &str) {
        if self.coordinator.is_some() {
            warn!(
                "Shared store coordinator already exists; new {} is ignored by the running stack",
                setting
            );
        }
    }
}

/// The process-wide working context, created on first call. Every later call
/// returns a handle to the same context.
pub fn shared_context() -> Result<Context> {
    let mut stack = SHARED_STACK.lock()?;
    if let Some(context) = &stack.context {
        return Ok(context.clone());
    }
    let context = Context::new(stack.coordinator()?);
    stack.context = Some(context.clone());
    Ok(context)
}

/// Whether [`shared_context`] has already created the shared context. Never
/// creates it.
///
/// Unlike the other accessors this never fails: a poisoned stack lock reads
/// as "no shared context".
pub fn has_shared_context() -> bool {
    SHARED_STACK
        .lock()
        .map(|stack| stack.context.is_some())
        .unwrap_or(false)
}

/// The coordinator behind the shared context, opened on first call.
pub fn persistent_store_coordinator() -> Result<Arc<StoreCoordinator>> {
    SHARED_STACK.lock()?.coordinator()
}

pub fn persistent_store_options() -> Result<StoreOptions> {
    Ok(SHARED_STACK.lock()?.options.unwrap_or_default())
}

pub fn set_persistent_store_options(options: StoreOptions) -> Result<()> {
    let mut stack = SHARED_STACK.lock()?;
    stack.warn_if_built("store options");
    stack.options = Some(options);
    Ok(())
}

/// The model of the shared stack. Unless overridden, the merge of every
/// registered schema fragment.
pub fn managed_object_model() -> Result<Arc<ManagedObjectModel>> {
    let stack = SHARED_STACK.lock()?;
    match &stack.model {
        Some(model) => Ok(model.clone()),
        None => Ok(Arc::new(ManagedObjectModel::merged_from_registered()?)),
    }
}

pub fn set_managed_object_model(model: impl Into<Arc<ManagedObjectModel>>) -> Result<()> {
    let mut stack = SHARED_STACK.lock()?;
    stack.warn_if_built("model");
    stack.model = Some(model.into());
    Ok(())
}

/// File backing the shared store. Unless overridden, [`default_store_url`].
pub fn persistent_store_url() -> Result<PathBuf> {
    let stack = SHARED_STACK.lock()?;
    Ok(stack.store_url.clone().unwrap_or_else(default_store_url))
}

pub fn set_persistent_store_url(url: impl Into<PathBuf>) -> Result<()> {
    let mut stack = SHARED_STACK.lock()?;
    stack.warn_if_built("store URL");
    stack.store_url = Some(url.into());
    Ok(())
}
