// Module registry and global IPC handler table.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use super::{HttpHandler, IpcHandler, Module};
use crate::{CluegetterError, Result};

/// Catalog of registered modules.
///
/// Registration happens at startup under the exclusive lock; lookups and
/// enumeration run continuously under the shared lock during processing.
/// The module sequence is append-only and keeps registration order.
#[derive(Default)]
pub struct ModuleRegistry {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    modules: Vec<Arc<dyn Module>>,
    ipc: HashMap<String, IpcHandler>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module and merges its IPC handlers into the global table.
    ///
    /// Fails without side effect when the name is empty, the name is
    /// already taken, or any declared IPC handler key is already present.
    /// These are startup invariants; the caller aborts on error, since
    /// there is no safe continuation with an ambiguous plugin set.
    pub fn register(&self, module: Arc<dyn Module>) -> Result<()> {
        if module.name().is_empty() {
            return Err(CluegetterError::ModuleNameMissing);
        }

        let ipc = module.ipc_handlers();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if inner.modules.iter().any(|m| m.name() == module.name()) {
            return Err(CluegetterError::DuplicateModule(module.name().to_string()));
        }
        if let Some(key) = ipc.keys().find(|key| inner.ipc.contains_key(*key)) {
            return Err(CluegetterError::DuplicateIpcHandler(key.clone()));
        }

        inner.ipc.extend(ipc);
        info!("Registered module: {}", module.name());
        inner.modules.push(module);
        Ok(())
    }

    /// Every module whose `enable()` currently returns true, in
    /// registration order. Evaluated afresh on each call.
    pub fn modules(&self) -> Vec<Arc<dyn Module>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .modules
            .iter()
            .filter(|m| m.enable())
            .cloned()
            .collect()
    }

    /// The enabled module of that name, if any. Non-fatal lookup.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .modules
            .iter()
            .find(|m| m.name() == name)
            .filter(|m| m.enable())
            .cloned()
    }

    /// The enabled module of that name, required by `caller`.
    ///
    /// Hard runtime dependencies between modules are checked here, lazily
    /// at first use; a miss is a startup invariant violation naming both
    /// parties.
    pub fn require(&self, name: &str, caller: &str) -> Result<Arc<dyn Module>> {
        self.get(name)
            .ok_or_else(|| CluegetterError::DependencyMissing {
                caller: caller.to_string(),
                dependency: name.to_string(),
            })
    }

    /// Global-table lookup for the external command dispatcher.
    pub fn ipc_handler(&self, name: &str) -> Option<IpcHandler> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.ipc.get(name).cloned()
    }

    /// Snapshot of the global IPC handler table.
    pub fn ipc_handlers(&self) -> HashMap<String, IpcHandler> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.ipc.clone()
    }

    /// Merged path-to-callback map across enabled modules, for the external
    /// HTTP front-end.
    pub fn http_handlers(&self) -> HashMap<String, HttpHandler> {
        let mut merged = HashMap::new();
        for module in self.modules() {
            merged.extend(module.http_handlers());
        }
        merged
    }
}
