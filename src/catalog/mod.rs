//! Dynamic Catalog
//!
//! Per-scope mapping from a section to the calls declared for it. A catalog is
//! built in one batch (start, sections, end); afterwards navigation enter/drop
//! notifications (un)register a section's calls for the scope's user.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::chain::ChainedCatalog;
use crate::error::{CallError, CallResult};
use crate::navigation::NavigationStack;
use crate::primitives::{CallHandler, SectionCatalog, SectionKey};
use crate::registry::RegistryHandle;
use crate::scope::Scope;

/// Where a scope's catalog is in its build cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPhase {
    #[default]
    Idle,
    Collecting,
    Finalized,
}

#[derive(Default)]
struct ScopeCatalog {
    phase: BatchPhase,
    sections: HashMap<SectionKey, SectionCatalog>,
}

pub struct DynCatalog {
    tier: String,
    stack: Arc<NavigationStack>,
    registry: RegistryHandle,
    scopes: DashMap<Scope, Arc<Mutex<ScopeCatalog>>>,
}

impl DynCatalog {
    pub fn new(tier: impl Into<String>, stack: Arc<NavigationStack>, registry: RegistryHandle) -> Self {
        Self {
            tier: tier.into(),
            stack,
            registry,
            scopes: DashMap::new(),
        }
    }

    fn with_scope<R>(&self, scope: &Scope, f: impl FnOnce(&mut ScopeCatalog) -> R) -> R {
        let state = self.scopes.entry(scope.clone()).or_default().clone();
        let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Read without allocating state for an unknown scope
    fn peek<R: Default>(&self, scope: &Scope, f: impl FnOnce(&ScopeCatalog) -> R) -> R {
        let Some(state) = self.scopes.get(scope).map(|e| e.value().clone()) else {
            return R::default();
        };
        let guard = state.lock().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    pub fn phase(&self, scope: &Scope) -> BatchPhase {
        self.peek(scope, |state| state.phase)
    }

    /// Declared section keys, sorted by name
    pub fn sections(&self, scope: &Scope) -> Vec<SectionKey> {
        let mut keys: Vec<SectionKey> = self.peek(scope, |state| state.sections.keys().cloned().collect());
        keys.sort();
        keys
    }

    /// Number of scopes holding catalog state
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Begin a new batch: collapse the scope's stack, forget its catalog
    pub async fn register_start(&self, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        self.stack.clear(scope, token).await?;

        self.with_scope(scope, |state| {
            state.sections.clear();
            state.phase = BatchPhase::Collecting;
        });

        trace!("{}::DynCatalog: register_start({}) DONE.", self.tier, scope);
        Ok(())
    }

    /// Upsert a section; only valid while collecting
    pub fn register_section(&self, section: SectionCatalog, scope: &Scope) -> CallResult<()> {
        let name = section.to_string();
        self.with_scope(scope, |state| match state.phase {
            BatchPhase::Collecting => {
                state.sections.insert(section.key.clone(), section);
                Ok(())
            }
            BatchPhase::Idle => Err(CallError::usage(format!(
                "register_section({}) for ({}): register_start must be called first",
                name, scope
            ))),
            BatchPhase::Finalized => Err(CallError::usage(format!(
                "register_section({}) for ({}): catalog already finalized",
                name, scope
            ))),
        })?;

        trace!("{}::DynCatalog: register_section({}, {}) DONE.", self.tier, name, scope);
        Ok(())
    }

    /// Close the batch and enter root
    pub async fn register_end(&self, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        self.with_scope(scope, |state| match state.phase {
            BatchPhase::Collecting => {
                state.phase = BatchPhase::Finalized;
                Ok(())
            }
            BatchPhase::Idle => Err(CallError::usage(format!(
                "register_end({}): register_start must be called first",
                scope
            ))),
            BatchPhase::Finalized => Err(CallError::usage(format!(
                "register_end({}): catalog already finalized",
                scope
            ))),
        })?;

        self.stack.init(scope, token).await?;

        trace!("{}::DynCatalog: register_end({}) DONE.", self.tier, scope);
        Ok(())
    }

    fn section_calls(&self, op: &str, key: &SectionKey, scope: &Scope) -> Option<Vec<CallHandler>> {
        // unknown scope: nothing was ever declared, stay silent
        let calls = self.peek(scope, |state| Some(state.sections.get(key).map(|s| s.calls.clone())))?;
        if calls.is_none() {
            warn!("{}::DynCatalog: {}({}, {}) Section not found in catalog.", self.tier, op, key, scope);
        }
        calls
    }

    /// Register every call of `key` for the scope's user
    pub async fn enter_section(&self, key: &SectionKey, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        let Some(calls) = self.section_calls("enter_section", key, scope) else {
            return Ok(());
        };

        for call in calls {
            self.registry.register_for_user(scope.user, call, token).await?;
        }

        trace!("{}::DynCatalog: enter_section({}, {}) DONE.", self.tier, key, scope);
        Ok(())
    }

    /// Unregister every call of `key` for the scope's user
    pub async fn drop_section(&self, key: &SectionKey, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        let Some(calls) = self.section_calls("drop_section", key, scope) else {
            return Ok(());
        };

        for call in calls {
            self.registry.unregister_for_user(scope.user, &call.info, token).await?;
        }

        trace!("{}::DynCatalog: drop_section({}, {}) DONE.", self.tier, key, scope);
        Ok(())
    }

    /// Collapse the stack and forget the catalog; the scope returns to idle
    pub async fn clear(&self, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        self.stack.clear(scope, token).await?;

        self.with_scope(scope, |state| {
            state.sections.clear();
            state.phase = BatchPhase::Idle;
        });

        trace!("{}::DynCatalog: clear({}) DONE.", self.tier, scope);
        Ok(())
    }
}

/// The catalog a tier publishes: its own, or its own behind the upstream peer
#[derive(Clone)]
pub enum CatalogHandle {
    Local(Arc<DynCatalog>),
    Chained(Arc<ChainedCatalog>),
}

impl CatalogHandle {
    pub fn local(&self) -> &Arc<DynCatalog> {
        match self {
            CatalogHandle::Local(catalog) => catalog,
            CatalogHandle::Chained(chained) => chained.local(),
        }
    }

    pub async fn register_start(&self, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        match self {
            CatalogHandle::Local(catalog) => catalog.register_start(scope, token).await,
            CatalogHandle::Chained(chained) => chained.register_start(scope, token).await,
        }
    }

    pub async fn register_section(
        &self,
        section: SectionCatalog,
        scope: &Scope,
        token: &CancellationToken,
    ) -> CallResult<()> {
        match self {
            CatalogHandle::Local(catalog) => catalog.register_section(section, scope),
            CatalogHandle::Chained(chained) => chained.register_section(section, scope, token).await,
        }
    }

    pub async fn register_end(&self, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        match self {
            CatalogHandle::Local(catalog) => catalog.register_end(scope, token).await,
            CatalogHandle::Chained(chained) => chained.register_end(scope, token).await,
        }
    }

    pub async fn enter_section(&self, key: &SectionKey, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        match self {
            CatalogHandle::Local(catalog) => catalog.enter_section(key, scope, token).await,
            CatalogHandle::Chained(chained) => chained.enter_section(key, scope, token).await,
        }
    }

    pub async fn drop_section(&self, key: &SectionKey, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        match self {
            CatalogHandle::Local(catalog) => catalog.drop_section(key, scope, token).await,
            CatalogHandle::Chained(chained) => chained.drop_section(key, scope, token).await,
        }
    }
}
