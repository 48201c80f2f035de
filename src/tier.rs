//! Tier Wiring
//!
//! Assembles one participant of the chain: its stack, registry, catalog,
//! navigation service and gate. A local tier publishes its components as they
//! are; a chained tier publishes them wrapped in the forwarding decorators.

use std::sync::Arc;
use tracing::info;

use crate::catalog::{CatalogHandle, DynCatalog};
use crate::chain::{ChainedCatalog, ChainedGate, ChainedRegistry, PeerResolver};
use crate::config::TierConfig;
use crate::error::CallResult;
use crate::navigation::{GateHandle, NavigationGate, NavigationService, NavigationStack};
use crate::registry::{CallRegistry, RegistryHandle};
use crate::scope::{Scope, UserId};

pub struct Tier {
    name: String,
    stack: Arc<NavigationStack>,
    registry: RegistryHandle,
    catalog: CatalogHandle,
    service: Arc<NavigationService>,
    gate: GateHandle,
}

impl Tier {
    /// A tier with no upstream peer (the end of the chain)
    pub fn local(config: &TierConfig) -> CallResult<Arc<Self>> {
        Self::build(config, None)
    }

    /// A tier that replicates every operation to the peer `resolver` hands out
    pub fn chained(config: &TierConfig, resolver: Arc<dyn PeerResolver>) -> CallResult<Arc<Self>> {
        Self::build(config, Some(resolver))
    }

    fn build(config: &TierConfig, resolver: Option<Arc<dyn PeerResolver>>) -> CallResult<Arc<Self>> {
        let name = config.name.clone();
        let stack = Arc::new(NavigationStack::new(&name));
        let local_registry = Arc::new(CallRegistry::new(&name));

        // the catalog always feeds the local table; forwarding happens at the
        // catalog level, not per call
        let local_catalog = Arc::new(DynCatalog::new(
            &name,
            stack.clone(),
            RegistryHandle::Local(local_registry.clone()),
        ));

        let (registry, catalog) = match &resolver {
            Some(resolver) => (
                RegistryHandle::Chained(Arc::new(ChainedRegistry::new(&name, local_registry, resolver.clone()))),
                CatalogHandle::Chained(Arc::new(ChainedCatalog::new(&name, local_catalog.clone(), resolver.clone()))),
            ),
            None => (
                RegistryHandle::Local(local_registry),
                CatalogHandle::Local(local_catalog.clone()),
            ),
        };

        let service = NavigationService::attach(&name, stack.clone(), local_catalog, catalog.clone())?;
        let local_gate = Arc::new(NavigationGate::new(&name, service.clone(), config.idle_capacity));
        let gate = match resolver {
            Some(resolver) => GateHandle::Chained(Arc::new(ChainedGate::new(&name, local_gate, resolver))),
            None => GateHandle::Local(local_gate),
        };

        info!(
            "Tier: {} ready ({}).",
            name,
            if matches!(gate, GateHandle::Chained(_)) { "chained" } else { "local" }
        );

        Ok(Arc::new(Self {
            name,
            stack,
            registry,
            catalog,
            service,
            gate,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self, user: UserId) -> Scope {
        Scope::new(user, &self.name)
    }

    pub fn stack(&self) -> &Arc<NavigationStack> {
        &self.stack
    }

    /// Published registry
    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// Published catalog
    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    pub fn service(&self) -> &Arc<NavigationService> {
        &self.service
    }

    /// Published gate
    pub fn gate(&self) -> &GateHandle {
        &self.gate
    }

    pub fn is_chained(&self) -> bool {
        matches!(self.gate, GateHandle::Chained(_))
    }
}
