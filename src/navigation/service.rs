//! Navigation Service
//!
//! Listens to the stack and applies each transition to a catalog: the tier's
//! own catalog for local-only transitions, the published one otherwise.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{NavigationStack, SectionEvent, SectionListener};
use crate::catalog::{CatalogHandle, DynCatalog};
use crate::error::CallResult;
use crate::primitives::SectionKey;
use crate::scope::Scope;

pub struct NavigationService {
    tier: String,
    stack: Arc<NavigationStack>,
    local: Arc<DynCatalog>,
    published: CatalogHandle,
}

impl NavigationService {
    /// Build the service and attach it as the stack's listener
    pub fn attach(
        tier: impl Into<String>,
        stack: Arc<NavigationStack>,
        local: Arc<DynCatalog>,
        published: CatalogHandle,
    ) -> CallResult<Arc<Self>> {
        let service = Arc::new(Self {
            tier: tier.into(),
            stack: stack.clone(),
            local,
            published,
        });
        let listener: Arc<dyn SectionListener> = service.clone();
        stack.attach(Arc::downgrade(&listener))?;
        Ok(service)
    }

    pub fn stack(&self) -> &Arc<NavigationStack> {
        &self.stack
    }

    pub async fn go(
        &self,
        key: &SectionKey,
        scope: &Scope,
        local_only: bool,
        token: &CancellationToken,
    ) -> CallResult<()> {
        self.stack.go(key, scope, local_only, token).await?;
        info!("{}::NavigationService: go({}) => {}", self.tier, key, self.stack.path(scope));
        Ok(())
    }

    pub async fn go_back(&self, scope: &Scope, local_only: bool, token: &CancellationToken) -> CallResult<()> {
        self.stack.go_back(scope, local_only, token).await?;
        info!("{}::NavigationService: go_back() => {}", self.tier, self.stack.path(scope));
        Ok(())
    }
}

#[async_trait]
impl SectionListener for NavigationService {
    async fn on_enter(&self, event: &SectionEvent, token: &CancellationToken) -> CallResult<()> {
        if event.local_only {
            self.local.enter_section(&event.key, &event.scope, token).await
        } else {
            self.published.enter_section(&event.key, &event.scope, token).await
        }
    }

    async fn on_drop(&self, event: &SectionEvent, token: &CancellationToken) -> CallResult<()> {
        if event.local_only {
            self.local.drop_section(&event.key, &event.scope, token).await
        } else {
            self.published.drop_section(&event.key, &event.scope, token).await
        }
    }
}
