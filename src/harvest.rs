//! Call Harvester
//!
//! Feeds declared calls into a tier: global calls straight into the
//! registry, section catalogs through one start/section/end batch.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::catalog::CatalogHandle;
use crate::error::{CallError, CallResult};
use crate::primitives::{CallHandler, SectionCatalog, SectionKey};
use crate::registry::RegistryHandle;
use crate::scope::{Scope, UserId};

/// Result of one scan: sections for the catalog batch plus global calls
#[derive(Debug, Clone, Default)]
pub struct CatalogFeed {
    pub sections: Vec<SectionCatalog>,
    pub globals: Vec<CallHandler>,
}

impl CatalogFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(mut self, key: impl Into<SectionKey>, calls: Vec<CallHandler>) -> Self {
        self.sections.push(SectionCatalog::new(key, calls));
        self
    }

    pub fn global(mut self, call: CallHandler) -> Self {
        self.globals.push(call);
        self
    }
}

pub struct CallHarvester {
    registry: RegistryHandle,
    catalog: CatalogHandle,
}

impl CallHarvester {
    pub fn new(registry: RegistryHandle, catalog: CatalogHandle) -> Self {
        Self { registry, catalog }
    }

    /// Register flat calls: globally, or for one user when given
    pub async fn harvest_statics(
        &self,
        calls: &[CallHandler],
        user: Option<UserId>,
        token: &CancellationToken,
    ) -> CallResult<()> {
        for call in calls {
            if token.is_cancelled() {
                return Err(CallError::Cancelled);
            }
            match user {
                Some(user) => self.registry.register_for_user(user, call.clone(), token).await?,
                None => self.registry.register_global(call.clone()),
            }
        }
        Ok(())
    }

    /// Rebuild the scope's catalog from `sections` in one batch
    pub async fn harvest_dynamics(
        &self,
        sections: &[SectionCatalog],
        scope: &Scope,
        token: &CancellationToken,
    ) -> CallResult<()> {
        self.catalog.register_start(scope, token).await?;

        for section in sections {
            if token.is_cancelled() {
                return Err(CallError::Cancelled);
            }
            self.catalog.register_section(section.clone(), scope, token).await?;
        }

        self.catalog.register_end(scope, token).await
    }

    /// Globals first, then the section batch
    pub async fn harvest(&self, feed: &CatalogFeed, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        self.harvest_statics(&feed.globals, None, token).await?;
        self.harvest_dynamics(&feed.sections, scope, token).await?;
        info!(
            "CallHarvester: harvested {} global calls and {} sections for ({}).",
            feed.globals.len(),
            feed.sections.len(),
            scope
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierConfig;
    use crate::primitives::CallInfo;
    use crate::tier::Tier;

    #[tokio::test]
    async fn test_harvest_scenario() {
        let tier = Tier::local(&TierConfig::new("shell")).unwrap();
        let harvester = CallHarvester::new(tier.registry().clone(), tier.catalog().clone());
        let scope = tier.scope(UserId::new());
        let feed = CatalogFeed::new()
            .global(CallInfo::new("ping", "").into_descriptor())
            .section("root", vec![CallInfo::new("h1", "").into_descriptor()])
            .section("basic", vec![CallInfo::new("h2", "").into_descriptor()]);

        harvester.harvest(&feed, &scope, &CancellationToken::new()).await.unwrap();

        let names: Vec<String> = tier.registry().summary(Some(scope.user)).into_keys().collect();
        assert_eq!(names, vec!["h1", "ping"]);
        assert_eq!(tier.registry().summary(None).len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_between_sections() {
        let tier = Tier::local(&TierConfig::new("shell")).unwrap();
        let harvester = CallHarvester::new(tier.registry().clone(), tier.catalog().clone());
        let scope = tier.scope(UserId::new());
        let token = CancellationToken::new();
        token.cancel();

        let sections = vec![SectionCatalog::new("root", vec![])];
        let err = harvester.harvest_dynamics(&sections, &scope, &token).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(tier.catalog().local().sections(&scope).is_empty());
    }

    #[tokio::test]
    async fn test_statics_for_user() {
        let tier = Tier::local(&TierConfig::new("shell")).unwrap();
        let harvester = CallHarvester::new(tier.registry().clone(), tier.catalog().clone());
        let user = UserId::new();

        let calls = vec![CallInfo::new("mine", "").into_descriptor()];
        harvester.harvest_statics(&calls, Some(user), &CancellationToken::new()).await.unwrap();
        assert!(tier.registry().summary(None).is_empty());
        assert!(tier.registry().find("mine", Some(user)).is_ok());
    }
}
