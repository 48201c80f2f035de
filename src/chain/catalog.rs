//! Chained Dynamic Catalog

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{ensure_live, log_hop_failure, PeerResolver};
use crate::catalog::{BatchPhase, DynCatalog};
use crate::error::{CallError, CallResult};
use crate::primitives::{SectionCatalog, SectionKey};
use crate::scope::Scope;

enum Forward<'a> {
    Start,
    Section(&'a SectionCatalog),
    End,
    Enter(&'a SectionKey),
    Drop(&'a SectionKey),
}

impl Forward<'_> {
    fn name(&self) -> &'static str {
        match self {
            Forward::Start => "register_start",
            Forward::Section(_) => "register_section",
            Forward::End => "register_end",
            Forward::Enter(_) => "enter_section",
            Forward::Drop(_) => "drop_section",
        }
    }

    fn is_transition(&self) -> bool {
        matches!(self, Forward::Enter(_) | Forward::Drop(_))
    }
}

/// Runs every catalog operation on the upstream peer first, then locally
pub struct ChainedCatalog {
    tier: String,
    local: Arc<DynCatalog>,
    resolver: Arc<dyn PeerResolver>,
}

impl ChainedCatalog {
    pub fn new(tier: impl Into<String>, local: Arc<DynCatalog>, resolver: Arc<dyn PeerResolver>) -> Self {
        Self {
            tier: tier.into(),
            local,
            resolver,
        }
    }

    pub fn local(&self) -> &Arc<DynCatalog> {
        &self.local
    }

    pub async fn register_start(&self, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        self.forward(Forward::Start, scope, token).await?;
        self.local.register_start(scope, token).await
    }

    pub async fn register_section(
        &self,
        section: SectionCatalog,
        scope: &Scope,
        token: &CancellationToken,
    ) -> CallResult<()> {
        // protocol violations must not reach the peer
        self.expect_collecting("register_section", scope)?;
        self.forward(Forward::Section(&section), scope, token).await?;
        self.local.register_section(section, scope)
    }

    pub async fn register_end(&self, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        self.expect_collecting("register_end", scope)?;
        self.forward(Forward::End, scope, token).await?;
        self.local.register_end(scope, token).await
    }

    pub async fn enter_section(&self, key: &SectionKey, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        self.forward(Forward::Enter(key), scope, token).await?;
        self.local.enter_section(key, scope, token).await
    }

    pub async fn drop_section(&self, key: &SectionKey, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        self.forward(Forward::Drop(key), scope, token).await?;
        self.local.drop_section(key, scope, token).await
    }

    fn expect_collecting(&self, op: &str, scope: &Scope) -> CallResult<()> {
        match self.local.phase(scope) {
            BatchPhase::Collecting => Ok(()),
            phase => Err(CallError::usage(format!(
                "{}({}): catalog is {:?}, not collecting",
                op, scope, phase
            ))),
        }
    }

    async fn forward(&self, op: Forward<'_>, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        let name = op.name();
        self.try_forward(op, scope, token)
            .await
            .inspect_err(|e| log_hop_failure(&self.tier, name, scope, e))?;
        trace!("{}::ChainedCatalog: {}({}) forwarded.", self.tier, name, scope);
        Ok(())
    }

    async fn try_forward(&self, op: Forward<'_>, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        // enter/drop are halves of a navigation step, which always completes
        if !op.is_transition() {
            ensure_live(token)?;
        }
        let peer = self.resolver.peer(scope.user).await?;
        let owner = scope.owner.as_str();
        match op {
            Forward::Start => peer.start_catalog_batch(owner).await,
            Forward::Section(section) => peer.add_section(owner, section).await,
            Forward::End => peer.end_catalog_batch(owner).await,
            Forward::Enter(key) => peer.enter_section(owner, key).await,
            Forward::Drop(key) => peer.drop_section(owner, key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogHandle;
    use crate::chain::Peer;
    use crate::navigation::{NavigationService, NavigationStack};
    use crate::primitives::{CallInfo, NavChain};
    use crate::registry::{CallRegistry, RegistryHandle};
    use crate::scope::UserId;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPeer {
        ops: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingPeer {
        fn record(&self, op: String) -> CallResult<()> {
            self.ops.lock().unwrap().push(op);
            if self.fail {
                Err(CallError::transport("peer", "connection reset"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Peer for RecordingPeer {
        async fn start_catalog_batch(&self, owner: &str) -> CallResult<()> {
            self.record(format!("start:{}", owner))
        }
        async fn add_section(&self, _owner: &str, section: &SectionCatalog) -> CallResult<()> {
            self.record(format!("section:{}", section.key.name()))
        }
        async fn end_catalog_batch(&self, _owner: &str) -> CallResult<()> {
            self.record("end".to_string())
        }
        async fn enter_section(&self, _owner: &str, key: &SectionKey) -> CallResult<()> {
            self.record(format!("enter:{}", key.name()))
        }
        async fn drop_section(&self, _owner: &str, key: &SectionKey) -> CallResult<()> {
            self.record(format!("drop:{}", key.name()))
        }
        async fn register_global_call(&self, call: &CallInfo) -> CallResult<()> {
            self.record(format!("register:{}", call))
        }
        async fn unregister_global_call(&self, call: &CallInfo) -> CallResult<()> {
            self.record(format!("unregister:{}", call))
        }
        async fn navigate_via_chain(&self, _owner: &str, chain: &NavChain) -> CallResult<()> {
            self.record(format!("navigate:{}", chain))
        }
    }

    struct FixedResolver(Arc<RecordingPeer>);

    #[async_trait]
    impl PeerResolver for FixedResolver {
        async fn peer(&self, _user: UserId) -> CallResult<Arc<dyn Peer>> {
            Ok(self.0.clone())
        }
    }

    fn chained(peer: Arc<RecordingPeer>) -> (ChainedCatalog, Arc<CallRegistry>, Arc<NavigationService>) {
        let registry = Arc::new(CallRegistry::new("test"));
        let stack = Arc::new(NavigationStack::new("test"));
        let local = Arc::new(DynCatalog::new("test", stack.clone(), RegistryHandle::Local(registry.clone())));
        let chained = ChainedCatalog::new("test", local.clone(), Arc::new(FixedResolver(peer)));
        let service = NavigationService::attach("test", stack, local.clone(), CatalogHandle::Local(local)).unwrap();
        (chained, registry, service)
    }

    #[tokio::test]
    async fn test_peer_sees_batch_before_local() {
        let peer = Arc::new(RecordingPeer::default());
        let (catalog, registry, _service) = chained(peer.clone());
        let scope = Scope::new(UserId::new(), "shell");
        let token = CancellationToken::new();

        catalog.register_start(&scope, &token).await.unwrap();
        catalog
            .register_section(SectionCatalog::new("root", vec![CallInfo::new("h1", "").into_descriptor()]), &scope, &token)
            .await
            .unwrap();
        catalog.register_end(&scope, &token).await.unwrap();

        assert_eq!(*peer.ops.lock().unwrap(), vec!["start:shell", "section:root", "end"]);
        assert!(registry.summary(Some(scope.user)).contains_key("h1"));
    }

    #[tokio::test]
    async fn test_usage_error_not_forwarded() {
        let peer = Arc::new(RecordingPeer::default());
        let (catalog, _, _service) = chained(peer.clone());
        let scope = Scope::new(UserId::new(), "shell");

        let err = catalog
            .register_section(SectionCatalog::new("root", vec![]), &scope, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Usage(_)));
        assert!(peer.ops.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_peer_failure_skips_local() {
        let peer = Arc::new(RecordingPeer {
            fail: true,
            ..Default::default()
        });
        let (catalog, _, _service) = chained(peer);
        let scope = Scope::new(UserId::new(), "shell");

        let err = catalog.register_start(&scope, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CallError::Transport { .. }));
        assert_eq!(catalog.local().phase(&scope), BatchPhase::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_batches_not_transitions() {
        let peer = Arc::new(RecordingPeer::default());
        let (catalog, _, _service) = chained(peer.clone());
        let scope = Scope::new(UserId::new(), "shell");
        let token = CancellationToken::new();
        token.cancel();

        let err = catalog.register_start(&scope, &token).await.unwrap_err();
        assert!(err.is_cancelled());

        catalog.drop_section(&SectionKey::root(), &scope, &token).await.unwrap();
        catalog.enter_section(&"basic".into(), &scope, &token).await.unwrap();
        assert_eq!(*peer.ops.lock().unwrap(), vec!["drop:root", "enter:basic"]);
    }
}
