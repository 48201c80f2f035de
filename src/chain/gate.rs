//! Chained Navigation Gate

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use super::{ensure_live, log_hop_failure, PeerResolver};
use crate::error::CallResult;
use crate::navigation::NavigationGate;
use crate::primitives::NavChain;
use crate::scope::Scope;

/// Sends the whole pending chain upstream, then replays it on this tier
pub struct ChainedGate {
    tier: String,
    local: Arc<NavigationGate>,
    resolver: Arc<dyn PeerResolver>,
}

impl ChainedGate {
    pub fn new(tier: impl Into<String>, local: Arc<NavigationGate>, resolver: Arc<dyn PeerResolver>) -> Self {
        Self {
            tier: tier.into(),
            local,
            resolver,
        }
    }

    pub fn local(&self) -> &Arc<NavigationGate> {
        &self.local
    }

    /// `local_only` defaults to `true`: the upstream tiers have already
    /// navigated, so this tier's transitions must not be forwarded again.
    /// The scope's drain lock is held from taking the queue until the local
    /// replay finishes, so every tier sees drains in the same order.
    pub async fn wait_for_idle(
        &self,
        chain: Option<NavChain>,
        scope: &Scope,
        local_only: Option<bool>,
        token: &CancellationToken,
    ) -> CallResult<()> {
        let local_only = local_only.unwrap_or(true);
        if !local_only {
            warn!(
                "{}::ChainedGate: wait_for_idle({}) remote gate must cooperate with the local stack.",
                self.tier, scope
            );
        }

        self.local
            .replay_after(chain, scope, local_only, token, |chain| self.forward(chain, scope, token))
            .await?;
        trace!("{}::ChainedGate: wait_for_idle({}) DONE.", self.tier, scope);
        Ok(())
    }

    async fn forward(&self, chain: NavChain, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        self.try_forward(&chain, scope, token)
            .await
            .inspect_err(|e| log_hop_failure(&self.tier, "wait_for_idle", scope, e))?;
        trace!("{}::ChainedGate: {} forwarded for ({}).", self.tier, chain, scope);
        Ok(())
    }

    async fn try_forward(&self, chain: &NavChain, scope: &Scope, token: &CancellationToken) -> CallResult<()> {
        ensure_live(token)?;
        let peer = self.resolver.peer(scope.user).await?;
        peer.navigate_via_chain(&scope.owner, chain).await
    }
}
