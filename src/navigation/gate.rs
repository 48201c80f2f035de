//! Navigation Gate
//!
//! Decouples navigation intent from its effect. Requests are queued per scope
//! and replayed in order when someone waits for the gate to become idle.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::NavigationService;
use crate::chain::ChainedGate;
use crate::error::{CallError, CallResult};
use crate::primitives::{NavChain, SectionKey};
use crate::scope::Scope;

/// Sent to subscribers once a replayed chain has completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateIdle {
    pub scope: Scope,
}

#[derive(Default)]
struct ScopeQueue {
    pending: Mutex<VecDeque<SectionKey>>,
    drain: AsyncMutex<()>,
}

pub struct NavigationGate {
    tier: String,
    service: Arc<NavigationService>,
    queues: DashMap<Scope, Arc<ScopeQueue>>,
    idle: broadcast::Sender<GateIdle>,
}

impl NavigationGate {
    pub fn new(tier: impl Into<String>, service: Arc<NavigationService>, idle_capacity: usize) -> Self {
        let (idle, _) = broadcast::channel(idle_capacity.max(1));
        Self {
            tier: tier.into(),
            service,
            queues: DashMap::new(),
            idle,
        }
    }

    fn queue(&self, scope: &Scope) -> Arc<ScopeQueue> {
        self.queues.entry(scope.clone()).or_default().clone()
    }

    /// Subscribe to idle notifications for every scope of this gate
    pub fn subscribe_idle(&self) -> broadcast::Receiver<GateIdle> {
        self.idle.subscribe()
    }

    /// Queue a transition to `key`
    pub fn go(&self, key: SectionKey, scope: &Scope) {
        debug!("{}::NavigationGate: go({}, {}) queued.", self.tier, key, scope);
        self.enqueue(key, scope);
    }

    /// Queue a step back
    pub fn go_back(&self, scope: &Scope) {
        debug!("{}::NavigationGate: go_back({}) queued.", self.tier, scope);
        self.enqueue(SectionKey::back(), scope);
    }

    fn enqueue(&self, key: SectionKey, scope: &Scope) {
        let queue = self.queue(scope);
        queue.pending.lock().unwrap_or_else(|e| e.into_inner()).push_back(key);
    }

    /// Atomically take everything queued for the scope, oldest first
    pub fn take_pending(&self, scope: &Scope) -> NavChain {
        let Some(queue) = self.queues.get(scope).map(|q| q.value().clone()) else {
            return NavChain::default();
        };
        let mut pending = queue.pending.lock().unwrap_or_else(|e| e.into_inner());
        NavChain::new(pending.drain(..).collect())
    }

    /// Replay `chain`, or the drained queue when no chain is given.
    ///
    /// Steps run one at a time in order; the first failure or a cancelled
    /// token stops the replay. `local_only` defaults to `false`.
    pub async fn wait_for_idle(
        &self,
        chain: Option<NavChain>,
        scope: &Scope,
        local_only: Option<bool>,
        token: &CancellationToken,
    ) -> CallResult<()> {
        let local_only = local_only.unwrap_or(false);
        if local_only {
            warn!(
                "{}::NavigationGate: wait_for_idle({}) local gate must cooperate with the remote stack.",
                self.tier, scope
            );
        }
        self.replay_after(chain, scope, local_only, token, |_| async { Ok(()) }).await
    }

    /// Drain-locked replay shared by the local and chained gates.
    ///
    /// `before` receives the resolved chain while the scope's drain lock is
    /// held; an error from it skips the local replay.
    pub(crate) async fn replay_after<F, Fut>(
        &self,
        chain: Option<NavChain>,
        scope: &Scope,
        local_only: bool,
        token: &CancellationToken,
        before: F,
    ) -> CallResult<()>
    where
        F: FnOnce(NavChain) -> Fut,
        Fut: Future<Output = CallResult<()>>,
    {
        let queue = self.queue(scope);
        let _drain = queue.drain.lock().await;

        let chain = match chain {
            Some(chain) => chain,
            None => self.take_pending(scope),
        };
        before(chain.clone()).await?;

        for key in chain.iter() {
            if token.is_cancelled() {
                return Err(CallError::Cancelled);
            }
            if key.is_back() {
                self.service.go_back(scope, local_only, token).await?;
            } else {
                self.service.go(key, scope, local_only, token).await?;
            }
        }

        debug!("{}::NavigationGate: replay({}) {} DONE.", self.tier, scope, chain);
        // no subscribers is fine
        let _ = self.idle.send(GateIdle { scope: scope.clone() });
        Ok(())
    }
}

/// The gate a tier publishes
#[derive(Clone)]
pub enum GateHandle {
    Local(Arc<NavigationGate>),
    Chained(Arc<ChainedGate>),
}

impl GateHandle {
    pub fn local(&self) -> &Arc<NavigationGate> {
        match self {
            GateHandle::Local(gate) => gate,
            GateHandle::Chained(chained) => chained.local(),
        }
    }

    pub fn go(&self, key: SectionKey, scope: &Scope) {
        self.local().go(key, scope);
    }

    pub fn go_back(&self, scope: &Scope) {
        self.local().go_back(scope);
    }

    pub fn subscribe_idle(&self) -> broadcast::Receiver<GateIdle> {
        self.local().subscribe_idle()
    }

    pub async fn wait_for_idle(
        &self,
        chain: Option<NavChain>,
        scope: &Scope,
        local_only: Option<bool>,
        token: &CancellationToken,
    ) -> CallResult<()> {
        match self {
            GateHandle::Local(gate) => gate.wait_for_idle(chain, scope, local_only, token).await,
            GateHandle::Chained(chained) => chained.wait_for_idle(chain, scope, local_only, token).await,
        }
    }
}
