//! Loopback Transport
//!
//! In-process peers. Each hop is pushed through the wire encoding, so the
//! upstream tier only ever sees what a real transport would deliver: call
//! descriptors without bodies.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Peer, PeerResolver};
use crate::error::{CallError, CallResult};
use crate::primitives::{CallInfo, NavChain, SectionCatalog, SectionKey};
use crate::scope::{Scope, UserId};
use crate::tier::Tier;
use crate::wire::{self, WireCall, WireChain, WireSection};

/// Hands out one endpoint per user, all bound to the same upstream tier
pub struct LoopbackResolver {
    upstream: Arc<Tier>,
    peers: DashMap<UserId, Arc<TierEndpoint>>,
    disconnected: AtomicBool,
}

impl LoopbackResolver {
    pub fn new(upstream: Arc<Tier>) -> Self {
        Self {
            upstream,
            peers: DashMap::new(),
            disconnected: AtomicBool::new(false),
        }
    }

    /// Make every later resolution fail, as if the upstream process went away
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        self.peers.clear();
    }
}

#[async_trait]
impl PeerResolver for LoopbackResolver {
    async fn peer(&self, user: UserId) -> CallResult<Arc<dyn Peer>> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(CallError::PeerUnavailable {
                user: user.short(),
                reason: format!("{} is disconnected", self.upstream.name()),
            });
        }

        let endpoint: Arc<dyn Peer> = self
            .peers
            .entry(user)
            .or_insert_with(|| Arc::new(TierEndpoint::new(user, self.upstream.clone())))
            .clone();
        Ok(endpoint)
    }
}

/// A user-bound endpoint applying remote operations to a tier's published
/// components
pub struct TierEndpoint {
    user: UserId,
    tier: Arc<Tier>,
}

impl TierEndpoint {
    pub fn new(user: UserId, tier: Arc<Tier>) -> Self {
        Self { user, tier }
    }

    fn scope(&self, owner: &str) -> Scope {
        Scope::new(self.user, owner)
    }

    fn receive_call(call: &CallInfo) -> CallResult<CallInfo> {
        let text = wire::encode(&WireCall::from(call))?;
        let mut info = CallInfo::from(wire::decode::<WireCall>(&text)?);
        info.is_local = false;
        Ok(info)
    }
}

#[async_trait]
impl Peer for TierEndpoint {
    async fn start_catalog_batch(&self, owner: &str) -> CallResult<()> {
        debug!("{}::TierEndpoint: start_catalog_batch({})", self.tier.name(), owner);
        self.tier
            .catalog()
            .register_start(&self.scope(owner), &CancellationToken::new())
            .await
    }

    async fn add_section(&self, owner: &str, section: &SectionCatalog) -> CallResult<()> {
        let text = wire::encode(&WireSection::from(section))?;
        let section = SectionCatalog::from(wire::decode::<WireSection>(&text)?);
        debug!("{}::TierEndpoint: add_section({}, {})", self.tier.name(), owner, section);
        self.tier
            .catalog()
            .register_section(section, &self.scope(owner), &CancellationToken::new())
            .await
    }

    async fn end_catalog_batch(&self, owner: &str) -> CallResult<()> {
        debug!("{}::TierEndpoint: end_catalog_batch({})", self.tier.name(), owner);
        self.tier
            .catalog()
            .register_end(&self.scope(owner), &CancellationToken::new())
            .await
    }

    async fn enter_section(&self, owner: &str, key: &SectionKey) -> CallResult<()> {
        let key = SectionKey::new(key.name());
        self.tier
            .catalog()
            .enter_section(&key, &self.scope(owner), &CancellationToken::new())
            .await
    }

    async fn drop_section(&self, owner: &str, key: &SectionKey) -> CallResult<()> {
        let key = SectionKey::new(key.name());
        self.tier
            .catalog()
            .drop_section(&key, &self.scope(owner), &CancellationToken::new())
            .await
    }

    async fn register_global_call(&self, call: &CallInfo) -> CallResult<()> {
        let info = Self::receive_call(call)?;
        self.tier.registry().register_global(info.into_descriptor());
        Ok(())
    }

    async fn unregister_global_call(&self, call: &CallInfo) -> CallResult<()> {
        let info = Self::receive_call(call)?;
        self.tier.registry().unregister_global(&info);
        Ok(())
    }

    async fn navigate_via_chain(&self, owner: &str, chain: &NavChain) -> CallResult<()> {
        let text = wire::encode(&WireChain::from(chain))?;
        let chain = NavChain::from(wire::decode::<WireChain>(&text)?);
        debug!("{}::TierEndpoint: navigate_via_chain({}, {})", self.tier.name(), owner, chain);
        self.tier
            .gate()
            .wait_for_idle(Some(chain), &self.scope(owner), None, &CancellationToken::new())
            .await
    }
}
