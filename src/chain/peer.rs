//! Peer Surface
//!
//! The narrow remote-call boundary between two adjacent tiers.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::CallResult;
use crate::primitives::{CallInfo, NavChain, SectionCatalog, SectionKey};
use crate::scope::UserId;

/// Operations a tier can ask of its upstream neighbour, on behalf of one user
#[async_trait]
pub trait Peer: Send + Sync {
    async fn start_catalog_batch(&self, owner: &str) -> CallResult<()>;

    async fn add_section(&self, owner: &str, section: &SectionCatalog) -> CallResult<()>;

    async fn end_catalog_batch(&self, owner: &str) -> CallResult<()>;

    async fn enter_section(&self, owner: &str, key: &SectionKey) -> CallResult<()>;

    async fn drop_section(&self, owner: &str, key: &SectionKey) -> CallResult<()>;

    async fn register_global_call(&self, call: &CallInfo) -> CallResult<()>;

    async fn unregister_global_call(&self, call: &CallInfo) -> CallResult<()>;

    async fn navigate_via_chain(&self, owner: &str, chain: &NavChain) -> CallResult<()>;
}

/// Finds the peer handle for a user
#[async_trait]
pub trait PeerResolver: Send + Sync {
    async fn peer(&self, user: UserId) -> CallResult<Arc<dyn Peer>>;
}
