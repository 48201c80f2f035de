//! Navigation
//!
//! The per-scope section stack, the service that turns its transitions into
//! catalog enter/drop calls, and the gate that queues navigation requests.

pub mod gate;
pub mod service;
pub mod stack;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::CallResult;
use crate::primitives::SectionKey;
use crate::scope::Scope;

pub use gate::{GateHandle, GateIdle, NavigationGate};
pub use service::NavigationService;
pub use stack::NavigationStack;

/// One enter or drop notification emitted by the stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionEvent {
    pub key: SectionKey,
    pub scope: Scope,
    /// Apply to this tier only, without forwarding upstream
    pub local_only: bool,
}

/// Receiver of stack transitions. The stack awaits each notification before
/// it continues.
#[async_trait]
pub trait SectionListener: Send + Sync {
    async fn on_enter(&self, event: &SectionEvent, token: &CancellationToken) -> CallResult<()>;

    async fn on_drop(&self, event: &SectionEvent, token: &CancellationToken) -> CallResult<()>;
}
