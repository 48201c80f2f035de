//! Chain Replication
//!
//! Decorators that forward each operation to the upstream peer tier, await
//! it, and only then apply it locally. Failures are logged and returned
//! unchanged.

pub mod catalog;
pub mod gate;
pub mod loopback;
pub mod peer;
pub mod registry;

pub use catalog::ChainedCatalog;
pub use gate::ChainedGate;
pub use loopback::{LoopbackResolver, TierEndpoint};
pub use peer::{Peer, PeerResolver};
pub use registry::ChainedRegistry;

use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::error::{CallError, CallResult};

/// Refuse to start another hop once the token is cancelled
pub(crate) fn ensure_live(token: &CancellationToken) -> CallResult<()> {
    if token.is_cancelled() {
        Err(CallError::Cancelled)
    } else {
        Ok(())
    }
}

pub(crate) fn log_hop_failure(tier: &str, op: &str, scope: &dyn std::fmt::Display, err: &CallError) {
    error!(tier = %tier, op = %op, scope = %scope, "{}::{}({}) FAILED: {}", tier, op, scope, err);
}
