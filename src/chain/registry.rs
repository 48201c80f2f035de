//! Chained Call Registry

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{ensure_live, log_hop_failure, PeerResolver};
use crate::error::CallResult;
use crate::primitives::{CallHandler, CallInfo};
use crate::registry::CallRegistry;
use crate::scope::UserId;

/// Forwards user-scoped registrations upstream, where they land in the
/// peer's global table. Global registration stays local.
pub struct ChainedRegistry {
    tier: String,
    local: Arc<CallRegistry>,
    resolver: Arc<dyn PeerResolver>,
}

impl ChainedRegistry {
    pub fn new(tier: impl Into<String>, local: Arc<CallRegistry>, resolver: Arc<dyn PeerResolver>) -> Self {
        Self {
            tier: tier.into(),
            local,
            resolver,
        }
    }

    pub fn local(&self) -> &Arc<CallRegistry> {
        &self.local
    }

    pub async fn register_for_user(
        &self,
        user: UserId,
        handler: CallHandler,
        token: &CancellationToken,
    ) -> CallResult<()> {
        let target = format!("{}, {}", user.short(), handler);
        self.forward("register_for_user", &target, user, token, &handler.info, true)
            .await?;

        self.local.register_for_user(user, handler);
        trace!("{}::ChainedRegistry: register_for_user({}) DONE.", self.tier, target);
        Ok(())
    }

    pub async fn unregister_for_user(
        &self,
        user: UserId,
        handler: &CallInfo,
        token: &CancellationToken,
    ) -> CallResult<()> {
        let target = format!("{}, {}", user.short(), handler);
        self.forward("unregister_for_user", &target, user, token, handler, false)
            .await?;

        self.local.unregister_for_user(user, handler);
        trace!("{}::ChainedRegistry: unregister_for_user({}) DONE.", self.tier, target);
        Ok(())
    }

    async fn forward(
        &self,
        op: &str,
        target: &str,
        user: UserId,
        token: &CancellationToken,
        call: &CallInfo,
        register: bool,
    ) -> CallResult<()> {
        self.try_forward(user, token, call, register)
            .await
            .inspect_err(|e| log_hop_failure(&self.tier, op, &target, e))
    }

    async fn try_forward(
        &self,
        user: UserId,
        token: &CancellationToken,
        call: &CallInfo,
        register: bool,
    ) -> CallResult<()> {
        ensure_live(token)?;
        let peer = self.resolver.peer(user).await?;
        if register {
            peer.register_global_call(call).await
        } else {
            peer.unregister_global_call(call).await
        }
    }
}
