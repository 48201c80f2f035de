//! Call Registry
//!
//! Thread-safe table of invocable calls, split into a global (owner-wide)
//! table and per-user dynamic tables. Lookups prefer the user's table.

use dashmap::DashMap;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use crate::chain::ChainedRegistry;
use crate::context::CallContext;
use crate::error::{CallError, CallResult};
use crate::primitives::{CallHandler, CallInfo, CallOutput, Invocation};
use crate::scope::{short_user, UserId};

/// Local, authoritative call table of one tier
pub struct CallRegistry {
    tier: String,
    calls: DashMap<String, CallHandler>,
    user_calls: DashMap<UserId, DashMap<String, CallHandler>>,
}

impl CallRegistry {
    /// `tier` only labels log lines
    pub fn new(tier: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            calls: DashMap::new(),
            user_calls: DashMap::new(),
        }
    }

    pub fn register_global(&self, handler: CallHandler) {
        let name = handler.call_name();
        self.calls.insert(name.clone(), handler);
        trace!("{}::CallRegistry: register_global({}) DONE.", self.tier, name);
    }

    pub fn unregister_global(&self, handler: &CallInfo) {
        let name = handler.call_name();
        if self.calls.remove(&name).is_some() {
            trace!("{}::CallRegistry: unregister_global({}) DONE.", self.tier, name);
        }
    }

    pub fn register_for_user(&self, user: UserId, handler: CallHandler) {
        let name = handler.call_name();
        self.user_calls
            .entry(user)
            .or_default()
            .insert(name.clone(), handler);
        trace!("{}::CallRegistry: register_for_user({}, {}) DONE.", self.tier, user.short(), name);
    }

    /// Removing the last call of a user drops that user's table
    pub fn unregister_for_user(&self, user: UserId, handler: &CallInfo) {
        let name = handler.call_name();
        if let Some(table) = self.user_calls.get(&user) {
            table.remove(&name);
        } else {
            return;
        }
        self.user_calls.remove_if(&user, |_, table| table.is_empty());
        trace!("{}::CallRegistry: unregister_for_user({}, {}) DONE.", self.tier, user.short(), name);
    }

    /// Resolve a call by its qualified name; the user's table wins over global
    pub fn find(&self, call: &str, user: Option<UserId>) -> CallResult<CallHandler> {
        if let Some(table) = user.and_then(|u| self.user_calls.get(&u)) {
            let found = table.get(call).map(|h| h.value().clone());
            if let Some(handler) = found {
                return Ok(handler);
            }
        }

        self.calls
            .get(call)
            .map(|h| h.value().clone())
            .ok_or_else(|| CallError::NotFound {
                name: call.to_string(),
                user: short_user(user),
            })
    }

    /// Effective visible set: global calls overlaid by the user's calls
    pub fn summary(&self, user: Option<UserId>) -> BTreeMap<String, CallInfo> {
        let mut visible: BTreeMap<String, CallInfo> = self
            .calls
            .iter()
            .map(|e| (e.key().clone(), e.value().info.clone()))
            .collect();

        if let Some(table) = user.and_then(|u| self.user_calls.get(&u)) {
            for entry in table.iter() {
                visible.insert(entry.key().clone(), entry.value().info.clone());
            }
        }

        visible
    }

    /// Number of users that currently own a dynamic table
    pub fn user_table_count(&self) -> usize {
        self.user_calls.len()
    }

    fn resolve(&self, call: &str, user: Option<UserId>, args: &[Value], ctx: &mut CallContext) -> CallResult<CallHandler> {
        let handler = self.find(call, user)?;

        if args.len() != handler.info.params.len() {
            return Err(CallError::ArgumentMismatch {
                name: call.to_string(),
                expected: handler.info.params.len(),
                actual: args.len(),
            });
        }

        ctx.current = Some(handler.info.clone());
        Ok(handler)
    }

    /// Run a call synchronously.
    ///
    /// Lookup and argument-count problems are errors; anything that goes
    /// wrong inside the call itself comes back as a failed `CallOutput`.
    pub fn invoke(
        &self,
        call: &str,
        user: Option<UserId>,
        ctx: &mut CallContext,
        args: Vec<Value>,
    ) -> CallResult<CallOutput> {
        let handler = self.resolve(call, user, &args, ctx)?;

        let outcome = match &handler.invocation {
            Invocation::Sync(body) => run_sync(body.as_ref(), ctx, args),
            Invocation::Async(_) => Err(format!("Call '{}' does not support sync invocation.", call)),
            Invocation::Descriptor => Err(format!("Call '{}' has no invocable body.", call)),
        };

        Ok(self.finish("invoke", call, user, outcome))
    }

    /// Run a call, awaiting async bodies. Sync bodies run inline.
    pub async fn invoke_async(
        &self,
        call: &str,
        user: Option<UserId>,
        ctx: &mut CallContext,
        args: Vec<Value>,
    ) -> CallResult<CallOutput> {
        let handler = self.resolve(call, user, &args, ctx)?;

        let outcome = match &handler.invocation {
            Invocation::Async(body) => {
                match AssertUnwindSafe(body(ctx.clone(), args)).catch_unwind().await {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(panic) => Err(panic_message(panic)),
                }
            }
            Invocation::Sync(body) => run_sync(body.as_ref(), ctx, args),
            Invocation::Descriptor => Err(format!("Call '{}' has no invocable body.", call)),
        };

        Ok(self.finish("invoke_async", call, user, outcome))
    }

    fn finish(&self, op: &str, call: &str, user: Option<UserId>, outcome: Result<CallOutput, String>) -> CallOutput {
        match outcome {
            Ok(output) => output.resolved(),
            Err(message) => {
                error!(
                    "{}::CallRegistry: {}({}, {}) Error invoking call: {}",
                    self.tier,
                    op,
                    call,
                    short_user(user),
                    message
                );
                CallOutput::failure(message)
            }
        }
    }
}

fn run_sync(
    body: &(dyn Fn(&CallContext, Vec<Value>) -> anyhow::Result<CallOutput> + Send + Sync),
    ctx: &CallContext,
    args: Vec<Value>,
) -> Result<CallOutput, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| body(ctx, args))) {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(panic) => Err(panic_message(panic)),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "call panicked".to_string()
    }
}

/// The registry a tier publishes: either its local table, or that table
/// wrapped so user-scoped changes reach the upstream peer first.
#[derive(Clone)]
pub enum RegistryHandle {
    Local(Arc<CallRegistry>),
    Chained(Arc<ChainedRegistry>),
}

impl RegistryHandle {
    /// The local table behind this handle
    pub fn local(&self) -> &Arc<CallRegistry> {
        match self {
            RegistryHandle::Local(registry) => registry,
            RegistryHandle::Chained(chained) => chained.local(),
        }
    }

    pub fn register_global(&self, handler: CallHandler) {
        self.local().register_global(handler);
    }

    pub fn unregister_global(&self, handler: &CallInfo) {
        self.local().unregister_global(handler);
    }

    pub async fn register_for_user(
        &self,
        user: UserId,
        handler: CallHandler,
        token: &CancellationToken,
    ) -> CallResult<()> {
        match self {
            RegistryHandle::Local(registry) => {
                registry.register_for_user(user, handler);
                Ok(())
            }
            RegistryHandle::Chained(chained) => chained.register_for_user(user, handler, token).await,
        }
    }

    pub async fn unregister_for_user(
        &self,
        user: UserId,
        handler: &CallInfo,
        token: &CancellationToken,
    ) -> CallResult<()> {
        match self {
            RegistryHandle::Local(registry) => {
                registry.unregister_for_user(user, handler);
                Ok(())
            }
            RegistryHandle::Chained(chained) => chained.unregister_for_user(user, handler, token).await,
        }
    }

    pub fn find(&self, call: &str, user: Option<UserId>) -> CallResult<CallHandler> {
        self.local().find(call, user)
    }

    pub fn summary(&self, user: Option<UserId>) -> BTreeMap<String, CallInfo> {
        self.local().summary(user)
    }

    pub fn invoke(
        &self,
        call: &str,
        user: Option<UserId>,
        ctx: &mut CallContext,
        args: Vec<Value>,
    ) -> CallResult<CallOutput> {
        self.local().invoke(call, user, ctx, args)
    }

    pub async fn invoke_async(
        &self,
        call: &str,
        user: Option<UserId>,
        ctx: &mut CallContext,
        args: Vec<Value>,
    ) -> CallResult<CallOutput> {
        self.local().invoke_async(call, user, ctx, args).await
    }
}
