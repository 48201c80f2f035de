//! Callgate
//!
//! Section-scoped call registry replicated across a chain of cooperating
//! tiers:
//! - Call registry with global and per-user tables
//! - Per-scope navigation stack driving section enter/drop
//! - Dynamic catalog built in start/section/end batches
//! - Navigation gate queueing requests until replayed
//! - Chain decorators forwarding every operation upstream first

pub mod catalog;
pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod harvest;
pub mod navigation;
pub mod primitives;
pub mod registry;
pub mod scope;
pub mod tier;
pub mod wire;

// Re-exports for convenience
pub use catalog::{CatalogHandle, DynCatalog};
pub use config::{ChainConfig, TierConfig};
pub use context::CallContext;
pub use error::{CallError, CallResult};
pub use harvest::{CallHarvester, CatalogFeed};
pub use navigation::{GateHandle, NavigationGate, NavigationService, NavigationStack};
pub use primitives::{CallHandler, CallInfo, CallOutput, NavChain, ParamInfo, ParamType, SectionCatalog, SectionKey};
pub use registry::{CallRegistry, RegistryHandle};
pub use scope::{Scope, UserId};
pub use tier::Tier;
