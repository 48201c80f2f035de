//! Primitives
//!
//! Value types shared by the registry, the catalog and navigation.

mod call;
mod chain;
mod key;
mod output;

pub use call::{AsyncBody, CallHandler, CallInfo, Invocation, ParamInfo, ParamType, SyncBody};
pub use chain::NavChain;
pub use key::{SectionCatalog, SectionKey, BACK_KEY, ROOT_KEY};
pub use output::CallOutput;
