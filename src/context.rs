//! Call Context
//!
//! Per-invocation context handed explicitly down the invocation path. The
//! registry records the call being executed here before running its body, so
//! nested logic can ask "which call am I inside?".

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::primitives::CallInfo;
use crate::scope::UserId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallContext {
    /// Call currently executing (set by the registry)
    #[serde(skip)]
    pub current: Option<CallInfo>,

    #[serde(rename = "user", default)]
    pub user: Option<UserId>,

    #[serde(rename = "thread-id", default)]
    pub thread_id: Option<Uuid>,

    #[serde(rename = "thread-name", default)]
    pub thread_name: Option<String>,

    #[serde(rename = "turn", default)]
    pub turn_id: Option<Uuid>,

    #[serde(rename = "persona", default)]
    pub persona_id: Option<Uuid>,

    #[serde(rename = "essence", default)]
    pub essence_id: Option<Uuid>,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl CallContext {
    pub fn for_user(user: UserId) -> Self {
        Self {
            user: Some(user),
            ..Default::default()
        }
    }

    /// Name of the call being executed, if any
    pub fn current_call(&self) -> Option<String> {
        self.current.as_ref().map(CallInfo::call_name)
    }
}
