//! Call Descriptors and Handlers
//!
//! A `CallInfo` is the metadata of a call (what crosses the wire). A
//! `CallHandler` is that metadata plus, optionally, a body that can run it.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::output::CallOutput;
use crate::context::CallContext;

const CATEGORY_SEPARATOR: &str = "_";

/// Declared type of a call parameter. The set of tags is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    String,
    Int32,
    Boolean,
    Double,
    Float,
    Object,
}

impl ParamType {
    /// Coerce a raw default value into this type, `None` if it does not fit
    pub fn coerce(&self, raw: &Value) -> Option<Value> {
        match self {
            ParamType::String => match raw {
                Value::String(_) => Some(raw.clone()),
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                _ => None,
            },
            ParamType::Int32 => match raw {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                    .and_then(|i| i32::try_from(i).ok())
                    .map(Value::from),
                Value::String(s) => s.trim().parse::<i32>().ok().map(Value::from),
                _ => None,
            },
            ParamType::Boolean => match raw {
                Value::Bool(_) => Some(raw.clone()),
                Value::String(s) => s.trim().parse::<bool>().ok().map(Value::from),
                _ => None,
            },
            ParamType::Double | ParamType::Float => match raw {
                Value::Number(n) => n.as_f64().map(Value::from),
                Value::String(s) => s.trim().parse::<f64>().ok().map(Value::from),
                _ => None,
            },
            ParamType::Object => Some(raw.clone()),
        }
    }
}

/// Declared parameter of a call
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    pub description: String,
    pub param_type: Option<ParamType>,
    pub has_default: bool,
    pub default_value: Option<Value>,
}

impl ParamInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_type: Some(param_type),
            has_default: false,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.has_default = true;
        self.default_value = Some(value.into());
        self
    }
}

/// Call metadata. Equality is by name only.
#[derive(Debug, Clone, Default)]
pub struct CallInfo {
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub examples: Vec<String>,
    pub params: Vec<ParamInfo>,
    /// Declared by this process (as opposed to received from a peer)
    pub is_local: bool,
    /// Name of the process that declared the call
    pub owner: Option<String>,
}

impl CallInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_examples(mut self, examples: Vec<String>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_param(mut self, param: ParamInfo) -> Self {
        self.params.push(param);
        self
    }

    /// Mark as declared locally by `owner`
    pub fn declared_by(mut self, owner: impl Into<String>) -> Self {
        self.is_local = true;
        self.owner = Some(owner.into());
        self
    }

    /// Name the call is stored and invoked under: `category_name`, or just
    /// `name` without a category. Both parts start lower-case.
    pub fn call_name(&self) -> String {
        match self.category.as_deref().filter(|c| !c.is_empty()) {
            Some(category) => format!(
                "{}{}{}",
                lower_first(category),
                CATEGORY_SEPARATOR,
                lower_first(&self.name)
            ),
            None => lower_first(&self.name),
        }
    }

    /// Split a qualified call name into (category, name). A trailing `()` is
    /// ignored.
    pub fn split_call_name(call: &str) -> (Option<&str>, &str) {
        let call = call.strip_suffix("()").unwrap_or(call);
        match call.split_once(CATEGORY_SEPARATOR) {
            Some((category, name)) => (Some(category), name),
            None => (None, call),
        }
    }

    pub fn into_sync<F>(self, body: F) -> CallHandler
    where
        F: Fn(&CallContext, Vec<Value>) -> anyhow::Result<CallOutput> + Send + Sync + 'static,
    {
        CallHandler {
            info: self,
            invocation: Invocation::Sync(Arc::new(body)),
        }
    }

    pub fn into_async<F>(self, body: F) -> CallHandler
    where
        F: Fn(CallContext, Vec<Value>) -> BoxFuture<'static, anyhow::Result<CallOutput>>
            + Send
            + Sync
            + 'static,
    {
        CallHandler {
            info: self,
            invocation: Invocation::Async(Arc::new(body)),
        }
    }

    /// A handler with no body, used when only metadata is known
    pub fn into_descriptor(self) -> CallHandler {
        CallHandler {
            info: self,
            invocation: Invocation::Descriptor,
        }
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl PartialEq for CallInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CallInfo {}

impl Hash for CallInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for CallInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.call_name())
    }
}

pub type SyncBody = Arc<dyn Fn(&CallContext, Vec<Value>) -> anyhow::Result<CallOutput> + Send + Sync>;

pub type AsyncBody =
    Arc<dyn Fn(CallContext, Vec<Value>) -> BoxFuture<'static, anyhow::Result<CallOutput>> + Send + Sync>;

/// How (and whether) a handler can be executed
#[derive(Clone)]
pub enum Invocation {
    Sync(SyncBody),
    Async(AsyncBody),
    /// Metadata only; nothing to run
    Descriptor,
}

impl Invocation {
    pub fn is_async(&self) -> Option<bool> {
        match self {
            Invocation::Sync(_) => Some(false),
            Invocation::Async(_) => Some(true),
            Invocation::Descriptor => None,
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Sync(_) => f.write_str("Sync"),
            Invocation::Async(_) => f.write_str("Async"),
            Invocation::Descriptor => f.write_str("Descriptor"),
        }
    }
}

/// Call metadata plus its body. Equality is by name only.
#[derive(Debug, Clone)]
pub struct CallHandler {
    pub info: CallInfo,
    pub invocation: Invocation,
}

impl CallHandler {
    pub fn call_name(&self) -> String {
        self.info.call_name()
    }
}

impl PartialEq for CallHandler {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info
    }
}

impl Eq for CallHandler {}

impl fmt::Display for CallHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.info.fmt(f)
    }
}
