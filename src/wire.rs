//! Wire Documents
//!
//! Flat serde documents for everything that crosses a tier boundary. Field
//! names are stable; parameter type tags form a closed set and an unknown tag
//! fails decoding.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CallError, CallResult};
use crate::primitives::{CallInfo, NavChain, ParamInfo, ParamType, SectionCatalog, SectionKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireParam {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<ParamType>,
    #[serde(rename = "default", default)]
    pub has_default: Option<bool>,
    #[serde(rename = "defaultVal", default)]
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireCall {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub params: Vec<WireParam>,
    #[serde(default)]
    pub local: Option<bool>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSection {
    pub key: String,
    #[serde(default)]
    pub handlers: Vec<WireCall>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireChain {
    #[serde(default)]
    pub keys: Vec<String>,
}

impl From<&ParamInfo> for WireParam {
    fn from(param: &ParamInfo) -> Self {
        Self {
            name: param.name.clone(),
            description: param.description.clone(),
            param_type: param.param_type,
            has_default: Some(param.has_default),
            default_value: param.default_value.clone(),
        }
    }
}

impl From<WireParam> for ParamInfo {
    fn from(wire: WireParam) -> Self {
        let default_value = match (wire.default_value, wire.param_type) {
            (Some(raw), Some(ty)) => Some(ty.coerce(&raw).unwrap_or(raw)),
            (raw, _) => raw,
        };
        Self {
            name: wire.name,
            description: wire.description,
            param_type: wire.param_type,
            has_default: wire.has_default.unwrap_or(false),
            default_value,
        }
    }
}

impl From<&CallInfo> for WireCall {
    fn from(info: &CallInfo) -> Self {
        Self {
            name: info.name.clone(),
            description: info.description.clone(),
            category: info.category.clone(),
            examples: info.examples.clone(),
            params: info.params.iter().map(WireParam::from).collect(),
            local: Some(info.is_local),
            owner: info.owner.clone(),
        }
    }
}

impl From<WireCall> for CallInfo {
    fn from(wire: WireCall) -> Self {
        Self {
            name: wire.name,
            description: wire.description,
            category: wire.category,
            examples: wire.examples,
            params: wire.params.into_iter().map(ParamInfo::from).collect(),
            is_local: wire.local.unwrap_or(false),
            owner: wire.owner,
        }
    }
}

impl From<&SectionCatalog> for WireSection {
    fn from(section: &SectionCatalog) -> Self {
        Self {
            key: section.key.name().to_string(),
            handlers: section.calls.iter().map(|h| WireCall::from(&h.info)).collect(),
        }
    }
}

// Calls arriving inside a section are remote descriptors: no body, not local.
impl From<WireSection> for SectionCatalog {
    fn from(wire: WireSection) -> Self {
        let calls = wire
            .handlers
            .into_iter()
            .map(|w| {
                let mut info = CallInfo::from(w);
                info.is_local = false;
                info.into_descriptor()
            })
            .collect();
        SectionCatalog::new(SectionKey::new(wire.key), calls)
    }
}

impl From<&NavChain> for WireChain {
    fn from(chain: &NavChain) -> Self {
        Self {
            keys: chain.iter().map(|k| k.name().to_string()).collect(),
        }
    }
}

impl From<WireChain> for NavChain {
    fn from(wire: WireChain) -> Self {
        NavChain::new(wire.keys.into_iter().map(SectionKey::new).collect())
    }
}

/// Serialize a wire document to its JSON text
pub fn encode<T: Serialize>(doc: &T) -> CallResult<String> {
    Ok(serde_json::to_string(doc)?)
}

/// Parse a wire document; any structural problem is a decode failure
pub fn decode<T: DeserializeOwned>(text: &str) -> CallResult<T> {
    serde_json::from_str(text).map_err(|e| CallError::Decode(e.to_string()))
}
