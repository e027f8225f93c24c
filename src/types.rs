//! Protocol-adjacent types shared across provider operations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FrameworkError;

/// Capabilities the host advertises with each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClientCapabilities {
    /// The host can handle a deferred response instead of a completed
    /// operation.
    pub deferral_allowed: bool,
}

impl ClientCapabilities {
    /// Capabilities with deferral allowed.
    pub fn deferral_allowed() -> Self {
        Self {
            deferral_allowed: true,
        }
    }
}

/// Why an operation was deferred instead of completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferredReason {
    /// The resource configuration depends on values that are not known yet.
    ResourceConfigUnknown,
    /// The provider configuration depends on values that are not known yet.
    ProviderConfigUnknown,
    /// A prerequisite for the operation does not exist yet.
    AbsentPrereq,
}

impl fmt::Display for DeferredReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferredReason::ResourceConfigUnknown => write!(f, "Resource Config Unknown"),
            DeferredReason::ProviderConfigUnknown => write!(f, "Provider Config Unknown"),
            DeferredReason::AbsentPrereq => write!(f, "Absent Prereq"),
        }
    }
}

/// Marks an operation response as deferred: the host should retry the
/// operation later instead of treating the returned data as final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deferred {
    /// Why the operation was deferred.
    pub reason: DeferredReason,
}

impl Deferred {
    /// Create a deferred marker with the given reason.
    pub fn new(reason: DeferredReason) -> Self {
        Self { reason }
    }
}

/// State data as stored by the host, before it is decoded against a schema.
///
/// Raw state appears when the stored data may not match any schema the
/// current provider declares, for example when moving state from another
/// resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawState {
    /// The JSON document holding the state data.
    pub json: Vec<u8>,
}

impl RawState {
    /// Create raw state from a JSON document.
    pub fn new(json: impl Into<Vec<u8>>) -> Self {
        Self { json: json.into() }
    }

    /// Parse the JSON document.
    pub fn to_json(&self) -> Result<serde_json::Value, FrameworkError> {
        Ok(serde_json::from_slice(&self.json)?)
    }
}
