//! Private state data stored alongside resource state.
//!
//! Providers can stash small JSON documents next to resource state that the
//! host persists but never interprets. The blob is partitioned into a
//! framework-reserved portion, whose keys start with a period, and a
//! provider portion for everything else. Provider code only ever touches
//! [`ProviderPrivateData`]; the framework portion is managed by the dispatch
//! layer.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

use crate::diagnostics::{Diagnostics, FRAMEWORK_ISSUE};

/// Framework-reserved private state key marking state produced by import
/// rather than a prior read. The value is the JSON `true` literal.
pub const IMPORT_BEFORE_READ_KEY: &str = ".import_before_read";

fn restricted_namespace_diagnostics(key: &str, diagnostics: &mut Diagnostics) {
    diagnostics.add_error(
        "Restricted Resource Private State Namespace",
        format!(
            "Using a period ('.') as a prefix for a key used in private state is not allowed.\n\n\
             The key {key:?} is invalid. Please check the key you are supplying does not use a period ('.') as a prefix.",
        ),
    );
}

/// The provider-controlled portion of private state.
///
/// Keys must not start with a period and values must be valid UTF-8 JSON
/// documents. Both constraints are enforced on every access so malformed
/// data never reaches the stored blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderPrivateData {
    entries: BTreeMap<String, Vec<u8>>,
}

impl ProviderPrivateData {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the value stored under a key.
    ///
    /// Returns `None` without diagnostics when the key has no value. Keys in
    /// the framework-reserved namespace produce an error diagnostic.
    pub fn get_key(&self, key: &str) -> (Option<&[u8]>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        if key.starts_with('.') {
            restricted_namespace_diagnostics(key, &mut diagnostics);
            return (None, diagnostics);
        }
        (self.entries.get(key).map(Vec::as_slice), diagnostics)
    }

    /// Store a value under a key, validating the key and value first.
    ///
    /// Nothing is stored when validation fails; the returned diagnostics
    /// describe the problem.
    pub fn set_key(&mut self, key: &str, value: &[u8]) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if key.starts_with('.') {
            restricted_namespace_diagnostics(key, &mut diagnostics);
            return diagnostics;
        }

        if std::str::from_utf8(value).is_err() {
            diagnostics.add_error(
                "UTF-8 Invalid",
                format!(
                    "Values stored in private state must be valid UTF-8.\n\n\
                     The value being supplied for key {key:?} is invalid. Please verify that the value is valid UTF-8.",
                ),
            );
            return diagnostics;
        }

        if serde_json::from_slice::<serde_json::Value>(value).is_err() {
            diagnostics.add_error(
                "JSON Invalid",
                format!(
                    "Values stored in private state must be valid JSON.\n\n\
                     The value being supplied for key {key:?} is invalid. Please verify that the value is valid JSON.",
                ),
            );
            return diagnostics;
        }

        self.entries.insert(key.to_string(), value.to_vec());
        diagnostics
    }

    /// Whether no values are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.entries.iter()
    }

    fn insert_unchecked(&mut self, key: String, value: Vec<u8>) {
        self.entries.insert(key, value);
    }
}

/// The full private state blob for one resource instance: the
/// framework-reserved portion plus the provider portion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivateData {
    framework: BTreeMap<String, Vec<u8>>,
    /// The provider-controlled portion.
    pub provider: ProviderPrivateData,
}

impl PrivateData {
    /// Create an empty private state blob.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a stored blob.
    ///
    /// Empty input yields `None` with no diagnostics. Malformed input yields
    /// `None` and error diagnostics; partial data is never returned.
    pub fn from_bytes(data: &[u8]) -> (Option<Self>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();

        if data.is_empty() {
            return (None, diagnostics);
        }

        let decode_error = |diagnostics: &mut Diagnostics, err: &dyn std::fmt::Display| {
            diagnostics.add_error(
                "Error Decoding Private State",
                format!(
                    "An error was encountered when decoding private state: {err}.\n\n{FRAMEWORK_ISSUE}",
                ),
            );
        };

        let encoded: BTreeMap<String, String> = match serde_json::from_slice(data) {
            Ok(encoded) => encoded,
            Err(err) => {
                decode_error(&mut diagnostics, &err);
                return (None, diagnostics);
            }
        };

        let mut result = PrivateData::new();
        for (key, encoded_value) in encoded {
            let value = match BASE64_STANDARD.decode(&encoded_value) {
                Ok(value) => value,
                Err(err) => {
                    decode_error(&mut diagnostics, &err);
                    continue;
                }
            };

            if std::str::from_utf8(&value).is_err() {
                diagnostics.add_error(
                    "Error Decoding Private State",
                    format!(
                        "An error was encountered when validating private state value.\n\
                         The value being supplied for key {key:?} is not valid UTF-8.\n\n{FRAMEWORK_ISSUE}",
                    ),
                );
                continue;
            }

            if serde_json::from_slice::<serde_json::Value>(&value).is_err() {
                diagnostics.add_error(
                    "Error Decoding Private State",
                    format!(
                        "An error was encountered when validating private state value.\n\
                         The value being supplied for key {key:?} is not valid JSON.\n\n{FRAMEWORK_ISSUE}",
                    ),
                );
                continue;
            }

            if key.starts_with('.') {
                result.framework.insert(key, value);
            } else {
                result.provider.insert_unchecked(key, value);
            }
        }

        if diagnostics.has_error() {
            return (None, diagnostics);
        }
        (Some(result), diagnostics)
    }

    /// Encode this blob for storage.
    ///
    /// Returns `None` when there is nothing to store. Keys with empty values
    /// are dropped. Values that fail validation produce error diagnostics
    /// and no output.
    pub fn to_bytes(&self) -> (Option<Vec<u8>>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut encoded: BTreeMap<&str, String> = BTreeMap::new();

        let entries = self
            .framework
            .iter()
            .chain(self.provider.iter())
            .filter(|(_, value)| !value.is_empty());

        for (key, value) in entries {
            if std::str::from_utf8(value).is_err() {
                diagnostics.add_error(
                    "Error Encoding Private State",
                    format!(
                        "An error was encountered when validating private state value.\n\
                         The value associated with key {key:?} is not valid UTF-8.\n\n{FRAMEWORK_ISSUE}",
                    ),
                );
                continue;
            }

            if serde_json::from_slice::<serde_json::Value>(value).is_err() {
                diagnostics.add_error(
                    "Error Encoding Private State",
                    format!(
                        "An error was encountered when validating private state value.\n\
                         The value associated with key {key:?} is not valid JSON.\n\n{FRAMEWORK_ISSUE}",
                    ),
                );
                continue;
            }

            encoded.insert(key.as_str(), BASE64_STANDARD.encode(value));
        }

        if diagnostics.has_error() {
            return (None, diagnostics);
        }
        if encoded.is_empty() {
            return (None, diagnostics);
        }

        match serde_json::to_vec(&encoded) {
            Ok(bytes) => (Some(bytes), diagnostics),
            Err(err) => {
                diagnostics.add_error(
                    "Error Encoding Private State",
                    format!(
                        "An error was encountered when encoding private state: {err}.\n\n{FRAMEWORK_ISSUE}",
                    ),
                );
                (None, diagnostics)
            }
        }
    }

    /// Read a value from the framework-reserved portion.
    pub fn framework_get(&self, key: &str) -> Option<&[u8]> {
        self.framework.get(key).map(Vec::as_slice)
    }

    pub(crate) fn framework_set(&mut self, key: &str, value: Vec<u8>) {
        self.framework.insert(key.to_string(), value);
    }

    pub(crate) fn framework_remove(&mut self, key: &str) {
        self.framework.remove(key);
    }

    /// Whether both portions are empty.
    pub fn is_empty(&self) -> bool {
        self.framework.is_empty() && self.provider.is_empty()
    }
}
