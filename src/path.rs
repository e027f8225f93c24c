//! Attribute paths for pointing diagnostics at configuration data.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single step in an [`AttributePath`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStep {
    /// Step into a named attribute or block of an object.
    AttributeName(String),
    /// Step into an element of a list or set by position.
    ElementIndex(usize),
    /// Step into an element of a map by key.
    ElementKey(String),
}

/// A path through schema-shaped data, from the root to one attribute,
/// block, or element.
///
/// Paths render dotted, the way practitioners read them in diagnostics:
/// `network.0.subnet.0.cidr` or `labels.env`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributePath {
    steps: Vec<PathStep>,
}

impl AttributePath {
    /// The empty path, pointing at the root of the data.
    pub fn root() -> Self {
        Self::default()
    }

    /// A path consisting of a single attribute name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            steps: vec![PathStep::AttributeName(name.into())],
        }
    }

    /// Extend the path with an attribute name step.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.steps.push(PathStep::AttributeName(name.into()));
        self
    }

    /// Extend the path with a list or set element index step.
    pub fn index(mut self, index: usize) -> Self {
        self.steps.push(PathStep::ElementIndex(index));
        self
    }

    /// Extend the path with a map element key step.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.steps.push(PathStep::ElementKey(key.into()));
        self
    }

    /// The steps of this path, in order from the root.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Whether this path points at the root.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            match step {
                PathStep::AttributeName(name) => write!(f, "{name}")?,
                PathStep::ElementIndex(index) => write!(f, "{index}")?,
                PathStep::ElementKey(key) => write!(f, "{key}")?,
            }
        }
        Ok(())
    }
}
