//! Semantic equality between prior data and provider-returned data.
//!
//! After create, read, and update operations the framework compares the data
//! the provider returned against the data it was given. Attributes may carry
//! a [`SemanticEquals`] hook that declares two representations
//! interchangeable (for example JSON strings with different whitespace).
//! When a hook reports equality, the prior representation is preserved so
//! the host does not see spurious drift.

use std::fmt;
use std::sync::Arc;

use crate::diagnostics::Diagnostics;
use crate::path::AttributePath;
use crate::schema::{Attribute, Schema};
use crate::value::Value;
use crate::walk::{self, SchemaVisitor};

/// Signature of a semantic equality hook.
///
/// Receives the prior value, the proposed new value, and a diagnostics
/// collection to report problems into. Returns whether the two values are
/// semantically the same.
pub type SemanticEqualsFn = dyn Fn(&Value, &Value, &mut Diagnostics) -> bool + Send + Sync;

/// A provider-defined semantic equality hook, attached to an attribute via
/// [`Attribute::with_semantic_equals`].
///
/// Hooks only run when both the prior and proposed values are known and
/// non-null.
#[derive(Clone)]
pub struct SemanticEquals(Arc<SemanticEqualsFn>);

impl SemanticEquals {
    /// Wrap a comparison function as a semantic equality hook.
    pub fn new(
        func: impl Fn(&Value, &Value, &mut Diagnostics) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(func))
    }

    /// Run the hook against a prior and proposed value.
    pub fn check(&self, prior: &Value, proposed: &Value, diagnostics: &mut Diagnostics) -> bool {
        (self.0)(prior, proposed, diagnostics)
    }
}

impl fmt::Debug for SemanticEquals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SemanticEquals")
    }
}

impl PartialEq for SemanticEquals {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Walk a schema's data and apply semantic equality hooks, returning the
/// reconciled data.
///
/// Wherever a hook reports that the proposed value is semantically equal to
/// the prior one, the prior value is kept; everywhere else the proposed
/// value passes through unchanged. Data without any hook-bearing attributes
/// is returned exactly as proposed. Nested blocks are compared element-wise:
/// lists by position, sets by pairing structurally equal elements first.
pub fn apply_semantic_equality(
    schema: &Schema,
    prior: &Value,
    proposed: &Value,
) -> (Value, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let value = walk::walk_schema(
        schema,
        Some(prior),
        proposed,
        &mut EqualityVisitor {
            diagnostics: &mut diagnostics,
        },
    );
    (value, diagnostics)
}

struct EqualityVisitor<'a> {
    diagnostics: &'a mut Diagnostics,
}

impl SchemaVisitor for EqualityVisitor<'_> {
    fn visit_attribute(
        &mut self,
        _path: &AttributePath,
        attribute: &Attribute,
        prior: Option<&Value>,
        proposed: &Value,
    ) -> Value {
        let Some(hook) = &attribute.semantic_equals else {
            return proposed.clone();
        };
        let Some(prior) = prior else {
            return proposed.clone();
        };

        // Hooks never see null or unknown data.
        if !prior.is_known() || !proposed.is_known() || prior.is_null() || proposed.is_null() {
            return proposed.clone();
        }

        let mut hook_diagnostics = Diagnostics::new();
        let equal = hook.check(prior, proposed, &mut hook_diagnostics);
        let failed = hook_diagnostics.has_error();
        self.diagnostics.append(&mut hook_diagnostics);

        if failed || !equal {
            return proposed.clone();
        }
        prior.clone()
    }
}
