//! Nullification of write-only attribute values.
//!
//! Write-only attributes accept data on the way in but are never persisted.
//! Before state is returned to the host, every write-only attribute value is
//! replaced with null so secrets cannot leak into stored state. The host
//! independently verifies this, so the framework applies the transform to
//! all outgoing state rather than trusting providers to remember.

use crate::path::AttributePath;
use crate::schema::{Attribute, Schema};
use crate::value::{AttributeType, Value};
use crate::walk::{self, SchemaVisitor};

/// Replace every write-only attribute value in `value` with null.
///
/// Non-null and unknown values of write-only attributes become null of the
/// value's own type, except under a dynamic declaration where the null is
/// dynamically typed. Null values under a dynamic declaration are also
/// renormalized to a dynamic null, matching how the host encodes them.
/// Block values are never nullified themselves, but write-only attributes
/// nested inside them are. Everything else passes through untouched.
pub fn nullify_write_only(schema: &Schema, value: &Value) -> Value {
    walk::walk_schema(schema, None, value, &mut NullifyVisitor)
}

struct NullifyVisitor;

impl SchemaVisitor for NullifyVisitor {
    fn visit_attribute(
        &mut self,
        _path: &AttributePath,
        attribute: &Attribute,
        _prior: Option<&Value>,
        value: &Value,
    ) -> Value {
        let dynamic = matches!(attribute.attr_type, AttributeType::Dynamic);

        if attribute.flags.write_only && !value.is_null() {
            if dynamic {
                return Value::null(AttributeType::Dynamic);
            }
            return Value::null(value.value_type().clone());
        }

        // Hosts encode a null dynamic attribute without a concrete type, so
        // a null that arrived with one is renormalized before being sent
        // back.
        if dynamic && value.is_null() {
            return Value::null(AttributeType::Dynamic);
        }

        value.clone()
    }
}
