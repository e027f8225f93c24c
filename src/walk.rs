//! Shared schema/value tree traversal.
//!
//! Validation, semantic equality, and write-only nullification all need the
//! same walk: iterate a value object against the block that declares it,
//! hand attributes to a visitor, and recurse through nested blocks according
//! to their nesting mode. The walk lives here once; the three transforms
//! supply visitors.

use std::collections::BTreeMap;

use crate::path::AttributePath;
use crate::schema::{Attribute, Block, BlockNestingMode, NestedBlock, Schema};
use crate::value::{KnownValue, Value, ValueKind};

/// Visitor invoked at each schema-declared node during a walk.
///
/// The walk is data-driven: null and unknown values are not traversed, and
/// value fields the schema does not declare pass through untouched. Walks
/// may carry a second, prior value alongside the primary one; prior fields
/// and elements are matched up with the primary value's by name, by position
/// for lists, and by structural equality for sets.
pub(crate) trait SchemaVisitor {
    /// Visit an attribute's value. The returned value replaces it in the
    /// rebuilt tree.
    fn visit_attribute(
        &mut self,
        path: &AttributePath,
        attribute: &Attribute,
        prior: Option<&Value>,
        value: &Value,
    ) -> Value;

    /// Visit a nested block's whole value before descending into it.
    fn visit_nested_block(
        &mut self,
        path: &AttributePath,
        nested: &NestedBlock,
        prior: Option<&Value>,
        value: &Value,
    ) {
        let _ = (path, nested, prior, value);
    }

    /// Visit an attribute the schema declares but the data does not contain.
    fn visit_missing_attribute(&mut self, path: &AttributePath, attribute: &Attribute) {
        let _ = (path, attribute);
    }

    /// Visit a nested block the schema declares but the data does not
    /// contain.
    fn visit_missing_block(&mut self, path: &AttributePath, nested: &NestedBlock) {
        let _ = (path, nested);
    }
}

/// Walk a value against a schema, returning the rebuilt value.
pub(crate) fn walk_schema<V: SchemaVisitor>(
    schema: &Schema,
    prior: Option<&Value>,
    value: &Value,
    visitor: &mut V,
) -> Value {
    walk_block(&schema.block, &AttributePath::root(), prior, value, visitor)
}

fn walk_block<V: SchemaVisitor>(
    block: &Block,
    path: &AttributePath,
    prior: Option<&Value>,
    value: &Value,
    visitor: &mut V,
) -> Value {
    let Some(fields) = value.as_entries() else {
        return value.clone();
    };
    let prior_fields = prior.and_then(Value::as_entries);

    let mut rebuilt = BTreeMap::new();
    for (name, field) in fields {
        let field_path = path.clone().attribute(name);
        let prior_field = prior_fields.and_then(|prior_fields| prior_fields.get(name));

        let new_field = if let Some(attribute) = block.attributes.get(name) {
            visitor.visit_attribute(&field_path, attribute, prior_field, field)
        } else if let Some(nested) = block.blocks.get(name) {
            visitor.visit_nested_block(&field_path, nested, prior_field, field);
            walk_nested_block(nested, &field_path, prior_field, field, visitor)
        } else {
            field.clone()
        };
        rebuilt.insert(name.clone(), new_field);
    }

    for (name, attribute) in &block.attributes {
        if !fields.contains_key(name) {
            visitor.visit_missing_attribute(&path.clone().attribute(name), attribute);
        }
    }
    for (name, nested) in &block.blocks {
        if !fields.contains_key(name) {
            visitor.visit_missing_block(&path.clone().attribute(name), nested);
        }
    }

    Value::from_parts(
        value.value_type().clone(),
        ValueKind::Known(KnownValue::Object(rebuilt)),
    )
}

fn walk_nested_block<V: SchemaVisitor>(
    nested: &NestedBlock,
    path: &AttributePath,
    prior: Option<&Value>,
    value: &Value,
    visitor: &mut V,
) -> Value {
    match nested.nesting_mode {
        BlockNestingMode::Single => walk_block(&nested.block, path, prior, value, visitor),
        BlockNestingMode::List => {
            let Some(elements) = value.as_elements() else {
                return value.clone();
            };
            let prior_elements = prior.and_then(Value::as_elements);

            let rebuilt = elements
                .iter()
                .enumerate()
                .map(|(i, element)| {
                    let prior_element =
                        prior_elements.and_then(|prior_elements| prior_elements.get(i));
                    walk_block(
                        &nested.block,
                        &path.clone().index(i),
                        prior_element,
                        element,
                        visitor,
                    )
                })
                .collect();

            Value::from_parts(
                value.value_type().clone(),
                ValueKind::Known(KnownValue::List(rebuilt)),
            )
        }
        BlockNestingMode::Set => {
            let Some(elements) = value.as_elements() else {
                return value.clone();
            };

            // Sets have no stable ordering, so prior elements pair with
            // primary elements by structural equality; unpaired elements
            // walk without a prior side.
            let prior_elements = prior.and_then(Value::as_elements).unwrap_or(&[]);
            let mut paired = vec![false; prior_elements.len()];

            let rebuilt = elements
                .iter()
                .enumerate()
                .map(|(i, element)| {
                    let matched = prior_elements
                        .iter()
                        .enumerate()
                        .find(|(j, prior_element)| !paired[*j] && *prior_element == element)
                        .map(|(j, _)| j);
                    let prior_element = matched.map(|j| {
                        paired[j] = true;
                        &prior_elements[j]
                    });
                    walk_block(
                        &nested.block,
                        &path.clone().index(i),
                        prior_element,
                        element,
                        visitor,
                    )
                })
                .collect();

            Value::from_parts(
                value.value_type().clone(),
                ValueKind::Known(KnownValue::Set(rebuilt)),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttributeType;

    struct RecordingVisitor {
        visited: Vec<String>,
    }

    impl SchemaVisitor for RecordingVisitor {
        fn visit_attribute(
            &mut self,
            path: &AttributePath,
            _attribute: &Attribute,
            _prior: Option<&Value>,
            value: &Value,
        ) -> Value {
            self.visited.push(path.to_string());
            value.clone()
        }

        fn visit_missing_attribute(&mut self, path: &AttributePath, _attribute: &Attribute) {
            self.visited.push(format!("missing:{path}"));
        }
    }

    fn object(fields: Vec<(&str, Value)>) -> Value {
        Value::object(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }

    #[test]
    fn test_walk_visits_attributes_and_block_elements() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_block(
                "network",
                NestedBlock::list(
                    Block::new().with_attribute("cidr", Attribute::required_string()),
                ),
            );

        let element_type = schema.block.blocks["network"].block.object_type();
        let value = object(vec![
            ("name", Value::string("web")),
            (
                "network",
                Value::list(
                    element_type,
                    vec![
                        object(vec![("cidr", Value::string("10.0.0.0/16"))]),
                        object(vec![("cidr", Value::string("10.1.0.0/16"))]),
                    ],
                ),
            ),
        ]);

        let mut visitor = RecordingVisitor {
            visited: Vec::new(),
        };
        let rebuilt = walk_schema(&schema, None, &value, &mut visitor);

        assert_eq!(
            visitor.visited,
            vec!["name", "network.0.cidr", "network.1.cidr"]
        );
        assert_eq!(rebuilt, value);
    }

    #[test]
    fn test_walk_skips_null_and_unknown_data() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let mut visitor = RecordingVisitor {
            visited: Vec::new(),
        };
        let null = Value::null(schema.object_type());
        assert_eq!(walk_schema(&schema, None, &null, &mut visitor), null);

        let unknown = Value::unknown(schema.object_type());
        assert_eq!(walk_schema(&schema, None, &unknown, &mut visitor), unknown);

        assert!(visitor.visited.is_empty());
    }

    #[test]
    fn test_walk_reports_missing_declared_attributes() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("zone", Attribute::optional_string());

        let value = object(vec![("name", Value::string("web"))]);

        let mut visitor = RecordingVisitor {
            visited: Vec::new(),
        };
        walk_schema(&schema, None, &value, &mut visitor);

        assert_eq!(visitor.visited, vec!["name", "missing:zone"]);
    }

    #[test]
    fn test_walk_passes_undeclared_fields_through() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let value = object(vec![
            ("name", Value::string("web")),
            ("unexpected", Value::int64(1)),
        ]);

        let mut visitor = RecordingVisitor {
            visited: Vec::new(),
        };
        let rebuilt = walk_schema(&schema, None, &value, &mut visitor);

        assert_eq!(visitor.visited, vec!["name"]);
        assert_eq!(rebuilt.as_entries().unwrap()["unexpected"], Value::int64(1));
    }

    struct PriorProbe {
        priors: Vec<Option<Value>>,
    }

    impl SchemaVisitor for PriorProbe {
        fn visit_attribute(
            &mut self,
            _path: &AttributePath,
            _attribute: &Attribute,
            prior: Option<&Value>,
            value: &Value,
        ) -> Value {
            self.priors.push(prior.cloned());
            value.clone()
        }
    }

    #[test]
    fn test_walk_pairs_set_elements_by_equality() {
        let schema = Schema::v0().with_block(
            "endpoint",
            NestedBlock::set(Block::new().with_attribute("host", Attribute::required_string())),
        );

        let element_type = schema.block.blocks["endpoint"].block.object_type();
        let first = object(vec![("host", Value::string("a.example.com"))]);
        let second = object(vec![("host", Value::string("b.example.com"))]);

        let prior = object(vec![(
            "endpoint",
            Value::set(element_type.clone(), vec![first.clone()]),
        )]);
        // The paired element sits at a different position in the new value.
        let value = object(vec![(
            "endpoint",
            Value::set(element_type, vec![second, first.clone()]),
        )]);

        let mut visitor = PriorProbe { priors: Vec::new() };
        walk_schema(&schema, Some(&prior), &value, &mut visitor);

        assert_eq!(
            visitor.priors,
            vec![None, Some(Value::string("a.example.com"))]
        );
    }
}
