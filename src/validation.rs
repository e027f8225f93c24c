//! Schema validation.
//!
//! This module checks configuration data against a [`Schema`] and checks
//! schema definitions themselves for provider implementation mistakes. Every
//! problem is reported as a diagnostic; nothing here returns an error.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_framework::schema::{Attribute, Schema};
//! use hemmer_provider_framework::validation::validate;
//! use hemmer_provider_framework::value::Value;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("count", Attribute::optional_int64());
//!
//! let config = Value::from_json(
//!     &schema.object_type(),
//!     &json!({"name": "test", "count": 42}),
//! )
//! .unwrap();
//! assert!(validate(&schema, &config).is_empty());
//!
//! // A required attribute left null is reported.
//! let config = Value::from_json(&schema.object_type(), &json!({"count": 42})).unwrap();
//! let diagnostics = validate(&schema, &config);
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(
//!     diagnostics[0].summary,
//!     "Missing Configuration for Required Attribute"
//! );
//! ```

use async_trait::async_trait;

use crate::diagnostics::{Diagnostic, Diagnostics, PROVIDER_ISSUE};
use crate::path::AttributePath;
use crate::schema::{Attribute, Block, BlockNestingMode, NestedBlock, Schema};
use crate::value::{AttributeType, KnownValue, Value};
use crate::walk::{self, SchemaVisitor};

/// Validate configuration data against a schema.
///
/// Returns diagnostics for every problem found; an empty collection means
/// the configuration is valid.
///
/// # Validation Rules
///
/// - Required attributes must not be null
/// - Configuration must not set a value for computed-only attributes
/// - Known values must conform to the declared attribute type
/// - Deprecated schemas warn once; deprecated attributes and blocks warn
///   when the configuration carries data for them
/// - Nested blocks are validated recursively with min/max item constraints
///
/// Unknown values pass content checks, since the host has not decided them
/// yet.
pub fn validate(schema: &Schema, config: &Value) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    if let Some(message) = &schema.deprecation_message {
        diagnostics.add_warning("Schema Deprecated", message.clone());
    }

    let _ = walk::walk_schema(
        schema,
        None,
        config,
        &mut ValidationVisitor {
            diagnostics: &mut diagnostics,
        },
    );
    diagnostics
}

/// Check a schema definition for provider implementation mistakes.
///
/// The registry runs this once per schema when the host fetches all schemas,
/// so a provider with an impossible attribute flag combination fails loudly
/// instead of producing a type nothing can configure.
pub fn validate_definitions(schema: &Schema) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    block_definitions(&AttributePath::root(), &schema.block, &mut diagnostics);
    diagnostics
}

fn block_definitions(path: &AttributePath, block: &Block, diagnostics: &mut Diagnostics) {
    for (name, attribute) in &block.attributes {
        attribute_definition(&path.clone().attribute(name), attribute, diagnostics);
    }
    for (name, nested) in &block.blocks {
        block_definitions(&path.clone().attribute(name), &nested.block, diagnostics);
    }
}

fn attribute_definition(path: &AttributePath, attribute: &Attribute, diagnostics: &mut Diagnostics) {
    let flags = &attribute.flags;

    if flags.required && flags.optional {
        diagnostics.add_attribute_error(
            path.clone(),
            "Invalid Attribute Definition",
            format!(
                "Attribute \"{path}\" cannot be both required and optional. {PROVIDER_ISSUE}"
            ),
        );
    } else if !flags.required && !flags.optional && !flags.computed {
        diagnostics.add_attribute_error(
            path.clone(),
            "Invalid Attribute Definition",
            format!(
                "Attribute \"{path}\" must be required, optional, or computed. {PROVIDER_ISSUE}"
            ),
        );
    }

    if flags.write_only && flags.computed {
        diagnostics.add_attribute_error(
            path.clone(),
            "Invalid Attribute Definition",
            format!(
                "Attribute \"{path}\" cannot be both write-only and computed. {PROVIDER_ISSUE}"
            ),
        );
    }
}

struct ValidationVisitor<'a> {
    diagnostics: &'a mut Diagnostics,
}

impl ValidationVisitor<'_> {
    fn missing_required(&mut self, path: &AttributePath) {
        self.diagnostics.add_attribute_error(
            path.clone(),
            "Missing Configuration for Required Attribute",
            format!(
                "Must set a configuration value for the {path} attribute as the provider has \
                 marked it as required."
            ),
        );
    }

    fn check_items(&mut self, path: &AttributePath, nested: &NestedBlock, len: u32) {
        if len < nested.min_items {
            self.diagnostics.push(
                Diagnostic::error(format!(
                    "Block '{}' requires at least {} item(s), got {}",
                    path, nested.min_items, len
                ))
                .with_attribute(path.clone()),
            );
        }
        if nested.max_items > 0 && len > nested.max_items {
            self.diagnostics.push(
                Diagnostic::error(format!(
                    "Block '{}' allows at most {} item(s), got {}",
                    path, nested.max_items, len
                ))
                .with_attribute(path.clone()),
            );
        }
    }

    fn absent_block(&mut self, path: &AttributePath, nested: &NestedBlock) {
        if nested.min_items == 0 {
            return;
        }
        match nested.nesting_mode {
            BlockNestingMode::Single => {
                self.diagnostics.push(
                    Diagnostic::error(format!("Missing required block '{path}'"))
                        .with_detail("At least one block is required")
                        .with_attribute(path.clone()),
                );
            }
            BlockNestingMode::List | BlockNestingMode::Set => {
                self.diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

impl SchemaVisitor for ValidationVisitor<'_> {
    fn visit_attribute(
        &mut self,
        path: &AttributePath,
        attribute: &Attribute,
        _prior: Option<&Value>,
        value: &Value,
    ) -> Value {
        let flags = &attribute.flags;

        if flags.required && value.is_null() {
            self.missing_required(path);
        }

        let computed_only = flags.computed && !flags.required && !flags.optional;
        if computed_only && !value.is_null() {
            self.diagnostics.add_attribute_error(
                path.clone(),
                "Invalid Configuration for Read-Only Attribute",
                "Cannot set a configuration value for this attribute as the provider has marked \
                 it as read-only. Remove the configuration line setting the value.",
            );
        }

        if value.is_known() && !value.is_null() {
            check_type(path, &attribute.attr_type, value, self.diagnostics);

            if let Some(message) = &attribute.deprecation_message {
                self.diagnostics.add_attribute_warning(
                    path.clone(),
                    "Attribute Deprecated",
                    message.clone(),
                );
            }
        }

        value.clone()
    }

    fn visit_nested_block(
        &mut self,
        path: &AttributePath,
        nested: &NestedBlock,
        _prior: Option<&Value>,
        value: &Value,
    ) {
        if value.is_known() && !value.is_null() {
            if let Some(message) = &nested.deprecation_message {
                self.diagnostics.add_attribute_warning(
                    path.clone(),
                    "Block Deprecated",
                    message.clone(),
                );
            }
        }

        if value.is_null() {
            self.absent_block(path, nested);
            return;
        }

        match nested.nesting_mode {
            BlockNestingMode::Single => {}
            BlockNestingMode::List | BlockNestingMode::Set => {
                if let Some(elements) = value.as_elements() {
                    self.check_items(path, nested, elements.len() as u32);
                }
            }
        }
    }

    fn visit_missing_attribute(&mut self, path: &AttributePath, attribute: &Attribute) {
        if attribute.flags.required {
            self.missing_required(path);
        }
    }

    fn visit_missing_block(&mut self, path: &AttributePath, nested: &NestedBlock) {
        self.absent_block(path, nested);
    }
}

fn check_type(
    path: &AttributePath,
    declared: &AttributeType,
    value: &Value,
    diagnostics: &mut Diagnostics,
) {
    if matches!(declared, AttributeType::Dynamic) {
        return;
    }
    let Some(known) = value.as_known() else {
        return;
    };

    match (declared, known) {
        (AttributeType::String, KnownValue::String(_))
        | (AttributeType::Int64, KnownValue::Int64(_))
        | (AttributeType::Float64, KnownValue::Float64(_))
        | (AttributeType::Bool, KnownValue::Bool(_)) => {}
        (AttributeType::List(element_type), KnownValue::List(elements))
        | (AttributeType::Set(element_type), KnownValue::Set(elements)) => {
            for (i, element) in elements.iter().enumerate() {
                check_type(&path.clone().index(i), element_type, element, diagnostics);
            }
        }
        (AttributeType::Map(value_type), KnownValue::Map(entries)) => {
            for (key, entry) in entries {
                check_type(&path.clone().key(key), value_type, entry, diagnostics);
            }
        }
        (AttributeType::Object(field_types), KnownValue::Object(fields)) => {
            for (name, field_type) in field_types {
                if let Some(field) = fields.get(name) {
                    check_type(&path.clone().attribute(name), field_type, field, diagnostics);
                }
            }
        }
        _ => {
            diagnostics.push(
                Diagnostic::error(format!("Invalid type for attribute '{path}'"))
                    .with_detail(format!(
                        "Expected {}, got {}",
                        declared.type_label(),
                        known.type_label()
                    ))
                    .with_attribute(path.clone()),
            );
        }
    }
}

/// Request passed to a provider-declared whole-configuration validator.
#[derive(Debug, Clone)]
pub struct ValidateConfigRequest {
    /// The configuration data the host supplied.
    pub config: Value,
}

/// Response mutated by a whole-configuration validator.
#[derive(Debug, Default)]
pub struct ValidateConfigResponse {
    /// Diagnostics reported by the validator.
    pub diagnostics: Diagnostics,
}

/// A provider-declared validator that inspects a whole configuration.
///
/// Config validators run after schema validation, in declaration order.
/// Each validator receives a fresh response; its diagnostics are appended to
/// the operation's accumulated set, so one validator can never erase
/// another's findings.
#[async_trait]
pub trait ConfigValidator: Send + Sync {
    /// Validate the configuration, reporting problems into the response.
    async fn validate(&self, request: &ValidateConfigRequest, response: &mut ValidateConfigResponse);
}

/// Run config validators against a configuration, appending their
/// diagnostics in invocation order.
pub(crate) async fn run_config_validators(
    config: &Value,
    validators: &[std::sync::Arc<dyn ConfigValidator>],
    diagnostics: &mut Diagnostics,
) {
    for validator in validators {
        let request = ValidateConfigRequest {
            config: config.clone(),
        };
        let mut response = ValidateConfigResponse::default();
        validator.validate(&request, &mut response).await;
        diagnostics.append(&mut response.diagnostics);
    }
}
