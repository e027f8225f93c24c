//! Testing utilities for provider implementations.
//!
//! This module provides utilities to exercise a [`Provider`] through the
//! dispatch [`Server`] without a host process. Requests and responses are
//! plain JSON, converted against the declared schemas, and error diagnostics
//! become `Err` values so tests read linearly.
//!
//! # Example
//!
//! ```ignore
//! use hemmer_provider_framework::testing::ServerTester;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_widget() {
//!     let tester = ServerTester::new(MyProvider::new());
//!
//!     tester.configure(json!({"api_key": "test"})).await.unwrap();
//!
//!     let state = tester
//!         .create("examplecloud_widget", json!({"name": "test-widget"}))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["name"], json!("test-widget"));
//! }
//! ```

use std::sync::Arc;

use tokio_stream::StreamExt;

use crate::diagnostics::{DiagnosticSeverity, Diagnostics};
use crate::error::FrameworkError;
use crate::list::ListResult;
use crate::provider::Provider;
use crate::schema::Schema;
use crate::server::{
    ConfigureProviderRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ListResourceRequest, OpenEphemeralResourceRequest,
    ReadDataSourceRequest, ReadResourceRequest, Server, UpdateResourceRequest,
    ValidateDataSourceConfigRequest, ValidateEphemeralResourceConfigRequest,
    ValidateListResourceConfigRequest, ValidateProviderConfigRequest,
    ValidateResourceConfigRequest,
};
use crate::value::Value;

/// A test harness for provider implementations.
///
/// The harness drives the same dispatch [`Server`] a host would, so every
/// framework rule applies: schemas shape the requests, write-only attributes
/// come back nulled, and identity checks fire. State and configuration travel
/// as plain JSON; a null JSON state means the object does not exist.
///
/// For operations the harness does not wrap, such as moving state between
/// resource types, call the server directly through [`ServerTester::server`].
pub struct ServerTester {
    server: Server,
}

impl ServerTester {
    /// Create a tester for the given provider.
    pub fn new(provider: impl Provider + 'static) -> Self {
        Self {
            server: Server::new(Arc::new(provider)),
        }
    }

    /// The dispatch server the harness drives.
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// The provider's declared type name.
    pub fn provider_type_name(&self) -> String {
        self.server.provider_type_name()
    }

    // =========================================================================
    // Provider lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Ok(())` when no error diagnostics were reported.
    pub async fn validate_provider_config(
        &self,
        config: serde_json::Value,
    ) -> Result<(), TestError> {
        let schema = self.server.provider_schema();
        let response = self
            .server
            .validate_provider_config(Some(ValidateProviderConfigRequest {
                config: Some(typed(&schema, &config)?),
            }))
            .await;
        check_diagnostics(response.diagnostics)
    }

    /// Configure the provider.
    pub async fn configure(&self, config: serde_json::Value) -> Result<(), TestError> {
        let schema = self.server.provider_schema();
        let response = self
            .server
            .configure_provider(Some(ConfigureProviderRequest {
                config: Some(typed(&schema, &config)?),
                ..Default::default()
            }))
            .await;
        check_diagnostics(response.diagnostics)
    }

    // =========================================================================
    // Resource operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        type_name: &str,
        config: serde_json::Value,
    ) -> Result<(), TestError> {
        let schema = self.resource_schema(type_name).await?;
        let response = self
            .server
            .validate_resource_config(Some(ValidateResourceConfigRequest {
                type_name: type_name.to_string(),
                config: Some(typed(&schema, &config)?),
            }))
            .await;
        check_diagnostics(response.diagnostics)
    }

    /// Create a new object. The planned state doubles as the configuration.
    ///
    /// Returns the state the host would persist.
    pub async fn create(
        &self,
        type_name: &str,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, TestError> {
        let schema = self.resource_schema(type_name).await?;
        let planned = typed(&schema, &planned_state)?;
        let response = self
            .server
            .create_resource(Some(CreateResourceRequest {
                type_name: type_name.to_string(),
                config: Some(planned.clone()),
                planned_state: Some(planned),
                ..Default::default()
            }))
            .await;
        if response.diagnostics.has_error() {
            return Err(TestError::Diagnostics(response.diagnostics));
        }
        state_json(response.new_state)
    }

    /// Refresh the state of an existing object.
    ///
    /// Returns the refreshed state; a null value means the object no longer
    /// exists.
    pub async fn read(
        &self,
        type_name: &str,
        current_state: serde_json::Value,
    ) -> Result<serde_json::Value, TestError> {
        let schema = self.resource_schema(type_name).await?;
        let response = self
            .server
            .read_resource(Some(ReadResourceRequest {
                type_name: type_name.to_string(),
                current_state: Some(typed(&schema, &current_state)?),
                ..Default::default()
            }))
            .await;
        if response.diagnostics.has_error() {
            return Err(TestError::Diagnostics(response.diagnostics));
        }
        state_json(response.new_state)
    }

    /// Update an existing object. The planned state doubles as the
    /// configuration.
    ///
    /// Returns the state the host would persist.
    pub async fn update(
        &self,
        type_name: &str,
        prior_state: serde_json::Value,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, TestError> {
        let schema = self.resource_schema(type_name).await?;
        let planned = typed(&schema, &planned_state)?;
        let response = self
            .server
            .update_resource(Some(UpdateResourceRequest {
                type_name: type_name.to_string(),
                config: Some(planned.clone()),
                planned_state: Some(planned),
                prior_state: Some(typed(&schema, &prior_state)?),
                ..Default::default()
            }))
            .await;
        if response.diagnostics.has_error() {
            return Err(TestError::Diagnostics(response.diagnostics));
        }
        state_json(response.new_state)
    }

    /// Delete an existing object.
    pub async fn delete(
        &self,
        type_name: &str,
        prior_state: serde_json::Value,
    ) -> Result<(), TestError> {
        let schema = self.resource_schema(type_name).await?;
        let response = self
            .server
            .delete_resource(Some(DeleteResourceRequest {
                type_name: type_name.to_string(),
                prior_state: Some(typed(&schema, &prior_state)?),
                ..Default::default()
            }))
            .await;
        check_diagnostics(response.diagnostics)
    }

    /// Import existing infrastructure by identifier.
    ///
    /// Returns the imported state.
    pub async fn import(
        &self,
        type_name: &str,
        id: &str,
    ) -> Result<serde_json::Value, TestError> {
        let response = self
            .server
            .import_resource_state(Some(ImportResourceStateRequest {
                type_name: type_name.to_string(),
                id: id.to_string(),
                ..Default::default()
            }))
            .await;
        if response.diagnostics.has_error() {
            return Err(TestError::Diagnostics(response.diagnostics));
        }
        state_json(response.state)
    }

    // =========================================================================
    // Data source operations
    // =========================================================================

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(
        &self,
        type_name: &str,
        config: serde_json::Value,
    ) -> Result<(), TestError> {
        let schema = self.data_source_schema(type_name).await?;
        let response = self
            .server
            .validate_data_source_config(Some(ValidateDataSourceConfigRequest {
                type_name: type_name.to_string(),
                config: Some(typed(&schema, &config)?),
            }))
            .await;
        check_diagnostics(response.diagnostics)
    }

    /// Read a data source.
    ///
    /// Returns the data the host would use.
    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: serde_json::Value,
    ) -> Result<serde_json::Value, TestError> {
        let schema = self.data_source_schema(type_name).await?;
        let response = self
            .server
            .read_data_source(Some(ReadDataSourceRequest {
                type_name: type_name.to_string(),
                config: Some(typed(&schema, &config)?),
                ..Default::default()
            }))
            .await;
        if response.diagnostics.has_error() {
            return Err(TestError::Diagnostics(response.diagnostics));
        }
        state_json(response.state)
    }

    // =========================================================================
    // Ephemeral and list operations
    // =========================================================================

    /// Validate an ephemeral resource configuration.
    pub async fn validate_ephemeral_resource_config(
        &self,
        type_name: &str,
        config: serde_json::Value,
    ) -> Result<(), TestError> {
        let schema = self.ephemeral_resource_schema(type_name).await?;
        let response = self
            .server
            .validate_ephemeral_resource_config(Some(ValidateEphemeralResourceConfigRequest {
                type_name: type_name.to_string(),
                config: Some(typed(&schema, &config)?),
            }))
            .await;
        check_diagnostics(response.diagnostics)
    }

    /// Open an ephemeral resource handle.
    ///
    /// Returns the produced value.
    pub async fn open_ephemeral_resource(
        &self,
        type_name: &str,
        config: serde_json::Value,
    ) -> Result<serde_json::Value, TestError> {
        let schema = self.ephemeral_resource_schema(type_name).await?;
        let response = self
            .server
            .open_ephemeral_resource(Some(OpenEphemeralResourceRequest {
                type_name: type_name.to_string(),
                config: Some(typed(&schema, &config)?),
                ..Default::default()
            }))
            .await;
        if response.diagnostics.has_error() {
            return Err(TestError::Diagnostics(response.diagnostics));
        }
        state_json(response.result)
    }

    /// Validate a list resource configuration.
    pub async fn validate_list_resource_config(
        &self,
        type_name: &str,
        config: serde_json::Value,
    ) -> Result<(), TestError> {
        let schema = self.list_resource_schema(type_name).await?;
        let response = self
            .server
            .validate_list_resource_config(Some(ValidateListResourceConfigRequest {
                type_name: type_name.to_string(),
                config: Some(typed(&schema, &config)?),
            }))
            .await;
        check_diagnostics(response.diagnostics)
    }

    /// Enumerate instances of a resource type, collecting the whole stream.
    pub async fn list(
        &self,
        type_name: &str,
        config: serde_json::Value,
        limit: i64,
    ) -> Result<Vec<ListResult>, TestError> {
        let schema = self.list_resource_schema(type_name).await?;
        let response = self
            .server
            .list_resource(Some(ListResourceRequest {
                type_name: type_name.to_string(),
                config: Some(typed(&schema, &config)?),
                limit,
                ..Default::default()
            }))
            .await;
        if response.diagnostics.has_error() {
            return Err(TestError::Diagnostics(response.diagnostics));
        }
        Ok(response.results.collect().await)
    }

    // =========================================================================
    // Lifecycle helpers
    // =========================================================================

    /// Run a create lifecycle: create, then read the result back.
    ///
    /// Returns the state after the read.
    pub async fn lifecycle_create(
        &self,
        type_name: &str,
        config: serde_json::Value,
    ) -> Result<serde_json::Value, TestError> {
        let created = self.create(type_name, config).await?;
        self.read(type_name, created).await
    }

    /// Run a full lifecycle: create, read, update, delete.
    ///
    /// Returns the state after the update, before the delete.
    pub async fn lifecycle_crud(
        &self,
        type_name: &str,
        initial_config: serde_json::Value,
        updated_config: serde_json::Value,
    ) -> Result<serde_json::Value, TestError> {
        let read_state = self.lifecycle_create(type_name, initial_config).await?;
        let updated = self.update(type_name, read_state, updated_config).await?;
        self.delete(type_name, updated.clone()).await?;
        Ok(updated)
    }

    // =========================================================================
    // Schema lookups
    // =========================================================================

    async fn resource_schema(&self, type_name: &str) -> Result<Schema, TestError> {
        let (schema, diagnostics) = self.server.resource_schema(type_name).await;
        schema.ok_or(TestError::Diagnostics(diagnostics))
    }

    async fn data_source_schema(&self, type_name: &str) -> Result<Schema, TestError> {
        let (schema, diagnostics) = self.server.data_source_schema(type_name).await;
        schema.ok_or(TestError::Diagnostics(diagnostics))
    }

    async fn ephemeral_resource_schema(&self, type_name: &str) -> Result<Schema, TestError> {
        let (schema, diagnostics) = self.server.ephemeral_resource_schema(type_name).await;
        schema.ok_or(TestError::Diagnostics(diagnostics))
    }

    async fn list_resource_schema(&self, type_name: &str) -> Result<Schema, TestError> {
        let (schema, diagnostics) = self.server.list_resource_schema(type_name).await;
        schema.ok_or(TestError::Diagnostics(diagnostics))
    }
}

fn typed(schema: &Schema, data: &serde_json::Value) -> Result<Value, TestError> {
    Ok(Value::from_json(&schema.object_type(), data)?)
}

fn state_json(state: Option<Value>) -> Result<serde_json::Value, TestError> {
    match state {
        Some(state) => Ok(state.to_json()?),
        None => Ok(serde_json::Value::Null),
    }
}

/// Error type for harness operations.
#[derive(Debug)]
pub enum TestError {
    /// The operation reported error diagnostics.
    Diagnostics(Diagnostics),
    /// A value could not be converted between JSON and its schema type.
    Framework(FrameworkError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diagnostics) => {
                writeln!(
                    f,
                    "Operation failed with {} diagnostic(s):",
                    diagnostics.len()
                )?;
                for diagnostic in diagnostics {
                    write!(f, "  [{:?}] {}", diagnostic.severity, diagnostic.summary)?;
                    if let Some(detail) = &diagnostic.detail {
                        write!(f, ": {detail}")?;
                    }
                    if let Some(attribute) = &diagnostic.attribute {
                        write!(f, " (at {attribute})")?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Framework(error) => write!(f, "Framework error: {error}"),
        }
    }
}

impl std::error::Error for TestError {}

impl From<FrameworkError> for TestError {
    fn from(error: FrameworkError) -> Self {
        TestError::Framework(error)
    }
}

fn check_diagnostics(diagnostics: Diagnostics) -> Result<(), TestError> {
    if diagnostics.has_error() {
        Err(TestError::Diagnostics(diagnostics))
    } else {
        Ok(())
    }
}

// =========================================================================
// Assertion helpers
// =========================================================================

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &Diagnostics) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.is_error())
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors
            .iter()
            .map(|diagnostic| &diagnostic.summary)
            .collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &Diagnostics) {
    let has_errors = diagnostics.iter().any(|diagnostic| diagnostic.is_error());

    assert!(has_errors, "Expected at least one error, but got none");
}

/// Assert that diagnostics contain an error whose summary contains the
/// given substring.
///
/// # Panics
///
/// Panics if no error diagnostic matches.
pub fn assert_error_contains(diagnostics: &Diagnostics, substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|diagnostic| diagnostic.is_error() && diagnostic.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.is_error())
            .map(|diagnostic| &diagnostic.summary)
            .collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain a warning whose summary contains the
/// given substring.
///
/// # Panics
///
/// Panics if no warning diagnostic matches.
pub fn assert_warning_contains(diagnostics: &Diagnostics, substring: &str) {
    let has_matching_warning = diagnostics.iter().any(|diagnostic| {
        diagnostic.severity == DiagnosticSeverity::Warning
            && diagnostic.summary.contains(substring)
    });

    assert!(
        has_matching_warning,
        "Expected a warning containing '{}', but no matching warning found. Warnings: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity == DiagnosticSeverity::Warning)
            .map(|diagnostic| &diagnostic.summary)
            .collect::<Vec<_>>()
    );
}
