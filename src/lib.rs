//! Hemmer Provider Framework
//!
//! This crate provides the provider-side dispatch engine for Hemmer
//! providers. It follows the pattern established by
//! [terraform-plugin-framework](https://github.com/hashicorp/terraform-plugin-framework):
//! provider developers implement a set of traits, and the framework turns
//! host requests into calls on those implementations, enforcing the
//! framework rules along the way.
//!
//! # Overview
//!
//! The framework provides:
//!
//! - **Provider traits**: [`Provider`], [`resource::Resource`],
//!   [`datasource::DataSource`], [`ephemeral::EphemeralResource`],
//!   [`list::ListResource`], and [`statestore::StateStore`]
//! - **Dynamic values**: schema-typed [`Value`] data with null and unknown
//!   tracking at every nesting level
//! - **Schema types**: Types for describing provider, resource, and data
//!   source schemas, including identity schemas
//! - **Dispatch server**: [`Server`] routes host requests to registered
//!   implementations and applies validation, write-only nullification,
//!   identity checks, and private state round-tripping
//! - **Diagnostics**: [`Diagnostic`] values that accumulate instead of
//!   aborting, so one response can carry several problems
//! - **Logging**: Integration with `tracing` for structured logging
//! - **Testing**: A [`testing::ServerTester`] harness that drives the
//!   server from plain JSON
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use hemmer_provider_framework::provider::{
//!     ConfigureProviderRequest, ConfigureProviderResponse, ProviderMetadataResponse,
//! };
//! use hemmer_provider_framework::resource::{
//!     CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest,
//!     ReadResponse, Resource, ResourceConstructor, ResourceMetadataRequest,
//!     ResourceMetadataResponse, UpdateRequest, UpdateResponse,
//! };
//! use hemmer_provider_framework::{async_trait, Attribute, Provider, Schema, Server, Value};
//!
//! struct ExampleProvider;
//!
//! #[async_trait]
//! impl Provider for ExampleProvider {
//!     fn metadata(&self) -> ProviderMetadataResponse {
//!         ProviderMetadataResponse {
//!             type_name: "examplecloud".to_string(),
//!         }
//!     }
//!
//!     fn schema(&self) -> Schema {
//!         Schema::v0().with_attribute("endpoint", Attribute::optional_string())
//!     }
//!
//!     fn resources(&self) -> Vec<ResourceConstructor> {
//!         vec![Arc::new(|| Box::new(ServerResource))]
//!     }
//!
//!     async fn configure(
//!         &self,
//!         _request: ConfigureProviderRequest,
//!         _response: &mut ConfigureProviderResponse,
//!     ) {
//!     }
//! }
//!
//! struct ServerResource;
//!
//! #[async_trait]
//! impl Resource for ServerResource {
//!     fn metadata(&self, request: &ResourceMetadataRequest) -> ResourceMetadataResponse {
//!         ResourceMetadataResponse {
//!             type_name: format!("{}_server", request.provider_type_name),
//!             ..Default::default()
//!         }
//!     }
//!
//!     fn schema(&self) -> Schema {
//!         Schema::v0()
//!             .with_attribute("name", Attribute::required_string())
//!             .with_attribute("id", Attribute::computed_string())
//!     }
//!
//!     async fn create(&self, request: CreateRequest, response: &mut CreateResponse) {
//!         let mut entries = request.planned_state.as_entries().cloned().unwrap_or_default();
//!         entries.insert("id".to_string(), Value::string("srv-1"));
//!         response.state = Value::object(entries);
//!     }
//!
//!     async fn read(&self, _request: ReadRequest, _response: &mut ReadResponse) {}
//!
//!     async fn update(&self, request: UpdateRequest, response: &mut UpdateResponse) {
//!         response.state = request.planned_state;
//!     }
//!
//!     async fn delete(&self, _request: DeleteRequest, _response: &mut DeleteResponse) {}
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     hemmer_provider_framework::init_logging();
//!
//!     let server = Server::new(Arc::new(ExampleProvider));
//!     // Wire the server's operations to the host transport of your choice.
//! }
//! ```
//!
//! # Dispatch Operations
//!
//! [`Server`] exposes one method per host operation:
//!
//! - **ValidateProviderConfig / ConfigureProvider**: Validate and apply
//!   provider configuration; configured data is injected into later
//!   object instances
//! - **ValidateResourceConfig**: Validates a resource configuration
//! - **CreateResource / ReadResource / UpdateResource / DeleteResource**:
//!   CRUD operations for managed resources
//! - **ImportResourceState**: Imports existing infrastructure
//! - **MoveResourceState**: Moves state from another resource type
//! - **ValidateDataSourceConfig / ReadDataSource**: Data source operations
//! - **ValidateEphemeralResourceConfig / OpenEphemeralResource /
//!   CloseEphemeralResource**: Ephemeral resource operations
//! - **ValidateListResourceConfig / ListResource**: Streaming enumeration
//!   of existing instances
//!
//! Schemas are served through the server's accessor methods, for example
//! [`Server::resource_schemas`], which cache per type name.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod datasource;
pub mod diagnostics;
pub mod ephemeral;
pub mod error;
pub mod list;
pub mod logging;
pub mod nullify;
pub mod path;
pub mod private;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod semantic;
pub mod server;
pub mod statestore;
pub mod testing;
pub mod types;
pub mod validation;
pub mod value;

mod walk;

// Re-export main types at crate root
pub use diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics};
pub use error::FrameworkError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use path::AttributePath;
pub use provider::Provider;
pub use schema::{Attribute, Schema};
pub use server::Server;
pub use types::{ClientCapabilities, Deferred, DeferredReason};
pub use value::{AttributeType, Value};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
