//! The managed resource trait and its operation types.
//!
//! A managed resource is an object the provider creates, reads, updates,
//! and deletes on behalf of the host. Implementations declare a type name
//! through metadata, a [`Schema`] for their state, optionally an
//! [`IdentitySchema`] for a stable cross-operation identifier, and the
//! operation callbacks the dispatch layer invokes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::diagnostics::Diagnostics;
use crate::private::ProviderPrivateData;
use crate::provider::{ConfigureRequest, ConfigureResponse};
use crate::schema::{IdentitySchema, Schema};
use crate::types::{ClientCapabilities, Deferred, RawState};
use crate::validation::{ConfigValidator, ValidateConfigRequest, ValidateConfigResponse};
use crate::value::Value;

/// Constructs a fresh resource instance. The dispatch layer calls this once
/// per operation so no state leaks between calls.
pub type ResourceConstructor = Arc<dyn Fn() -> Box<dyn Resource> + Send + Sync>;

/// Optional hooks a resource declares beyond the core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceCapabilities {
    /// The resource wants provider data injected before operations run.
    pub configure: bool,
    /// The resource supports importing existing infrastructure.
    pub import: bool,
}

/// Behaviors that relax framework invariants for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceBehavior {
    /// The resource's identity may legitimately change between operations,
    /// so the framework does not raise "Unexpected Identity Change".
    pub mutable_identity: bool,
}

/// Request for a resource's metadata.
#[derive(Debug, Clone)]
pub struct ResourceMetadataRequest {
    /// The provider's type name, conventionally used as the prefix of the
    /// resource type name.
    pub provider_type_name: String,
}

/// A resource's declared metadata.
#[derive(Debug, Clone, Default)]
pub struct ResourceMetadataResponse {
    /// The resource type name, for example `examplecloud_server`.
    pub type_name: String,
    /// Behaviors the resource opts into.
    pub behavior: ResourceBehavior,
}

/// Request to create a new object.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    /// The configuration the user wrote.
    pub config: Value,
    /// The state the host plans to store, with unknown values where the
    /// provider must fill in results.
    pub planned_state: Value,
    /// The planned identity, when the resource declares an identity schema.
    pub identity: Option<Value>,
    /// Auxiliary provider-defined configuration, when the host sent one.
    pub provider_meta: Option<Value>,
    /// Provider-private state carried between operations.
    pub private: ProviderPrivateData,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Response from creating an object.
#[derive(Debug)]
pub struct CreateResponse {
    /// The state to persist. Starts null; the provider must populate it.
    pub state: Value,
    /// The identity to persist, when the resource declares one.
    pub identity: Option<Value>,
    /// Provider-private state to persist alongside.
    pub private: ProviderPrivateData,
    /// Diagnostics reported by the operation.
    pub diagnostics: Diagnostics,
}

/// Request to refresh an object's state.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    /// The most recently persisted state.
    pub current_state: Value,
    /// The most recently persisted identity, when the resource declares one.
    pub identity: Option<Value>,
    /// Auxiliary provider-defined configuration, when the host sent one.
    pub provider_meta: Option<Value>,
    /// Provider-private state carried between operations.
    pub private: ProviderPrivateData,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Response from refreshing an object's state.
#[derive(Debug)]
pub struct ReadResponse {
    /// The refreshed state. Starts as the current state; set it null when
    /// the object no longer exists.
    pub state: Value,
    /// The refreshed identity, when the resource declares one.
    pub identity: Option<Value>,
    /// Provider-private state to persist alongside.
    pub private: ProviderPrivateData,
    /// Set to defer this operation instead of completing it.
    pub deferred: Option<Deferred>,
    /// Diagnostics reported by the operation.
    pub diagnostics: Diagnostics,
}

/// Request to update an existing object.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    /// The configuration the user wrote.
    pub config: Value,
    /// The state the host plans to store after the update.
    pub planned_state: Value,
    /// The most recently persisted state.
    pub prior_state: Value,
    /// The planned identity, when the resource declares an identity schema.
    pub identity: Option<Value>,
    /// Auxiliary provider-defined configuration, when the host sent one.
    pub provider_meta: Option<Value>,
    /// Provider-private state carried between operations.
    pub private: ProviderPrivateData,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Response from updating an object.
#[derive(Debug)]
pub struct UpdateResponse {
    /// The state to persist. Starts as the planned state.
    pub state: Value,
    /// The identity to persist, when the resource declares one.
    pub identity: Option<Value>,
    /// Provider-private state to persist alongside.
    pub private: ProviderPrivateData,
    /// Diagnostics reported by the operation.
    pub diagnostics: Diagnostics,
}

/// Request to delete an object.
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    /// The most recently persisted state.
    pub state: Value,
    /// The most recently persisted identity, when the resource declares one.
    pub identity: Option<Value>,
    /// Auxiliary provider-defined configuration, when the host sent one.
    pub provider_meta: Option<Value>,
    /// Provider-private state carried between operations.
    pub private: ProviderPrivateData,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Response from deleting an object.
///
/// When the operation reports no errors the framework discards the returned
/// state and identity and persists null; leave them untouched on partial
/// failure so the host can keep tracking what remains.
#[derive(Debug)]
pub struct DeleteResponse {
    /// The remaining state. Starts as the current state.
    pub state: Value,
    /// The remaining identity, when the resource declares one.
    pub identity: Option<Value>,
    /// Provider-private state to persist alongside.
    pub private: ProviderPrivateData,
    /// Diagnostics reported by the operation.
    pub diagnostics: Diagnostics,
}

/// Request to import existing infrastructure into management.
#[derive(Debug, Clone)]
pub struct ImportStateRequest {
    /// The user-supplied import identifier.
    pub id: String,
    /// The user-supplied identity, when the host imports by identity.
    pub identity: Option<Value>,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Response from importing an object.
#[derive(Debug)]
pub struct ImportStateResponse {
    /// The imported state. Starts null; the provider must populate enough
    /// for a follow-up read to refresh the rest.
    pub state: Value,
    /// The imported identity, when the resource declares one.
    pub identity: Option<Value>,
    /// Provider-private state to persist alongside.
    pub private: ProviderPrivateData,
    /// Set to defer this operation instead of completing it.
    pub deferred: Option<Deferred>,
    /// Diagnostics reported by the operation.
    pub diagnostics: Diagnostics,
}

/// Request passed to a state mover.
#[derive(Debug, Clone)]
pub struct MoveStateRequest {
    /// The address of the provider the state is moving from, for example
    /// `registry.example.com/namespace/name`.
    pub source_provider_address: String,
    /// The resource type name the state is moving from.
    pub source_type_name: String,
    /// The schema version of the source state.
    pub source_schema_version: i64,
    /// The stored source state exactly as the host holds it.
    pub source_raw_state: RawState,
    /// The source state decoded against [`StateMover::source_schema`], when
    /// the mover declares one and the state decodes cleanly.
    pub source_state: Option<Value>,
    /// Provider-private state stored with the source.
    pub source_private: ProviderPrivateData,
}

/// Response from a state mover.
#[derive(Debug, Default)]
pub struct MoveStateResponse {
    /// The state for the target resource type. Leaving this null tells the
    /// dispatcher this mover does not handle the source.
    pub target_state: Option<Value>,
    /// Provider-private state to store with the target.
    pub target_private: ProviderPrivateData,
    /// Diagnostics reported by the mover.
    pub diagnostics: Diagnostics,
}

/// Moves state from another resource type into this resource's schema.
///
/// A resource declares movers through [`Resource::state_movers`]; the
/// dispatcher tries them in declaration order and adopts the first one that
/// reports an error or produces target state.
#[async_trait]
pub trait StateMover: Send + Sync {
    /// The schema the source state is expected to match. Declaring one
    /// gives [`MoveStateRequest::source_state`] a typed view of the source;
    /// without one the mover works from the raw state alone.
    fn source_schema(&self) -> Option<Schema> {
        None
    }

    /// Move the source state into the target resource type.
    async fn move_state(&self, request: MoveStateRequest, response: &mut MoveStateResponse);
}

/// A managed resource implementation.
///
/// # Example
///
/// ```ignore
/// use hemmer_provider_framework::resource::{
///     CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
///     Resource, ResourceMetadataRequest, ResourceMetadataResponse, UpdateRequest, UpdateResponse,
/// };
/// use hemmer_provider_framework::schema::{Attribute, Schema};
///
/// #[derive(Default)]
/// struct ServerResource;
///
/// #[async_trait::async_trait]
/// impl Resource for ServerResource {
///     fn metadata(&self, request: &ResourceMetadataRequest) -> ResourceMetadataResponse {
///         ResourceMetadataResponse {
///             type_name: format!("{}_server", request.provider_type_name),
///             ..Default::default()
///         }
///     }
///
///     fn schema(&self) -> Schema {
///         Schema::v0()
///             .with_attribute("name", Attribute::required_string())
///             .with_attribute("id", Attribute::computed_string())
///     }
///
///     async fn create(&self, request: CreateRequest, response: &mut CreateResponse) {
///         // Call the backing API, then populate response.state.
///     }
///
///     // ... read, update, delete
/// }
/// ```
#[async_trait]
pub trait Resource: Send + Sync {
    /// The resource's type name and behaviors.
    fn metadata(&self, request: &ResourceMetadataRequest) -> ResourceMetadataResponse;

    /// The schema describing this resource's state.
    fn schema(&self) -> Schema;

    /// Optional hooks this resource declares.
    fn capabilities(&self) -> ResourceCapabilities {
        ResourceCapabilities::default()
    }

    /// The schema describing this resource's identity, when it has one.
    fn identity_schema(&self) -> Option<IdentitySchema> {
        None
    }

    /// State movers accepting state from other resource types, tried in
    /// declaration order.
    fn state_movers(&self) -> Vec<Arc<dyn StateMover>> {
        Vec::new()
    }

    /// Validators to run against this resource's configuration.
    fn config_validators(&self) -> Vec<Arc<dyn ConfigValidator>> {
        Vec::new()
    }

    /// Validate the configuration beyond what schema validation covers.
    async fn validate_config(
        &self,
        request: &ValidateConfigRequest,
        response: &mut ValidateConfigResponse,
    ) {
        let _ = (request, response);
    }

    /// Receive provider data before an operation. Only called when
    /// [`ResourceCapabilities::configure`] is set.
    async fn configure(&mut self, request: &ConfigureRequest, response: &mut ConfigureResponse) {
        let _ = (request, response);
    }

    /// Create a new object from its planned state.
    async fn create(&self, request: CreateRequest, response: &mut CreateResponse);

    /// Refresh the state of an existing object.
    async fn read(&self, request: ReadRequest, response: &mut ReadResponse);

    /// Update an existing object toward its planned state.
    async fn update(&self, request: UpdateRequest, response: &mut UpdateResponse);

    /// Delete an existing object.
    async fn delete(&self, request: DeleteRequest, response: &mut DeleteResponse);

    /// Import existing infrastructure. Only called when
    /// [`ResourceCapabilities::import`] is set.
    async fn import_state(
        &self,
        request: ImportStateRequest,
        response: &mut ImportStateResponse,
    ) {
        let _ = (request, response);
    }
}
