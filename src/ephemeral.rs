//! The ephemeral resource trait and its operation types.
//!
//! An ephemeral resource produces short-lived values that are never
//! persisted to state, such as leased credentials. The host opens a handle
//! to get the value and closes it when the value is no longer needed.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::diagnostics::Diagnostics;
use crate::private::ProviderPrivateData;
use crate::provider::{ConfigureRequest, ConfigureResponse};
use crate::schema::Schema;
use crate::types::{ClientCapabilities, Deferred};
use crate::validation::{ConfigValidator, ValidateConfigRequest, ValidateConfigResponse};
use crate::value::Value;

/// Constructs a fresh ephemeral resource instance, once per operation.
pub type EphemeralResourceConstructor = Arc<dyn Fn() -> Box<dyn EphemeralResource> + Send + Sync>;

/// Optional hooks an ephemeral resource declares beyond opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EphemeralResourceCapabilities {
    /// The ephemeral resource wants provider data injected before
    /// operations run.
    pub configure: bool,
    /// The ephemeral resource must be told when its value is no longer in
    /// use, for example to revoke a lease.
    pub close: bool,
}

/// Request for an ephemeral resource's metadata.
#[derive(Debug, Clone)]
pub struct EphemeralResourceMetadataRequest {
    /// The provider's type name, conventionally used as the prefix of the
    /// ephemeral resource type name.
    pub provider_type_name: String,
}

/// An ephemeral resource's declared metadata.
#[derive(Debug, Clone, Default)]
pub struct EphemeralResourceMetadataResponse {
    /// The ephemeral resource type name, for example `examplecloud_token`.
    pub type_name: String,
}

/// Request to open an ephemeral resource.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    /// The configuration the user wrote.
    pub config: Value,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Response from opening an ephemeral resource.
#[derive(Debug)]
pub struct OpenResponse {
    /// The produced value. Starts null; the provider must populate it.
    pub result: Value,
    /// When the value expires and should no longer be used.
    pub renew_at: Option<SystemTime>,
    /// Provider-private state handed back on close.
    pub private: ProviderPrivateData,
    /// Set to defer this operation instead of completing it.
    pub deferred: Option<Deferred>,
    /// Diagnostics reported by the operation.
    pub diagnostics: Diagnostics,
}

/// Request to close an ephemeral resource.
#[derive(Debug, Clone)]
pub struct CloseRequest {
    /// The provider-private state returned from the open that produced this
    /// handle.
    pub private: ProviderPrivateData,
}

/// Response from closing an ephemeral resource.
#[derive(Debug, Default)]
pub struct CloseResponse {
    /// Diagnostics reported by the operation.
    pub diagnostics: Diagnostics,
}

/// An ephemeral resource implementation.
#[async_trait]
pub trait EphemeralResource: Send + Sync {
    /// The ephemeral resource's type name.
    fn metadata(
        &self,
        request: &EphemeralResourceMetadataRequest,
    ) -> EphemeralResourceMetadataResponse;

    /// The schema describing this ephemeral resource's configuration and
    /// result.
    fn schema(&self) -> Schema;

    /// Optional hooks this ephemeral resource declares.
    fn capabilities(&self) -> EphemeralResourceCapabilities {
        EphemeralResourceCapabilities::default()
    }

    /// Validators to run against this ephemeral resource's configuration.
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
    /// [`EphemeralResourceCapabilities::configure`] is set.
    async fn configure(&mut self, request: &ConfigureRequest, response: &mut ConfigureResponse) {
        let _ = (request, response);
    }

    /// Open a handle, producing the ephemeral value.
    async fn open(&self, request: OpenRequest, response: &mut OpenResponse);

    /// Release a previously opened handle. Only called when
    /// [`EphemeralResourceCapabilities::close`] is set.
    async fn close(&self, request: CloseRequest, response: &mut CloseResponse) {
        let _ = (request, response);
    }
}
