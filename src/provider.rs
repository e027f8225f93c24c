//! The provider trait and provider-level configure types.
//!
//! A provider is the root object a plugin exposes: it names itself, declares
//! its own configuration schema, and hands out constructors for every
//! resource, data source, ephemeral resource, list resource, and state store
//! it serves. The dispatch layer instantiates those constructors per call
//! and injects the data produced by [`Provider::configure`] into each
//! instance that declares a configure capability.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::datasource::DataSourceConstructor;
use crate::diagnostics::Diagnostics;
use crate::ephemeral::EphemeralResourceConstructor;
use crate::list::ListResourceConstructor;
use crate::resource::ResourceConstructor;
use crate::schema::Schema;
use crate::statestore::StateStoreConstructor;
use crate::types::{ClientCapabilities, Deferred};
use crate::validation::{ConfigValidator, ValidateConfigRequest, ValidateConfigResponse};
use crate::value::Value;

/// Opaque provider-defined data produced by [`Provider::configure`] and
/// handed to object instances, typically holding API clients or credentials.
pub type ProviderData = Arc<dyn Any + Send + Sync>;

/// What a provider declares about itself beyond its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderCapabilities {
    /// The provider supplies raw schemas for list resource types that have
    /// no matching managed resource type, instead of requiring the pairing.
    pub raw_list_schemas: bool,
}

/// Response to a provider metadata request.
#[derive(Debug, Clone, Default)]
pub struct ProviderMetadataResponse {
    /// The provider's type name, used as the prefix when asking each object
    /// kind for its own type name.
    pub type_name: String,
}

/// Request to configure the provider with host-supplied configuration.
#[derive(Debug, Clone)]
pub struct ConfigureProviderRequest {
    /// The provider configuration data.
    pub config: Value,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Response from configuring the provider.
///
/// The per-kind data fields are stored by the server and passed to every
/// subsequently-instantiated object of that kind that declares a configure
/// capability.
#[derive(Default)]
pub struct ConfigureProviderResponse {
    /// Data for resource instances.
    pub resource_data: Option<ProviderData>,
    /// Data for data source instances.
    pub data_source_data: Option<ProviderData>,
    /// Data for ephemeral resource instances.
    pub ephemeral_resource_data: Option<ProviderData>,
    /// Data for list resource instances.
    pub list_resource_data: Option<ProviderData>,
    /// Data for state store instances.
    pub state_store_data: Option<ProviderData>,
    /// Set when the provider cannot be configured yet, for example because
    /// its own configuration contains unknown values. Operations that
    /// support deferral short-circuit while this is set.
    pub deferred: Option<Deferred>,
    /// Diagnostics reported while configuring.
    pub diagnostics: Diagnostics,
}

/// Request to configure one object instance with provider data.
#[derive(Clone, Default)]
pub struct ConfigureRequest {
    /// The data the provider produced for this object kind, if the provider
    /// has been configured.
    pub provider_data: Option<ProviderData>,
}

/// Response from configuring one object instance.
#[derive(Debug, Default)]
pub struct ConfigureResponse {
    /// Diagnostics reported while configuring.
    pub diagnostics: Diagnostics,
}

/// A provider implementation.
///
/// # Example
///
/// ```ignore
/// use hemmer_provider_framework::provider::{
///     ConfigureProviderRequest, ConfigureProviderResponse, Provider, ProviderMetadataResponse,
/// };
/// use hemmer_provider_framework::resource::ResourceConstructor;
/// use hemmer_provider_framework::schema::{Attribute, Schema};
/// use std::sync::Arc;
///
/// struct ExampleProvider;
///
/// #[async_trait::async_trait]
/// impl Provider for ExampleProvider {
///     fn metadata(&self) -> ProviderMetadataResponse {
///         ProviderMetadataResponse {
///             type_name: "example".to_string(),
///         }
///     }
///
///     fn schema(&self) -> Schema {
///         Schema::v0().with_attribute("endpoint", Attribute::optional_string())
///     }
///
///     fn resources(&self) -> Vec<ResourceConstructor> {
///         vec![Arc::new(|| Box::new(ServerResource::default()))]
///     }
///
///     async fn configure(
///         &self,
///         request: ConfigureProviderRequest,
///         response: &mut ConfigureProviderResponse,
///     ) {
///         // Build an API client from request.config and store it in
///         // response.resource_data.
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// The provider's own metadata.
    fn metadata(&self) -> ProviderMetadataResponse;

    /// The provider's configuration schema.
    fn schema(&self) -> Schema;

    /// What the provider declares beyond its schema.
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    /// Constructors for the managed resource types this provider serves.
    fn resources(&self) -> Vec<ResourceConstructor> {
        Vec::new()
    }

    /// Constructors for the data source types this provider serves.
    fn data_sources(&self) -> Vec<DataSourceConstructor> {
        Vec::new()
    }

    /// Constructors for the ephemeral resource types this provider serves.
    fn ephemeral_resources(&self) -> Vec<EphemeralResourceConstructor> {
        Vec::new()
    }

    /// Constructors for the list resource types this provider serves.
    fn list_resources(&self) -> Vec<ListResourceConstructor> {
        Vec::new()
    }

    /// Constructors for the state store types this provider serves.
    fn state_stores(&self) -> Vec<StateStoreConstructor> {
        Vec::new()
    }

    /// Raw schemas for list resource types without a matching managed
    /// resource type. Only consulted when
    /// [`ProviderCapabilities::raw_list_schemas`] is set.
    fn raw_list_schemas(&self) -> Vec<(String, Schema)> {
        Vec::new()
    }

    /// Validators to run against the provider configuration.
    fn config_validators(&self) -> Vec<Arc<dyn ConfigValidator>> {
        Vec::new()
    }

    /// Validate the provider configuration beyond what schema validation
    /// covers.
    async fn validate_config(
        &self,
        request: &ValidateConfigRequest,
        response: &mut ValidateConfigResponse,
    ) {
        let _ = (request, response);
    }

    /// Configure the provider with credentials and settings, producing the
    /// per-kind data injected into object instances.
    async fn configure(
        &self,
        request: ConfigureProviderRequest,
        response: &mut ConfigureProviderResponse,
    );
}
