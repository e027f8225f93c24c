//! The ConfigureProvider operation.

use tracing::{debug, info, instrument, warn};

use crate::diagnostics::Diagnostics;
use crate::provider;
use crate::server::{value_or_null, ConfigureState, Server};
use crate::types::ClientCapabilities;
use crate::value::Value;

/// Host request to configure the provider.
#[derive(Debug, Clone, Default)]
pub struct ConfigureProviderRequest {
    /// The provider configuration, shaped by the provider schema. Absent
    /// configuration defaults to a null value of the schema type.
    pub config: Option<Value>,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Host response from configuring the provider.
///
/// The per-kind data the provider produced stays inside the server for
/// injection into later object instances; only diagnostics travel back.
#[derive(Debug, Default)]
pub struct ConfigureProviderResponse {
    /// Diagnostics reported while configuring.
    pub diagnostics: Diagnostics,
}

impl Server {
    /// Configure the provider and store the per-kind data it produces.
    ///
    /// Any provider-level deferral is also stored; deferrable operations
    /// short-circuit while it is set.
    #[instrument(skip(self, request))]
    pub async fn configure_provider(
        &self,
        request: Option<ConfigureProviderRequest>,
    ) -> ConfigureProviderResponse {
        debug!("ConfigureProvider called");
        let mut response = ConfigureProviderResponse::default();
        let Some(request) = request else {
            return response;
        };

        let schema = self.provider_schema();
        let config = value_or_null(request.config, schema.object_type());

        let provider_request = provider::ConfigureProviderRequest {
            config,
            client_capabilities: request.client_capabilities,
        };
        let mut provider_response = provider::ConfigureProviderResponse::default();
        self.provider
            .configure(provider_request, &mut provider_response)
            .await;
        response
            .diagnostics
            .append(&mut provider_response.diagnostics);

        self.store_configure_state(ConfigureState {
            resource_data: provider_response.resource_data,
            data_source_data: provider_response.data_source_data,
            ephemeral_resource_data: provider_response.ephemeral_resource_data,
            list_resource_data: provider_response.list_resource_data,
            state_store_data: provider_response.state_store_data,
            deferred: provider_response.deferred,
        });

        if response.diagnostics.has_error() {
            warn!(
                diagnostics = response.diagnostics.len(),
                "ConfigureProvider completed with errors"
            );
        } else {
            info!("ConfigureProvider completed successfully");
        }
        response
    }
}
