//! The configuration validation operations, one per object kind.
//!
//! Each handler runs schema validation first, then the object's declared
//! config validators, then its whole-config validate hook. Diagnostics
//! accumulate across all three stages; no stage short-circuits the next.

use tracing::{debug, info, instrument, warn};

use crate::diagnostics::Diagnostics;
use crate::server::{value_or_null, Server};
use crate::validation::{
    self, run_config_validators, ValidateConfigRequest, ValidateConfigResponse,
};
use crate::value::Value;

/// Host request to validate the provider configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidateProviderConfigRequest {
    /// The configuration to validate, shaped by the provider schema. Absent
    /// configuration defaults to a null value of the schema type.
    pub config: Option<Value>,
}

/// Host response from validating the provider configuration.
#[derive(Debug, Default)]
pub struct ValidateProviderConfigResponse {
    /// The validated configuration, echoed back to the host.
    pub config: Option<Value>,
    /// Diagnostics reported while validating.
    pub diagnostics: Diagnostics,
}

/// Host request to validate a managed resource configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidateResourceConfigRequest {
    /// The resource type whose schema shapes the configuration.
    pub type_name: String,
    /// The configuration to validate.
    pub config: Option<Value>,
}

/// Host response from validating a managed resource configuration.
#[derive(Debug, Default)]
pub struct ValidateResourceConfigResponse {
    /// Diagnostics reported while validating.
    pub diagnostics: Diagnostics,
}

/// Host request to validate a data source configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidateDataSourceConfigRequest {
    /// The data source type whose schema shapes the configuration.
    pub type_name: String,
    /// The configuration to validate.
    pub config: Option<Value>,
}

/// Host response from validating a data source configuration.
#[derive(Debug, Default)]
pub struct ValidateDataSourceConfigResponse {
    /// Diagnostics reported while validating.
    pub diagnostics: Diagnostics,
}

/// Host request to validate an ephemeral resource configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidateEphemeralResourceConfigRequest {
    /// The ephemeral resource type whose schema shapes the configuration.
    pub type_name: String,
    /// The configuration to validate.
    pub config: Option<Value>,
}

/// Host response from validating an ephemeral resource configuration.
#[derive(Debug, Default)]
pub struct ValidateEphemeralResourceConfigResponse {
    /// Diagnostics reported while validating.
    pub diagnostics: Diagnostics,
}

/// Host request to validate a list resource configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidateListResourceConfigRequest {
    /// The list resource type whose schema shapes the configuration.
    pub type_name: String,
    /// The configuration to validate.
    pub config: Option<Value>,
}

/// Host response from validating a list resource configuration.
#[derive(Debug, Default)]
pub struct ValidateListResourceConfigResponse {
    /// Diagnostics reported while validating.
    pub diagnostics: Diagnostics,
}

impl Server {
    /// Validate the provider configuration, echoing it back to the host.
    #[instrument(skip(self, request))]
    pub async fn validate_provider_config(
        &self,
        request: Option<ValidateProviderConfigRequest>,
    ) -> ValidateProviderConfigResponse {
        debug!("ValidateProviderConfig called");
        let mut response = ValidateProviderConfigResponse::default();
        let Some(request) = request else {
            return response;
        };

        let schema = self.provider_schema();
        let config = value_or_null(request.config, schema.object_type());

        let mut schema_diagnostics = validation::validate(&schema, &config);
        response.diagnostics.append(&mut schema_diagnostics);

        run_config_validators(
            &config,
            &self.provider.config_validators(),
            &mut response.diagnostics,
        )
        .await;

        let validate_request = ValidateConfigRequest {
            config: config.clone(),
        };
        let mut validate_response = ValidateConfigResponse::default();
        self.provider
            .validate_config(&validate_request, &mut validate_response)
            .await;
        response
            .diagnostics
            .append(&mut validate_response.diagnostics);

        response.config = Some(config);
        if response.diagnostics.has_error() {
            warn!(
                diagnostics = response.diagnostics.len(),
                "ValidateProviderConfig completed with errors"
            );
        } else {
            info!("ValidateProviderConfig completed successfully");
        }
        response
    }

    /// Validate a managed resource configuration.
    #[instrument(skip(self, request))]
    pub async fn validate_resource_config(
        &self,
        request: Option<ValidateResourceConfigRequest>,
    ) -> ValidateResourceConfigResponse {
        let mut response = ValidateResourceConfigResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(type_name = %request.type_name, "ValidateResourceConfig called");

        let Some((resource, _)) = self
            .configured_resource(&request.type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        let schema = resource.schema();
        let config = value_or_null(request.config, schema.object_type());

        let mut schema_diagnostics = validation::validate(&schema, &config);
        response.diagnostics.append(&mut schema_diagnostics);

        run_config_validators(
            &config,
            &resource.config_validators(),
            &mut response.diagnostics,
        )
        .await;

        let validate_request = ValidateConfigRequest { config };
        let mut validate_response = ValidateConfigResponse::default();
        resource
            .validate_config(&validate_request, &mut validate_response)
            .await;
        response
            .diagnostics
            .append(&mut validate_response.diagnostics);

        if response.diagnostics.has_error() {
            warn!(
                diagnostics = response.diagnostics.len(),
                "ValidateResourceConfig completed with errors"
            );
        } else {
            info!("ValidateResourceConfig completed successfully");
        }
        response
    }

    /// Validate a data source configuration.
    #[instrument(skip(self, request))]
    pub async fn validate_data_source_config(
        &self,
        request: Option<ValidateDataSourceConfigRequest>,
    ) -> ValidateDataSourceConfigResponse {
        let mut response = ValidateDataSourceConfigResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(type_name = %request.type_name, "ValidateDataSourceConfig called");

        let Some(data_source) = self
            .configured_data_source(&request.type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        let schema = data_source.schema();
        let config = value_or_null(request.config, schema.object_type());

        let mut schema_diagnostics = validation::validate(&schema, &config);
        response.diagnostics.append(&mut schema_diagnostics);

        run_config_validators(
            &config,
            &data_source.config_validators(),
            &mut response.diagnostics,
        )
        .await;

        let validate_request = ValidateConfigRequest { config };
        let mut validate_response = ValidateConfigResponse::default();
        data_source
            .validate_config(&validate_request, &mut validate_response)
            .await;
        response
            .diagnostics
            .append(&mut validate_response.diagnostics);

        if response.diagnostics.has_error() {
            warn!(
                diagnostics = response.diagnostics.len(),
                "ValidateDataSourceConfig completed with errors"
            );
        } else {
            info!("ValidateDataSourceConfig completed successfully");
        }
        response
    }

    /// Validate an ephemeral resource configuration.
    #[instrument(skip(self, request))]
    pub async fn validate_ephemeral_resource_config(
        &self,
        request: Option<ValidateEphemeralResourceConfigRequest>,
    ) -> ValidateEphemeralResourceConfigResponse {
        let mut response = ValidateEphemeralResourceConfigResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(type_name = %request.type_name, "ValidateEphemeralResourceConfig called");

        let Some(ephemeral_resource) = self
            .configured_ephemeral_resource(&request.type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        let schema = ephemeral_resource.schema();
        let config = value_or_null(request.config, schema.object_type());

        let mut schema_diagnostics = validation::validate(&schema, &config);
        response.diagnostics.append(&mut schema_diagnostics);

        run_config_validators(
            &config,
            &ephemeral_resource.config_validators(),
            &mut response.diagnostics,
        )
        .await;

        let validate_request = ValidateConfigRequest { config };
        let mut validate_response = ValidateConfigResponse::default();
        ephemeral_resource
            .validate_config(&validate_request, &mut validate_response)
            .await;
        response
            .diagnostics
            .append(&mut validate_response.diagnostics);

        if response.diagnostics.has_error() {
            warn!(
                diagnostics = response.diagnostics.len(),
                "ValidateEphemeralResourceConfig completed with errors"
            );
        } else {
            info!("ValidateEphemeralResourceConfig completed successfully");
        }
        response
    }

    /// Validate a list resource configuration.
    #[instrument(skip(self, request))]
    pub async fn validate_list_resource_config(
        &self,
        request: Option<ValidateListResourceConfigRequest>,
    ) -> ValidateListResourceConfigResponse {
        let mut response = ValidateListResourceConfigResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(type_name = %request.type_name, "ValidateListResourceConfig called");

        let Some(list_resource) = self
            .configured_list_resource(&request.type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        let schema = list_resource.schema();
        let config = value_or_null(request.config, schema.object_type());

        let mut schema_diagnostics = validation::validate(&schema, &config);
        response.diagnostics.append(&mut schema_diagnostics);

        run_config_validators(
            &config,
            &list_resource.config_validators(),
            &mut response.diagnostics,
        )
        .await;

        let validate_request = ValidateConfigRequest { config };
        let mut validate_response = ValidateConfigResponse::default();
        list_resource
            .validate_config(&validate_request, &mut validate_response)
            .await;
        response
            .diagnostics
            .append(&mut validate_response.diagnostics);

        if response.diagnostics.has_error() {
            warn!(
                diagnostics = response.diagnostics.len(),
                "ValidateListResourceConfig completed with errors"
            );
        } else {
            info!("ValidateListResourceConfig completed successfully");
        }
        response
    }
}
