//! The UpdateResource operation.

use tracing::{debug, info, instrument, warn};

use crate::diagnostics::{Diagnostics, PROVIDER_ISSUE};
use crate::nullify::nullify_write_only;
use crate::resource::{UpdateRequest, UpdateResponse};
use crate::semantic::apply_semantic_equality;
use crate::server::{
    check_identity_change, check_identity_support, decode_private, encode_private, value_or_null,
    Server,
};
use crate::types::ClientCapabilities;
use crate::value::Value;

/// Host request to update an existing object.
#[derive(Debug, Clone, Default)]
pub struct UpdateResourceRequest {
    /// The resource type to update.
    pub type_name: String,
    /// The configuration the user wrote. Absent sides default to a null
    /// value of the resource schema type.
    pub config: Option<Value>,
    /// The state the host plans to store after the update.
    pub planned_state: Option<Value>,
    /// The most recently persisted state.
    pub prior_state: Option<Value>,
    /// The planned identity, when the resource declares an identity schema.
    pub planned_identity: Option<Value>,
    /// Auxiliary provider-defined configuration, when the host sent one.
    pub provider_meta: Option<Value>,
    /// The encoded private state blob from the plan.
    pub planned_private: Vec<u8>,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Host response from updating an object.
#[derive(Debug, Default)]
pub struct UpdateResourceResponse {
    /// The updated state, with write-only attributes nulled.
    pub new_state: Option<Value>,
    /// The updated identity, when the resource declares one.
    pub new_identity: Option<Value>,
    /// The encoded private state blob to persist, when there is one.
    pub private: Option<Vec<u8>>,
    /// Diagnostics reported while updating.
    pub diagnostics: Diagnostics,
}

impl Server {
    /// Update an existing object toward its planned state.
    #[instrument(skip(self, request))]
    pub async fn update_resource(
        &self,
        request: Option<UpdateResourceRequest>,
    ) -> UpdateResourceResponse {
        let mut response = UpdateResourceResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(type_name = %request.type_name, "UpdateResource called");

        let Some((resource, behavior)) = self
            .configured_resource(&request.type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        let schema = resource.schema();
        let identity_schema = resource.identity_schema();

        let config = value_or_null(request.config, schema.object_type());
        let planned_state = value_or_null(request.planned_state, schema.object_type());
        let prior_state = value_or_null(request.prior_state, schema.object_type());
        let planned_identity = if identity_schema.is_some() {
            request.planned_identity
        } else {
            None
        };

        let Some(mut private) = decode_private(&request.planned_private, &mut response.diagnostics)
        else {
            return response;
        };

        let update_request = UpdateRequest {
            config,
            planned_state: planned_state.clone(),
            prior_state,
            identity: planned_identity.clone(),
            provider_meta: request.provider_meta,
            private: private.provider.clone(),
            client_capabilities: request.client_capabilities,
        };
        let mut update_response = UpdateResponse {
            state: planned_state.clone(),
            identity: planned_identity.clone(),
            private: private.provider.clone(),
            diagnostics: Diagnostics::new(),
        };
        resource.update(update_request, &mut update_response).await;

        let callback_errored = update_response.diagnostics.has_error();
        response
            .diagnostics
            .append(&mut update_response.diagnostics);

        check_identity_support(
            "Update",
            identity_schema.as_ref(),
            update_response.identity.as_ref(),
            &mut response.diagnostics,
        );
        check_identity_change(
            "Update",
            planned_identity.as_ref(),
            update_response.identity.as_ref(),
            behavior,
            &mut response.diagnostics,
        );

        if update_response.state.is_null() && !callback_errored {
            response.diagnostics.add_error(
                "Missing Resource State After Update",
                format!(
                    "The update operation returned a null state and no errors. {PROVIDER_ISSUE}\n\n\
                     The object may have been changed without the host tracking it."
                ),
            );
        }

        let (new_state, mut equality_diagnostics) =
            apply_semantic_equality(&schema, &planned_state, &update_response.state);
        response.diagnostics.append(&mut equality_diagnostics);
        let new_state = nullify_write_only(&schema, &new_state);

        private.provider = update_response.private;
        response.private = encode_private(&private, &mut response.diagnostics);
        response.new_state = Some(new_state);
        response.new_identity = update_response.identity;

        if response.diagnostics.has_error() {
            warn!(
                diagnostics = response.diagnostics.len(),
                "UpdateResource completed with errors"
            );
        } else {
            info!("UpdateResource completed successfully");
        }
        response
    }
}
