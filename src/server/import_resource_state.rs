//! The ImportResourceState operation.

use tracing::{debug, info, instrument, warn};

use crate::diagnostics::Diagnostics;
use crate::nullify::nullify_write_only;
use crate::private::{PrivateData, ProviderPrivateData, IMPORT_BEFORE_READ_KEY};
use crate::resource::{ImportStateRequest, ImportStateResponse};
use crate::server::{check_identity_support, encode_private, Server};
use crate::types::{ClientCapabilities, Deferred};
use crate::value::Value;

/// Host request to import existing infrastructure into management.
#[derive(Debug, Clone, Default)]
pub struct ImportResourceStateRequest {
    /// The resource type to import into.
    pub type_name: String,
    /// The user-supplied import identifier.
    pub id: String,
    /// The user-supplied identity, when the host imports by identity.
    pub identity: Option<Value>,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Host response from importing an object.
#[derive(Debug, Default)]
pub struct ImportResourceStateResponse {
    /// The imported state, with write-only attributes nulled.
    pub state: Option<Value>,
    /// The imported identity, when the resource declares one.
    pub identity: Option<Value>,
    /// The encoded private state blob to persist. Imported state is tagged
    /// so the follow-up read can tell it apart from refreshed state.
    pub private: Option<Vec<u8>>,
    /// Set when the operation was deferred instead of completed.
    pub deferred: Option<Deferred>,
    /// Diagnostics reported while importing.
    pub diagnostics: Diagnostics,
}

impl Server {
    /// Import existing infrastructure into a managed resource type.
    #[instrument(skip(self, request))]
    pub async fn import_resource_state(
        &self,
        request: Option<ImportResourceStateRequest>,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(type_name = %request.type_name, id = %request.id, "ImportResourceState called");

        let Some((resource, _)) = self
            .configured_resource(&request.type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        if !resource.capabilities().import {
            response.diagnostics.add_error(
                "Resource Import Not Implemented",
                "This resource type does not support import. Please ask the provider developer \
                 to add support.",
            );
            return response;
        }

        let schema = resource.schema();
        let identity_schema = resource.identity_schema();
        let identity = if identity_schema.is_some() {
            request.identity
        } else {
            None
        };

        if let Some(deferred) = self.provider_deferral(request.client_capabilities) {
            debug!(reason = %deferred.reason, "ImportResourceState deferred");
            response.state = Some(Value::unknown(schema.object_type()));
            response.identity = identity;
            response.deferred = Some(deferred);
            return response;
        }

        let import_request = ImportStateRequest {
            id: request.id,
            identity: identity.clone(),
            client_capabilities: request.client_capabilities,
        };
        let mut import_response = ImportStateResponse {
            state: Value::null(schema.object_type()),
            identity,
            private: ProviderPrivateData::new(),
            deferred: None,
            diagnostics: Diagnostics::new(),
        };
        resource
            .import_state(import_request, &mut import_response)
            .await;

        if import_response.state.is_null() && import_response.diagnostics.is_empty() {
            import_response.diagnostics.add_error(
                "Missing Resource Import State",
                "The import operation returned no state and no diagnostics. Import must either \
                 populate enough state for a follow-up read to refresh the object, or explain \
                 why it cannot.",
            );
        }
        response
            .diagnostics
            .append(&mut import_response.diagnostics);

        check_identity_support(
            "Import",
            identity_schema.as_ref(),
            import_response.identity.as_ref(),
            &mut response.diagnostics,
        );

        let state = nullify_write_only(&schema, &import_response.state);

        let mut private = PrivateData::new();
        private.provider = import_response.private;
        private.framework_set(IMPORT_BEFORE_READ_KEY, b"true".to_vec());
        response.private = encode_private(&private, &mut response.diagnostics);
        response.state = Some(state);
        response.identity = import_response.identity;
        response.deferred = import_response.deferred;

        if response.diagnostics.has_error() {
            warn!(
                diagnostics = response.diagnostics.len(),
                "ImportResourceState completed with errors"
            );
        } else {
            info!("ImportResourceState completed successfully");
        }
        response
    }
}
