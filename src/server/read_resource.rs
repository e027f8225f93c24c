//! The ReadResource operation.

use tracing::{debug, info, instrument, warn};

use crate::diagnostics::Diagnostics;
use crate::nullify::nullify_write_only;
use crate::private::IMPORT_BEFORE_READ_KEY;
use crate::resource::{ReadRequest, ReadResponse};
use crate::semantic::apply_semantic_equality;
use crate::server::{
    check_identity_change, check_identity_support, decode_private, encode_private, value_or_null,
    Server,
};
use crate::types::{ClientCapabilities, Deferred};
use crate::value::Value;

/// Host request to refresh an object's state.
#[derive(Debug, Clone, Default)]
pub struct ReadResourceRequest {
    /// The resource type to read.
    pub type_name: String,
    /// The most recently persisted state. Absent state defaults to a null
    /// value of the resource schema type.
    pub current_state: Option<Value>,
    /// The most recently persisted identity, when the resource declares an
    /// identity schema.
    pub current_identity: Option<Value>,
    /// Auxiliary provider-defined configuration, when the host sent one.
    pub provider_meta: Option<Value>,
    /// The encoded private state blob persisted with the state.
    pub private: Vec<u8>,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Host response from refreshing an object's state.
#[derive(Debug, Default)]
pub struct ReadResourceResponse {
    /// The refreshed state, with write-only attributes nulled. Null when
    /// the object no longer exists.
    pub new_state: Option<Value>,
    /// The refreshed identity, when the resource declares one.
    pub new_identity: Option<Value>,
    /// The encoded private state blob to persist, when there is one.
    pub private: Option<Vec<u8>>,
    /// Set when the operation was deferred instead of completed.
    pub deferred: Option<Deferred>,
    /// Diagnostics reported while reading.
    pub diagnostics: Diagnostics,
}

impl Server {
    /// Refresh the state of an existing object.
    ///
    /// A read performed right after an import skips the identity change
    /// check once; the private state marker recording the import is cleared
    /// here so later reads check again.
    #[instrument(skip(self, request))]
    pub async fn read_resource(&self, request: Option<ReadResourceRequest>) -> ReadResourceResponse {
        let mut response = ReadResourceResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(type_name = %request.type_name, "ReadResource called");

        let Some((resource, behavior)) = self
            .configured_resource(&request.type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        let schema = resource.schema();
        let identity_schema = resource.identity_schema();

        let current_state = value_or_null(request.current_state, schema.object_type());
        let current_identity = if identity_schema.is_some() {
            request.current_identity
        } else {
            None
        };

        let Some(mut private) = decode_private(&request.private, &mut response.diagnostics) else {
            return response;
        };

        if let Some(deferred) = self.provider_deferral(request.client_capabilities) {
            debug!(reason = %deferred.reason, "ReadResource deferred");
            response.new_state = Some(current_state);
            response.new_identity = current_identity;
            response.private = encode_private(&private, &mut response.diagnostics);
            response.deferred = Some(deferred);
            return response;
        }

        let imported_before_read = private.framework_get(IMPORT_BEFORE_READ_KEY).is_some();

        let read_request = ReadRequest {
            current_state: current_state.clone(),
            identity: current_identity.clone(),
            provider_meta: request.provider_meta,
            private: private.provider.clone(),
            client_capabilities: request.client_capabilities,
        };
        let mut read_response = ReadResponse {
            state: current_state.clone(),
            identity: current_identity.clone(),
            private: private.provider.clone(),
            deferred: None,
            diagnostics: Diagnostics::new(),
        };
        resource.read(read_request, &mut read_response).await;

        response.diagnostics.append(&mut read_response.diagnostics);

        check_identity_support(
            "Read",
            identity_schema.as_ref(),
            read_response.identity.as_ref(),
            &mut response.diagnostics,
        );

        // A null refreshed state means the object vanished out from under
        // the host; the identity legitimately disappears with it.
        if !read_response.state.is_null() && !imported_before_read {
            check_identity_change(
                "Read",
                current_identity.as_ref(),
                read_response.identity.as_ref(),
                behavior,
                &mut response.diagnostics,
            );
        }

        let (new_state, mut equality_diagnostics) =
            apply_semantic_equality(&schema, &current_state, &read_response.state);
        response.diagnostics.append(&mut equality_diagnostics);
        let new_state = nullify_write_only(&schema, &new_state);

        if imported_before_read {
            private.framework_remove(IMPORT_BEFORE_READ_KEY);
        }
        private.provider = read_response.private;
        response.private = encode_private(&private, &mut response.diagnostics);
        response.new_state = Some(new_state);
        response.new_identity = read_response.identity;
        response.deferred = read_response.deferred;

        if response.diagnostics.has_error() {
            warn!(
                diagnostics = response.diagnostics.len(),
                "ReadResource completed with errors"
            );
        } else {
            info!("ReadResource completed successfully");
        }
        response
    }
}
