//! The DeleteResource operation.

use tracing::{debug, info, instrument, warn};

use crate::diagnostics::Diagnostics;
use crate::resource::{DeleteRequest, DeleteResponse};
use crate::server::{check_identity_support, decode_private, encode_private, value_or_null, Server};
use crate::types::ClientCapabilities;
use crate::value::Value;

/// Host request to delete an object.
#[derive(Debug, Clone, Default)]
pub struct DeleteResourceRequest {
    /// The resource type to delete.
    pub type_name: String,
    /// The most recently persisted state. Absent state defaults to a null
    /// value of the resource schema type.
    pub prior_state: Option<Value>,
    /// The most recently persisted identity, when the resource declares an
    /// identity schema.
    pub prior_identity: Option<Value>,
    /// Auxiliary provider-defined configuration, when the host sent one.
    pub provider_meta: Option<Value>,
    /// The encoded private state blob persisted with the state.
    pub private: Vec<u8>,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Host response from deleting an object.
///
/// A delete that reports no errors always yields a null state, no identity,
/// and no private data, regardless of what the operation left in its
/// response. A failed delete keeps whatever the operation reported so the
/// host can track what remains.
#[derive(Debug, Default)]
pub struct DeleteResourceResponse {
    /// The remaining state.
    pub new_state: Option<Value>,
    /// The remaining identity, when the resource declares one.
    pub new_identity: Option<Value>,
    /// The encoded private state blob to persist, when there is one.
    pub private: Option<Vec<u8>>,
    /// Diagnostics reported while deleting.
    pub diagnostics: Diagnostics,
}

impl Server {
    /// Delete an existing object.
    #[instrument(skip(self, request))]
    pub async fn delete_resource(
        &self,
        request: Option<DeleteResourceRequest>,
    ) -> DeleteResourceResponse {
        let mut response = DeleteResourceResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(type_name = %request.type_name, "DeleteResource called");

        let Some((resource, _)) = self
            .configured_resource(&request.type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        let schema = resource.schema();
        let identity_schema = resource.identity_schema();

        let prior_state = value_or_null(request.prior_state, schema.object_type());
        let prior_identity = if identity_schema.is_some() {
            request.prior_identity
        } else {
            None
        };

        let Some(mut private) = decode_private(&request.private, &mut response.diagnostics) else {
            return response;
        };

        let delete_request = DeleteRequest {
            state: prior_state.clone(),
            identity: prior_identity.clone(),
            provider_meta: request.provider_meta,
            private: private.provider.clone(),
            client_capabilities: request.client_capabilities,
        };
        let mut delete_response = DeleteResponse {
            state: prior_state,
            identity: prior_identity,
            private: private.provider.clone(),
            diagnostics: Diagnostics::new(),
        };
        resource.delete(delete_request, &mut delete_response).await;

        response
            .diagnostics
            .append(&mut delete_response.diagnostics);

        check_identity_support(
            "Delete",
            identity_schema.as_ref(),
            delete_response.identity.as_ref(),
            &mut response.diagnostics,
        );

        if response.diagnostics.has_error() {
            private.provider = delete_response.private;
            response.private = encode_private(&private, &mut response.diagnostics);
            response.new_state = Some(delete_response.state);
            response.new_identity = delete_response.identity;
            warn!(
                diagnostics = response.diagnostics.len(),
                "DeleteResource completed with errors"
            );
        } else {
            response.new_state = Some(Value::null(schema.object_type()));
            info!("DeleteResource completed successfully");
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::super::test_support::{TestProvider, TestResource};
    use super::*;
    use crate::private::PrivateData;
    use crate::schema::{IdentityAttribute, IdentitySchema, Schema};
    use crate::value::AttributeType;

    fn server_with(resource: TestResource) -> Server {
        Server::new(Arc::new(TestProvider {
            resources: vec![resource.constructor()],
            ..Default::default()
        }))
    }

    fn state(schema: &Schema, data: serde_json::Value) -> Value {
        Value::from_json(&schema.object_type(), &data).unwrap()
    }

    #[tokio::test]
    async fn test_successful_delete_clears_state_identity_and_private() {
        let resource = TestResource {
            identity_schema: Some(
                IdentitySchema::new(1)
                    .with_attribute("id", IdentityAttribute::new(AttributeType::String)),
            ),
            ..Default::default()
        };
        let prior = state(&resource.schema, json!({ "name": "web", "id": "srv-1" }));
        let identity = Value::object([("id".to_string(), Value::string("srv-1"))].into());

        let mut private = PrivateData::new();
        let diagnostics = private.provider.set_key("etag", br#""abc""#);
        assert!(diagnostics.is_empty());
        let (encoded, _) = private.to_bytes();

        let server = server_with(resource);

        let response = server
            .delete_resource(Some(DeleteResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                prior_state: Some(prior),
                prior_identity: Some(identity),
                private: encoded.unwrap(),
                ..Default::default()
            }))
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.unwrap().is_null());
        assert!(response.new_identity.is_none());
        assert!(response.private.is_none());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_the_remaining_state() {
        let resource = TestResource {
            on_delete: Some(Arc::new(|request, response| {
                response.state = request.state;
                response
                    .diagnostics
                    .add_error("Dependency In Use", "A volume is still attached.");
                let diagnostics = response.private.set_key("attempts", b"1");
                assert!(diagnostics.is_empty());
            })),
            ..Default::default()
        };
        let prior = state(&resource.schema, json!({ "name": "web", "id": "srv-1" }));
        let server = server_with(resource);

        let response = server
            .delete_resource(Some(DeleteResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                prior_state: Some(prior.clone()),
                ..Default::default()
            }))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Dependency In Use");
        assert_eq!(response.new_state, Some(prior));
        let (decoded, _) = PrivateData::from_bytes(&response.private.unwrap());
        let decoded = decoded.unwrap();
        let (value, _) = decoded.provider.get_key("attempts");
        assert_eq!(value, Some(&b"1"[..]));
    }

    #[tokio::test]
    async fn test_delete_identity_without_declared_schema_is_flagged() {
        let resource = TestResource {
            on_delete: Some(Arc::new(|request, response| {
                response.state = request.state;
                response.identity =
                    Some(Value::object([("id".to_string(), Value::string("x"))].into()));
            })),
            ..Default::default()
        };
        let prior = state(&resource.schema, json!({ "name": "web", "id": "srv-1" }));
        let server = server_with(resource);

        let response = server
            .delete_resource(Some(DeleteResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                prior_state: Some(prior),
                ..Default::default()
            }))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Unexpected Delete Response");
    }
}
