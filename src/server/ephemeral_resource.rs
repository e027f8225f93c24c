//! The OpenEphemeralResource and CloseEphemeralResource operations.

use std::time::SystemTime;

use tracing::{debug, info, instrument, warn};

use crate::diagnostics::{Diagnostics, FRAMEWORK_ISSUE};
use crate::ephemeral::{CloseRequest, CloseResponse, OpenRequest, OpenResponse};
use crate::private::{PrivateData, ProviderPrivateData};
use crate::server::{decode_private, encode_private, value_or_null, Server};
use crate::types::{ClientCapabilities, Deferred};
use crate::value::Value;

/// Host request to open an ephemeral resource handle.
#[derive(Debug, Clone, Default)]
pub struct OpenEphemeralResourceRequest {
    /// The ephemeral resource type to open.
    pub type_name: String,
    /// The configuration the user wrote. Absent configuration defaults to a
    /// null value of the schema type.
    pub config: Option<Value>,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Host response from opening an ephemeral resource.
///
/// The result is never persisted to any state artifact; it lives only for
/// the duration the host needs it.
#[derive(Debug, Default)]
pub struct OpenEphemeralResourceResponse {
    /// The produced value.
    pub result: Option<Value>,
    /// When the value expires and must be renewed or reopened.
    pub renew_at: Option<SystemTime>,
    /// The encoded private state blob to hand back on close, when there is
    /// one.
    pub private: Option<Vec<u8>>,
    /// Set when the operation was deferred instead of completed.
    pub deferred: Option<Deferred>,
    /// Diagnostics reported while opening.
    pub diagnostics: Diagnostics,
}

/// Host request to close a previously opened ephemeral resource handle.
#[derive(Debug, Clone, Default)]
pub struct CloseEphemeralResourceRequest {
    /// The ephemeral resource type being closed.
    pub type_name: String,
    /// The encoded private state blob returned when the handle was opened.
    pub private: Vec<u8>,
}

/// Host response from closing an ephemeral resource.
#[derive(Debug, Default)]
pub struct CloseEphemeralResourceResponse {
    /// Diagnostics reported while closing.
    pub diagnostics: Diagnostics,
}

impl Server {
    /// Open an ephemeral resource handle, producing a short-lived value.
    #[instrument(skip(self, request))]
    pub async fn open_ephemeral_resource(
        &self,
        request: Option<OpenEphemeralResourceRequest>,
    ) -> OpenEphemeralResourceResponse {
        let mut response = OpenEphemeralResourceResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(type_name = %request.type_name, "OpenEphemeralResource called");

        let Some(ephemeral_resource) = self
            .configured_ephemeral_resource(&request.type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        let schema = ephemeral_resource.schema();
        let config = value_or_null(request.config, schema.object_type());

        if let Some(deferred) = self.provider_deferral(request.client_capabilities) {
            debug!(reason = %deferred.reason, "OpenEphemeralResource deferred");
            response.deferred = Some(deferred);
            return response;
        }

        let open_request = OpenRequest {
            config,
            client_capabilities: request.client_capabilities,
        };
        let mut open_response = OpenResponse {
            result: Value::null(schema.object_type()),
            renew_at: None,
            private: ProviderPrivateData::new(),
            deferred: None,
            diagnostics: Diagnostics::new(),
        };
        ephemeral_resource
            .open(open_request, &mut open_response)
            .await;

        response.diagnostics.append(&mut open_response.diagnostics);

        let mut private = PrivateData::new();
        private.provider = open_response.private;
        response.private = encode_private(&private, &mut response.diagnostics);
        response.result = Some(open_response.result);
        response.renew_at = open_response.renew_at;
        response.deferred = open_response.deferred;

        if response.diagnostics.has_error() {
            warn!(
                diagnostics = response.diagnostics.len(),
                "OpenEphemeralResource completed with errors"
            );
        } else {
            info!("OpenEphemeralResource completed successfully");
        }
        response
    }

    /// Release a previously opened ephemeral resource handle.
    ///
    /// Only ephemeral resource types that declared close support receive
    /// this call; for any other type it is a host protocol error.
    #[instrument(skip(self, request))]
    pub async fn close_ephemeral_resource(
        &self,
        request: Option<CloseEphemeralResourceRequest>,
    ) -> CloseEphemeralResourceResponse {
        let mut response = CloseEphemeralResourceResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(type_name = %request.type_name, "CloseEphemeralResource called");

        let Some(ephemeral_resource) = self
            .configured_ephemeral_resource(&request.type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        if !ephemeral_resource.capabilities().close {
            response.diagnostics.add_error(
                "Ephemeral Resource Close Not Implemented",
                format!(
                    "The host called close on an ephemeral resource type that does not declare \
                     close support. {FRAMEWORK_ISSUE}"
                ),
            );
            return response;
        }

        let Some(private) = decode_private(&request.private, &mut response.diagnostics) else {
            return response;
        };

        let close_request = CloseRequest {
            private: private.provider,
        };
        let mut close_response = CloseResponse::default();
        ephemeral_resource
            .close(close_request, &mut close_response)
            .await;

        response.diagnostics.append(&mut close_response.diagnostics);

        if response.diagnostics.has_error() {
            warn!(
                diagnostics = response.diagnostics.len(),
                "CloseEphemeralResource completed with errors"
            );
        } else {
            info!("CloseEphemeralResource completed successfully");
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::super::test_support::{TestEphemeralResource, TestProvider};
    use super::*;
    use crate::ephemeral::EphemeralResourceCapabilities;
    use crate::schema::Schema;
    use crate::server::ConfigureProviderRequest;
    use crate::types::DeferredReason;

    fn server_with(ephemeral: TestEphemeralResource) -> Server {
        Server::new(Arc::new(TestProvider {
            ephemeral_resources: vec![ephemeral.constructor()],
            ..Default::default()
        }))
    }

    fn config(schema: &Schema, data: serde_json::Value) -> Value {
        Value::from_json(&schema.object_type(), &data).unwrap()
    }

    #[tokio::test]
    async fn test_open_returns_result_renewal_and_private_data() {
        let renew_at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let ephemeral = TestEphemeralResource {
            on_open: Some(Arc::new(move |request, response| {
                let mut entries = request.config.as_entries().unwrap().clone();
                entries.insert("id".to_string(), Value::string("tok-1"));
                response.result = Value::object(entries);
                response.renew_at = Some(renew_at);
                let diagnostics = response.private.set_key("lease", br#""l-1""#);
                assert!(diagnostics.is_empty());
            })),
            ..Default::default()
        };
        let user_config = config(&ephemeral.schema, json!({ "name": "token", "id": null }));
        let server = server_with(ephemeral);

        let response = server
            .open_ephemeral_resource(Some(OpenEphemeralResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                config: Some(user_config),
                ..Default::default()
            }))
            .await;

        assert!(!response.diagnostics.has_error());
        let result = response.result.unwrap();
        assert_eq!(
            result.as_entries().unwrap()["id"].as_string(),
            Some("tok-1")
        );
        assert_eq!(response.renew_at, Some(renew_at));
        let (decoded, _) = PrivateData::from_bytes(&response.private.unwrap());
        let decoded = decoded.unwrap();
        let (value, _) = decoded.provider.get_key("lease");
        assert_eq!(value, Some(&br#""l-1""#[..]));
    }

    #[tokio::test]
    async fn test_open_short_circuits_on_provider_deferral() {
        let ephemeral = TestEphemeralResource {
            on_open: Some(Arc::new(|_, _| {
                panic!("open must not run while the provider is deferred");
            })),
            ..Default::default()
        };
        let server = Server::new(Arc::new(TestProvider {
            ephemeral_resources: vec![ephemeral.constructor()],
            on_configure: Some(Arc::new(|_, response| {
                response.deferred = Some(Deferred::new(DeferredReason::ProviderConfigUnknown));
            })),
            ..Default::default()
        }));
        server
            .configure_provider(Some(ConfigureProviderRequest::default()))
            .await;

        let response = server
            .open_ephemeral_resource(Some(OpenEphemeralResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                client_capabilities: ClientCapabilities::deferral_allowed(),
                ..Default::default()
            }))
            .await;

        assert_eq!(
            response.deferred.map(|deferred| deferred.reason),
            Some(DeferredReason::ProviderConfigUnknown)
        );
        assert!(response.result.is_none());
    }

    #[tokio::test]
    async fn test_open_resource_deferral_passes_through() {
        let ephemeral = TestEphemeralResource {
            on_open: Some(Arc::new(|_, response| {
                response.deferred = Some(Deferred::new(DeferredReason::AbsentPrereq));
            })),
            ..Default::default()
        };
        let server = server_with(ephemeral);

        let response = server
            .open_ephemeral_resource(Some(OpenEphemeralResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                ..Default::default()
            }))
            .await;

        assert_eq!(
            response.deferred.map(|deferred| deferred.reason),
            Some(DeferredReason::AbsentPrereq)
        );
    }

    #[tokio::test]
    async fn test_close_hands_the_provider_its_private_data() {
        let ephemeral = TestEphemeralResource {
            capabilities: EphemeralResourceCapabilities {
                close: true,
                ..Default::default()
            },
            on_close: Some(Arc::new(|request, response| {
                let (value, _) = request.private.get_key("lease");
                if value != Some(&br#""l-1""#[..]) {
                    response
                        .diagnostics
                        .add_error("Wrong Lease", "The close request lost the lease key.");
                }
            })),
            ..Default::default()
        };
        let server = server_with(ephemeral);

        let mut private = PrivateData::new();
        let diagnostics = private.provider.set_key("lease", br#""l-1""#);
        assert!(diagnostics.is_empty());
        let mut encode_diagnostics = Diagnostics::new();
        let blob = encode_private(&private, &mut encode_diagnostics).unwrap();
        assert!(encode_diagnostics.is_empty());

        let response = server
            .close_ephemeral_resource(Some(CloseEphemeralResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                private: blob,
            }))
            .await;

        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_close_without_close_support_is_rejected() {
        let ephemeral = TestEphemeralResource {
            on_close: Some(Arc::new(|_, _| {
                panic!("close must not run without declared close support");
            })),
            ..Default::default()
        };
        let server = server_with(ephemeral);

        let response = server
            .close_ephemeral_resource(Some(CloseEphemeralResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                ..Default::default()
            }))
            .await;

        assert_eq!(
            response.diagnostics[0].summary,
            "Ephemeral Resource Close Not Implemented"
        );
    }

    #[tokio::test]
    async fn test_close_diagnostics_flow_through() {
        let ephemeral = TestEphemeralResource {
            capabilities: EphemeralResourceCapabilities {
                close: true,
                ..Default::default()
            },
            on_close: Some(Arc::new(|_, response| {
                response
                    .diagnostics
                    .add_error("Revoke Failed", "The lease could not be revoked.");
            })),
            ..Default::default()
        };
        let server = server_with(ephemeral);

        let response = server
            .close_ephemeral_resource(Some(CloseEphemeralResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                ..Default::default()
            }))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Revoke Failed");
    }
}
