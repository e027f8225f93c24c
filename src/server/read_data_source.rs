//! The ReadDataSource operation.

use tracing::{debug, info, instrument, warn};

use crate::datasource::{ReadRequest, ReadResponse};
use crate::diagnostics::Diagnostics;
use crate::server::{value_or_null, Server};
use crate::types::{ClientCapabilities, Deferred};
use crate::value::Value;

/// Host request to read a data source.
#[derive(Debug, Clone, Default)]
pub struct ReadDataSourceRequest {
    /// The data source type to read.
    pub type_name: String,
    /// The configuration the user wrote. Absent configuration defaults to a
    /// null value of the schema type.
    pub config: Option<Value>,
    /// Auxiliary provider-defined configuration, when the host sent one.
    pub provider_meta: Option<Value>,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Host response from reading a data source.
#[derive(Debug, Default)]
pub struct ReadDataSourceResponse {
    /// The data read, shaped by the data source schema.
    pub state: Option<Value>,
    /// Set when the operation was deferred instead of completed.
    pub deferred: Option<Deferred>,
    /// Diagnostics reported while reading.
    pub diagnostics: Diagnostics,
}

impl Server {
    /// Read a data source.
    ///
    /// The read starts from the user's configuration; the data source fills
    /// in computed attributes and returns the whole object.
    #[instrument(skip(self, request))]
    pub async fn read_data_source(
        &self,
        request: Option<ReadDataSourceRequest>,
    ) -> ReadDataSourceResponse {
        let mut response = ReadDataSourceResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(type_name = %request.type_name, "ReadDataSource called");

        let Some(data_source) = self
            .configured_data_source(&request.type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        let schema = data_source.schema();
        let config = value_or_null(request.config, schema.object_type());

        if let Some(deferred) = self.provider_deferral(request.client_capabilities) {
            debug!(reason = %deferred.reason, "ReadDataSource deferred");
            response.state = Some(config);
            response.deferred = Some(deferred);
            return response;
        }

        let read_request = ReadRequest {
            config: config.clone(),
            provider_meta: request.provider_meta,
            client_capabilities: request.client_capabilities,
        };
        let mut read_response = ReadResponse {
            state: config,
            deferred: None,
            diagnostics: Diagnostics::new(),
        };
        data_source.read(read_request, &mut read_response).await;

        response.diagnostics.append(&mut read_response.diagnostics);
        response.state = Some(read_response.state);
        response.deferred = read_response.deferred;

        if response.diagnostics.has_error() {
            warn!(
                diagnostics = response.diagnostics.len(),
                "ReadDataSource completed with errors"
            );
        } else {
            info!("ReadDataSource completed successfully");
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::super::test_support::{TestDataSource, TestProvider};
    use super::*;
    use crate::schema::Schema;
    use crate::server::ConfigureProviderRequest;
    use crate::types::DeferredReason;

    fn server_with(data_source: TestDataSource) -> Server {
        Server::new(Arc::new(TestProvider {
            data_sources: vec![data_source.constructor()],
            ..Default::default()
        }))
    }

    fn config(schema: &Schema, data: serde_json::Value) -> Value {
        Value::from_json(&schema.object_type(), &data).unwrap()
    }

    #[tokio::test]
    async fn test_read_fills_computed_attributes() {
        let data_source = TestDataSource {
            on_read: Some(Arc::new(|request, response| {
                let mut entries = request.config.as_entries().unwrap().clone();
                entries.insert("id".to_string(), Value::string("img-1"));
                response.state = Value::object(entries);
            })),
            ..Default::default()
        };
        let user_config = config(&data_source.schema, json!({ "name": "debian", "id": null }));
        let server = server_with(data_source);

        let response = server
            .read_data_source(Some(ReadDataSourceRequest {
                type_name: "examplecloud_thing".to_string(),
                config: Some(user_config),
                ..Default::default()
            }))
            .await;

        assert!(!response.diagnostics.has_error());
        let state = response.state.unwrap();
        assert_eq!(state.as_entries().unwrap()["id"].as_string(), Some("img-1"));
    }

    #[tokio::test]
    async fn test_read_defaults_to_the_configuration_when_untouched() {
        let data_source = TestDataSource::default();
        let user_config = config(&data_source.schema, json!({ "name": "debian", "id": null }));
        let server = server_with(data_source);

        let response = server
            .read_data_source(Some(ReadDataSourceRequest {
                type_name: "examplecloud_thing".to_string(),
                config: Some(user_config.clone()),
                ..Default::default()
            }))
            .await;

        assert!(!response.diagnostics.has_error());
        assert_eq!(response.state, Some(user_config));
    }

    #[tokio::test]
    async fn test_read_unknown_type_reports_not_found() {
        let server = Server::new(Arc::new(TestProvider::default()));

        let response = server
            .read_data_source(Some(ReadDataSourceRequest {
                type_name: "examplecloud_missing".to_string(),
                ..Default::default()
            }))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Data Source Type Not Found");
        assert!(response.state.is_none());
    }

    #[tokio::test]
    async fn test_read_short_circuits_on_provider_deferral() {
        let data_source = TestDataSource {
            on_read: Some(Arc::new(|_, _| {
                panic!("read must not run while the provider is deferred");
            })),
            ..Default::default()
        };
        let user_config = config(&data_source.schema, json!({ "name": "debian", "id": null }));
        let server = Server::new(Arc::new(TestProvider {
            data_sources: vec![data_source.constructor()],
            on_configure: Some(Arc::new(|_, response| {
                response.deferred = Some(Deferred::new(DeferredReason::ProviderConfigUnknown));
            })),
            ..Default::default()
        }));
        server
            .configure_provider(Some(ConfigureProviderRequest::default()))
            .await;

        let response = server
            .read_data_source(Some(ReadDataSourceRequest {
                type_name: "examplecloud_thing".to_string(),
                config: Some(user_config.clone()),
                client_capabilities: ClientCapabilities::deferral_allowed(),
                ..Default::default()
            }))
            .await;

        assert_eq!(
            response.deferred.map(|deferred| deferred.reason),
            Some(DeferredReason::ProviderConfigUnknown)
        );
        assert_eq!(response.state, Some(user_config));
    }

    #[tokio::test]
    async fn test_read_data_source_deferral_passes_through() {
        let data_source = TestDataSource {
            on_read: Some(Arc::new(|_, response| {
                response.deferred = Some(Deferred::new(DeferredReason::AbsentPrereq));
            })),
            ..Default::default()
        };
        let server = server_with(data_source);

        let response = server
            .read_data_source(Some(ReadDataSourceRequest {
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
    async fn test_read_receives_provider_meta() {
        let data_source = TestDataSource {
            on_read: Some(Arc::new(|request, response| {
                if request.provider_meta.is_none() {
                    response
                        .diagnostics
                        .add_error("Missing Meta", "The provider meta was dropped.");
                }
            })),
            ..Default::default()
        };
        let server = server_with(data_source);

        let response = server
            .read_data_source(Some(ReadDataSourceRequest {
                type_name: "examplecloud_thing".to_string(),
                provider_meta: Some(Value::object(Default::default())),
                ..Default::default()
            }))
            .await;

        assert!(response.diagnostics.is_empty());
    }
}
