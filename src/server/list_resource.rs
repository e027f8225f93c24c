//! The ListResource operation.

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, instrument};

use crate::diagnostics::Diagnostics;
use crate::list::{ListRequest, ListResult, ListResultsStream};
use crate::server::{value_or_null, Server};
use crate::value::Value;

/// How many results may sit unconsumed before the producing task pauses.
const RESULT_BUFFER: usize = 16;

/// Host request to enumerate instances of a resource type.
#[derive(Debug, Clone, Default)]
pub struct ListResourceRequest {
    /// The list resource type to enumerate.
    pub type_name: String,
    /// The list configuration the user wrote, shaped by the list resource's
    /// own schema. Absent configuration defaults to a null value of the
    /// schema type.
    pub config: Option<Value>,
    /// Whether each result should carry full resource data, not just the
    /// identity.
    pub include_resource: bool,
    /// The maximum number of results the host will consume.
    pub limit: i64,
}

/// Host response from a list operation.
#[derive(Debug)]
pub struct ListResourceResponse {
    /// The stream of results. Closed without results when the operation
    /// could not start; the diagnostics say why.
    pub results: ReceiverStream<ListResult>,
    /// Diagnostics reported before streaming started. Problems with
    /// individual instances travel on the results themselves.
    pub diagnostics: Diagnostics,
}

impl Default for ListResourceResponse {
    fn default() -> Self {
        let (_sender, receiver) = mpsc::channel(1);
        Self {
            results: ReceiverStream::new(receiver),
            diagnostics: Diagnostics::new(),
        }
    }
}

impl Server {
    /// Enumerate instances of a managed resource type, streaming results as
    /// the provider finds them.
    ///
    /// The response is returned as soon as the producing task is spawned;
    /// results arrive on the stream while the provider works. Dropping the
    /// stream stops the producer at its next push.
    #[instrument(skip(self, request))]
    pub async fn list_resource(
        &self,
        request: Option<ListResourceRequest>,
    ) -> ListResourceResponse {
        let mut response = ListResourceResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(type_name = %request.type_name, "ListResource called");

        let Some(list_resource) = self
            .configured_list_resource(&request.type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        let schema = list_resource.schema();
        let config = value_or_null(request.config, schema.object_type());

        let (sender, receiver) = mpsc::channel(RESULT_BUFFER);
        let stream = ListResultsStream::new(sender, request.include_resource);
        let list_request = ListRequest {
            config,
            include_resource: request.include_resource,
            limit: request.limit,
        };
        tokio::spawn(async move {
            list_resource.list(list_request, &stream).await;
        });

        response.results = ReceiverStream::new(receiver);
        info!("ListResource streaming results");
        response
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_stream::StreamExt;

    use super::super::test_support::{TestListResource, TestProvider, TestResource};
    use super::*;

    fn result(display_name: &str) -> ListResult {
        ListResult {
            display_name: display_name.to_string(),
            identity: Some(Value::object(
                [("id".to_string(), Value::string(display_name))].into(),
            )),
            ..Default::default()
        }
    }

    fn server_with(list: TestListResource) -> Server {
        Server::new(Arc::new(TestProvider {
            resources: vec![TestResource::default().constructor()],
            list_resources: vec![list.constructor()],
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn test_list_streams_results_in_order() {
        let list = TestListResource {
            results: Some(Arc::new(|_| vec![result("alpha"), result("beta")])),
            ..Default::default()
        };
        let server = server_with(list);

        let response = server
            .list_resource(Some(ListResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                ..Default::default()
            }))
            .await;

        assert!(response.diagnostics.is_empty());
        let results: Vec<ListResult> = response.results.collect().await;
        let names: Vec<&str> = results
            .iter()
            .map(|result| result.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert!(results.iter().all(|result| result.diagnostics.is_empty()));
    }

    #[tokio::test]
    async fn test_list_with_zero_results_is_success() {
        let list = TestListResource {
            results: Some(Arc::new(|_| Vec::new())),
            ..Default::default()
        };
        let server = server_with(list);

        let response = server
            .list_resource(Some(ListResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                ..Default::default()
            }))
            .await;

        assert!(response.diagnostics.is_empty());
        let results: Vec<ListResult> = response.results.collect().await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_list_unknown_type_reports_not_found_with_a_closed_stream() {
        let server = Server::new(Arc::new(TestProvider::default()));

        let response = server
            .list_resource(Some(ListResourceRequest {
                type_name: "examplecloud_missing".to_string(),
                ..Default::default()
            }))
            .await;

        assert_eq!(
            response.diagnostics[0].summary,
            "List Resource Type Not Found"
        );
        let results: Vec<ListResult> = response.results.collect().await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_list_incomplete_results_are_flagged_in_stream() {
        let list = TestListResource {
            results: Some(Arc::new(|_| {
                vec![ListResult {
                    display_name: "nameless".to_string(),
                    ..Default::default()
                }]
            })),
            ..Default::default()
        };
        let server = server_with(list);

        let response = server
            .list_resource(Some(ListResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                ..Default::default()
            }))
            .await;

        assert!(response.diagnostics.is_empty());
        let results: Vec<ListResult> = response.results.collect().await;
        assert!(results[0].diagnostics.has_error());
        assert_eq!(results[0].diagnostics[0].summary, "Incomplete List Result");
    }

    #[tokio::test]
    async fn test_list_request_carries_the_host_flags() {
        let list = TestListResource {
            results: Some(Arc::new(|request| {
                assert!(request.include_resource);
                assert_eq!(request.limit, 25);
                assert!(request.config.is_null());
                Vec::new()
            })),
            ..Default::default()
        };
        let server = server_with(list);

        let response = server
            .list_resource(Some(ListResourceRequest {
                type_name: "examplecloud_thing".to_string(),
                include_resource: true,
                limit: 25,
                ..Default::default()
            }))
            .await;

        let results: Vec<ListResult> = response.results.collect().await;
        assert!(results.is_empty());
    }
}
