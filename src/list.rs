//! The list resource trait and its streaming result types.
//!
//! A list resource enumerates the instances of a managed resource type that
//! exist in the backing system, streaming one result per instance. Results
//! flow through a bounded channel so large listings never buffer fully in
//! memory.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::diagnostics::{Diagnostics, PROVIDER_ISSUE};
use crate::provider::{ConfigureRequest, ConfigureResponse};
use crate::schema::Schema;
use crate::validation::{ConfigValidator, ValidateConfigRequest, ValidateConfigResponse};
use crate::value::Value;

/// Constructs a fresh list resource instance, once per operation.
pub type ListResourceConstructor = Arc<dyn Fn() -> Box<dyn ListResource> + Send + Sync>;

/// Optional hooks a list resource declares beyond listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListResourceCapabilities {
    /// The list resource wants provider data injected before operations
    /// run.
    pub configure: bool,
}

/// Request for a list resource's metadata.
#[derive(Debug, Clone)]
pub struct ListResourceMetadataRequest {
    /// The provider's type name. A list resource must use the same type
    /// name as the managed resource type it enumerates.
    pub provider_type_name: String,
}

/// A list resource's declared metadata.
#[derive(Debug, Clone, Default)]
pub struct ListResourceMetadataResponse {
    /// The type name, matching the managed resource type being listed.
    pub type_name: String,
}

/// Request to list instances of a resource type.
#[derive(Debug, Clone)]
pub struct ListRequest {
    /// The list configuration the user wrote, shaped by the list resource's
    /// own schema.
    pub config: Value,
    /// Whether the host wants full resource data in each result, not just
    /// the identity.
    pub include_resource: bool,
    /// The maximum number of results the host will consume.
    pub limit: i64,
}

/// One instance found by a list operation.
#[derive(Debug, Clone, Default)]
pub struct ListResult {
    /// A human-readable name for the instance, shown by host tooling.
    pub display_name: String,
    /// The instance's resource data; expected when the request set
    /// `include_resource`.
    pub resource: Option<Value>,
    /// The instance's identity. Every result must carry one.
    pub identity: Option<Value>,
    /// Diagnostics scoped to this result.
    pub diagnostics: Diagnostics,
}

/// The sending side of a list operation's result stream.
///
/// Each pushed result is checked for completeness before it is forwarded:
/// a result without an identity gains an error diagnostic, and a result
/// without resource data gains a warning when the host asked for resource
/// data.
pub struct ListResultsStream {
    sender: mpsc::Sender<ListResult>,
    include_resource: bool,
}

impl ListResultsStream {
    pub(crate) fn new(sender: mpsc::Sender<ListResult>, include_resource: bool) -> Self {
        Self {
            sender,
            include_resource,
        }
    }

    /// Send one result to the host.
    ///
    /// Returns `false` when the host has stopped consuming results, at
    /// which point the operation should stop producing them.
    pub async fn push(&self, mut result: ListResult) -> bool {
        let has_identity = result
            .identity
            .as_ref()
            .is_some_and(|identity| !identity.is_null());
        if !has_identity {
            result.diagnostics.add_error(
                "Incomplete List Result",
                format!(
                    "The list result for \"{}\" is missing its resource identity. {PROVIDER_ISSUE}",
                    result.display_name
                ),
            );
        }

        let has_resource = result
            .resource
            .as_ref()
            .is_some_and(|resource| !resource.is_null());
        if self.include_resource && !has_resource {
            result.diagnostics.add_warning(
                "Incomplete List Result",
                format!(
                    "The list result for \"{}\" is missing resource data even though the host \
                     requested it. {PROVIDER_ISSUE}",
                    result.display_name
                ),
            );
        }

        self.sender.send(result).await.is_ok()
    }
}

/// A list resource implementation.
#[async_trait]
pub trait ListResource: Send + Sync {
    /// The list resource's type name.
    fn metadata(&self, request: &ListResourceMetadataRequest) -> ListResourceMetadataResponse;

    /// The schema describing this list resource's configuration.
    fn schema(&self) -> Schema;

    /// Optional hooks this list resource declares.
    fn capabilities(&self) -> ListResourceCapabilities {
        ListResourceCapabilities::default()
    }

    /// Validators to run against this list resource's configuration.
    fn config_validators(&self) -> Vec<Arc<dyn ConfigValidator>> {
        Vec::new()
    }

    /// Validate the configuration beyond what schema validation covers.
    async fn validate_config(
        &self,
        request: &ValidateConfigRequest,
        response: &mut ValidateConfigResponse,
    ) {
        let _ = (request, response);
    }

    /// Receive provider data before an operation. Only called when
    /// [`ListResourceCapabilities::configure`] is set.
    async fn configure(&mut self, request: &ConfigureRequest, response: &mut ConfigureResponse) {
        let _ = (request, response);
    }

    /// Enumerate instances, pushing one result per instance found. Zero
    /// results is a successful outcome.
    async fn list(&self, request: ListRequest, stream: &ListResultsStream);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;

    fn identity_value() -> Value {
        Value::object([("id".to_string(), Value::string("i-123"))].into())
    }

    fn resource_value() -> Value {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        Value::from_json(&schema.object_type(), &serde_json::json!({"name": "web"})).unwrap()
    }

    #[tokio::test]
    async fn test_push_forwards_complete_results_untouched() {
        let (sender, mut receiver) = mpsc::channel(4);
        let stream = ListResultsStream::new(sender, true);

        let pushed = stream
            .push(ListResult {
                display_name: "web".to_string(),
                resource: Some(resource_value()),
                identity: Some(identity_value()),
                diagnostics: Diagnostics::new(),
            })
            .await;

        assert!(pushed);
        let result = receiver.recv().await.unwrap();
        assert!(result.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_push_flags_missing_identity() {
        let (sender, mut receiver) = mpsc::channel(4);
        let stream = ListResultsStream::new(sender, false);

        stream
            .push(ListResult {
                display_name: "web".to_string(),
                ..Default::default()
            })
            .await;

        let result = receiver.recv().await.unwrap();
        assert!(result.diagnostics.has_error());
        assert_eq!(result.diagnostics[0].summary, "Incomplete List Result");
    }

    #[tokio::test]
    async fn test_push_warns_when_requested_resource_data_is_missing() {
        let (sender, mut receiver) = mpsc::channel(4);
        let stream = ListResultsStream::new(sender, true);

        stream
            .push(ListResult {
                display_name: "web".to_string(),
                identity: Some(identity_value()),
                ..Default::default()
            })
            .await;

        let result = receiver.recv().await.unwrap();
        assert_eq!(result.diagnostics.len(), 1);
        assert!(!result.diagnostics.has_error());
        assert_eq!(result.diagnostics[0].summary, "Incomplete List Result");
    }

    #[tokio::test]
    async fn test_push_reports_closed_receiver() {
        let (sender, receiver) = mpsc::channel(4);
        let stream = ListResultsStream::new(sender, false);
        drop(receiver);

        let pushed = stream
            .push(ListResult {
                display_name: "web".to_string(),
                identity: Some(identity_value()),
                ..Default::default()
            })
            .await;

        assert!(!pushed);
    }
}
