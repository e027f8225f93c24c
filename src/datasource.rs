//! The data source trait and its operation types.
//!
//! A data source reads information from an external system without managing
//! its lifecycle. It declares a type name and a [`Schema`], and implements a
//! single read operation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::diagnostics::Diagnostics;
use crate::provider::{ConfigureRequest, ConfigureResponse};
use crate::schema::Schema;
use crate::types::{ClientCapabilities, Deferred};
use crate::validation::{ConfigValidator, ValidateConfigRequest, ValidateConfigResponse};
use crate::value::Value;

/// Constructs a fresh data source instance, once per operation.
pub type DataSourceConstructor = Arc<dyn Fn() -> Box<dyn DataSource> + Send + Sync>;

/// Optional hooks a data source declares beyond reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataSourceCapabilities {
    /// The data source wants provider data injected before reads run.
    pub configure: bool,
}

/// Request for a data source's metadata.
#[derive(Debug, Clone)]
pub struct DataSourceMetadataRequest {
    /// The provider's type name, conventionally used as the prefix of the
    /// data source type name.
    pub provider_type_name: String,
}

/// A data source's declared metadata.
#[derive(Debug, Clone, Default)]
pub struct DataSourceMetadataResponse {
    /// The data source type name, for example `examplecloud_image`.
    pub type_name: String,
}

/// Request to read a data source.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    /// The configuration the user wrote.
    pub config: Value,
    /// Auxiliary provider-defined configuration, when the host sent one.
    pub provider_meta: Option<Value>,
    /// Capabilities the host declared for this call.
    pub client_capabilities: ClientCapabilities,
}

/// Response from reading a data source.
#[derive(Debug)]
pub struct ReadResponse {
    /// The data read. Starts as the configuration so computed attributes
    /// can be filled in place.
    pub state: Value,
    /// Set to defer this operation instead of completing it.
    pub deferred: Option<Deferred>,
    /// Diagnostics reported by the operation.
    pub diagnostics: Diagnostics,
}

/// A data source implementation.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The data source's type name.
    fn metadata(&self, request: &DataSourceMetadataRequest) -> DataSourceMetadataResponse;

    /// The schema describing this data source's data.
    fn schema(&self) -> Schema;

    /// Optional hooks this data source declares.
    fn capabilities(&self) -> DataSourceCapabilities {
        DataSourceCapabilities::default()
    }

    /// Validators to run against this data source's configuration.
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

    /// Receive provider data before a read. Only called when
    /// [`DataSourceCapabilities::configure`] is set.
    async fn configure(&mut self, request: &ConfigureRequest, response: &mut ConfigureResponse) {
        let _ = (request, response);
    }

    /// Read the data this source describes.
    async fn read(&self, request: ReadRequest, response: &mut ReadResponse);
}
