//! Configurable fixture implementations for dispatch tests.
//!
//! Each fixture exposes its hooks as plain function fields so a test
//! declares only the behavior it cares about and leaves the rest
//! defaulted. Constructors clone the fixture per instantiation, matching
//! the fresh-instance-per-operation contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::datasource::{
    DataSource, DataSourceCapabilities, DataSourceConstructor, DataSourceMetadataRequest,
    DataSourceMetadataResponse, ReadRequest as DataSourceReadRequest,
    ReadResponse as DataSourceReadResponse,
};
use crate::ephemeral::{
    CloseRequest, CloseResponse, EphemeralResource, EphemeralResourceCapabilities,
    EphemeralResourceConstructor, EphemeralResourceMetadataRequest,
    EphemeralResourceMetadataResponse, OpenRequest, OpenResponse,
};
use crate::list::{
    ListRequest, ListResource, ListResourceCapabilities, ListResourceConstructor,
    ListResourceMetadataRequest, ListResourceMetadataResponse, ListResult, ListResultsStream,
};
use crate::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, ConfigureRequest, ConfigureResponse,
    Provider, ProviderCapabilities, ProviderMetadataResponse,
};
use crate::resource::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest,
    ImportStateResponse, MoveStateRequest, MoveStateResponse, ReadRequest, ReadResponse, Resource,
    ResourceBehavior, ResourceCapabilities, ResourceConstructor, ResourceMetadataRequest,
    ResourceMetadataResponse, StateMover, UpdateRequest, UpdateResponse,
};
use crate::schema::{Attribute, IdentitySchema, Schema};
use crate::statestore::{
    StateStore, StateStoreConstructor, StateStoreMetadataRequest, StateStoreMetadataResponse,
};
use crate::validation::{ConfigValidator, ValidateConfigRequest, ValidateConfigResponse};

pub(crate) type ValidateHook =
    Arc<dyn Fn(&ValidateConfigRequest, &mut ValidateConfigResponse) + Send + Sync>;
pub(crate) type ConfigureHook =
    Arc<dyn Fn(&ConfigureRequest, &mut ConfigureResponse) + Send + Sync>;
pub(crate) type ConfigureProviderHook =
    Arc<dyn Fn(ConfigureProviderRequest, &mut ConfigureProviderResponse) + Send + Sync>;
pub(crate) type CreateHook = Arc<dyn Fn(CreateRequest, &mut CreateResponse) + Send + Sync>;
pub(crate) type ReadHook = Arc<dyn Fn(ReadRequest, &mut ReadResponse) + Send + Sync>;
pub(crate) type UpdateHook = Arc<dyn Fn(UpdateRequest, &mut UpdateResponse) + Send + Sync>;
pub(crate) type DeleteHook = Arc<dyn Fn(DeleteRequest, &mut DeleteResponse) + Send + Sync>;
pub(crate) type ImportHook =
    Arc<dyn Fn(ImportStateRequest, &mut ImportStateResponse) + Send + Sync>;
pub(crate) type MoveHook = Arc<dyn Fn(MoveStateRequest, &mut MoveStateResponse) + Send + Sync>;
pub(crate) type DataSourceReadHook =
    Arc<dyn Fn(DataSourceReadRequest, &mut DataSourceReadResponse) + Send + Sync>;
pub(crate) type OpenHook = Arc<dyn Fn(OpenRequest, &mut OpenResponse) + Send + Sync>;
pub(crate) type CloseHook = Arc<dyn Fn(CloseRequest, &mut CloseResponse) + Send + Sync>;
pub(crate) type ListResultsHook = Arc<dyn Fn(&ListRequest) -> Vec<ListResult> + Send + Sync>;

fn default_schema() -> Schema {
    Schema::v0()
        .with_attribute("name", Attribute::required_string())
        .with_attribute("id", Attribute::computed_string())
}

/// A provider fixture declaring whatever object kinds a test registers.
#[derive(Clone)]
pub(crate) struct TestProvider {
    pub(crate) type_name: String,
    pub(crate) schema: Schema,
    pub(crate) capabilities: ProviderCapabilities,
    pub(crate) resources: Vec<ResourceConstructor>,
    pub(crate) data_sources: Vec<DataSourceConstructor>,
    pub(crate) ephemeral_resources: Vec<EphemeralResourceConstructor>,
    pub(crate) list_resources: Vec<ListResourceConstructor>,
    pub(crate) state_stores: Vec<StateStoreConstructor>,
    pub(crate) raw_list_schemas: Vec<(String, Schema)>,
    pub(crate) config_validators: Vec<Arc<dyn ConfigValidator>>,
    pub(crate) on_validate_config: Option<ValidateHook>,
    pub(crate) on_configure: Option<ConfigureProviderHook>,
}

impl Default for TestProvider {
    fn default() -> Self {
        Self {
            type_name: "examplecloud".to_string(),
            schema: Schema::v0(),
            capabilities: ProviderCapabilities::default(),
            resources: Vec::new(),
            data_sources: Vec::new(),
            ephemeral_resources: Vec::new(),
            list_resources: Vec::new(),
            state_stores: Vec::new(),
            raw_list_schemas: Vec::new(),
            config_validators: Vec::new(),
            on_validate_config: None,
            on_configure: None,
        }
    }
}

#[async_trait]
impl Provider for TestProvider {
    fn metadata(&self) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name.clone(),
        }
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    fn resources(&self) -> Vec<ResourceConstructor> {
        self.resources.clone()
    }

    fn data_sources(&self) -> Vec<DataSourceConstructor> {
        self.data_sources.clone()
    }

    fn ephemeral_resources(&self) -> Vec<EphemeralResourceConstructor> {
        self.ephemeral_resources.clone()
    }

    fn list_resources(&self) -> Vec<ListResourceConstructor> {
        self.list_resources.clone()
    }

    fn state_stores(&self) -> Vec<StateStoreConstructor> {
        self.state_stores.clone()
    }

    fn raw_list_schemas(&self) -> Vec<(String, Schema)> {
        self.raw_list_schemas.clone()
    }

    fn config_validators(&self) -> Vec<Arc<dyn ConfigValidator>> {
        self.config_validators.clone()
    }

    async fn validate_config(
        &self,
        request: &ValidateConfigRequest,
        response: &mut ValidateConfigResponse,
    ) {
        if let Some(hook) = &self.on_validate_config {
            hook(request, response);
        }
    }

    async fn configure(
        &self,
        request: ConfigureProviderRequest,
        response: &mut ConfigureProviderResponse,
    ) {
        if let Some(hook) = &self.on_configure {
            hook(request, response);
        }
    }
}

/// A managed resource fixture. The default schema declares a required
/// `name` and a computed `id`.
#[derive(Clone)]
pub(crate) struct TestResource {
    pub(crate) type_name: String,
    pub(crate) schema: Schema,
    pub(crate) identity_schema: Option<IdentitySchema>,
    pub(crate) behavior: ResourceBehavior,
    pub(crate) capabilities: ResourceCapabilities,
    pub(crate) state_movers: Vec<Arc<dyn StateMover>>,
    pub(crate) config_validators: Vec<Arc<dyn ConfigValidator>>,
    pub(crate) on_validate_config: Option<ValidateHook>,
    pub(crate) on_configure: Option<ConfigureHook>,
    pub(crate) on_create: Option<CreateHook>,
    pub(crate) on_read: Option<ReadHook>,
    pub(crate) on_update: Option<UpdateHook>,
    pub(crate) on_delete: Option<DeleteHook>,
    pub(crate) on_import: Option<ImportHook>,
}

impl Default for TestResource {
    fn default() -> Self {
        Self {
            type_name: "examplecloud_thing".to_string(),
            schema: default_schema(),
            identity_schema: None,
            behavior: ResourceBehavior::default(),
            capabilities: ResourceCapabilities::default(),
            state_movers: Vec::new(),
            config_validators: Vec::new(),
            on_validate_config: None,
            on_configure: None,
            on_create: None,
            on_read: None,
            on_update: None,
            on_delete: None,
            on_import: None,
        }
    }
}

impl TestResource {
    pub(crate) fn constructor(self) -> ResourceConstructor {
        Arc::new(move || Box::new(self.clone()))
    }
}

#[async_trait]
impl Resource for TestResource {
    fn metadata(&self, _request: &ResourceMetadataRequest) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name.clone(),
            behavior: self.behavior,
        }
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn capabilities(&self) -> ResourceCapabilities {
        self.capabilities
    }

    fn identity_schema(&self) -> Option<IdentitySchema> {
        self.identity_schema.clone()
    }

    fn state_movers(&self) -> Vec<Arc<dyn StateMover>> {
        self.state_movers.clone()
    }

    fn config_validators(&self) -> Vec<Arc<dyn ConfigValidator>> {
        self.config_validators.clone()
    }

    async fn validate_config(
        &self,
        request: &ValidateConfigRequest,
        response: &mut ValidateConfigResponse,
    ) {
        if let Some(hook) = &self.on_validate_config {
            hook(request, response);
        }
    }

    async fn configure(&mut self, request: &ConfigureRequest, response: &mut ConfigureResponse) {
        if let Some(hook) = &self.on_configure {
            hook(request, response);
        }
    }

    async fn create(&self, request: CreateRequest, response: &mut CreateResponse) {
        if let Some(hook) = &self.on_create {
            hook(request, response);
        }
    }

    async fn read(&self, request: ReadRequest, response: &mut ReadResponse) {
        if let Some(hook) = &self.on_read {
            hook(request, response);
        }
    }

    async fn update(&self, request: UpdateRequest, response: &mut UpdateResponse) {
        if let Some(hook) = &self.on_update {
            hook(request, response);
        }
    }

    async fn delete(&self, request: DeleteRequest, response: &mut DeleteResponse) {
        if let Some(hook) = &self.on_delete {
            hook(request, response);
        }
    }

    async fn import_state(&self, request: ImportStateRequest, response: &mut ImportStateResponse) {
        if let Some(hook) = &self.on_import {
            hook(request, response);
        }
    }
}

/// A state mover fixture.
#[derive(Clone, Default)]
pub(crate) struct TestStateMover {
    pub(crate) source_schema: Option<Schema>,
    pub(crate) on_move: Option<MoveHook>,
}

#[async_trait]
impl StateMover for TestStateMover {
    fn source_schema(&self) -> Option<Schema> {
        self.source_schema.clone()
    }

    async fn move_state(&self, request: MoveStateRequest, response: &mut MoveStateResponse) {
        if let Some(hook) = &self.on_move {
            hook(request, response);
        }
    }
}

/// A data source fixture. The default schema declares a required `name`
/// and a computed `id`.
#[derive(Clone)]
pub(crate) struct TestDataSource {
    pub(crate) type_name: String,
    pub(crate) schema: Schema,
    pub(crate) capabilities: DataSourceCapabilities,
    pub(crate) config_validators: Vec<Arc<dyn ConfigValidator>>,
    pub(crate) on_validate_config: Option<ValidateHook>,
    pub(crate) on_configure: Option<ConfigureHook>,
    pub(crate) on_read: Option<DataSourceReadHook>,
}

impl Default for TestDataSource {
    fn default() -> Self {
        Self {
            type_name: "examplecloud_thing".to_string(),
            schema: default_schema(),
            capabilities: DataSourceCapabilities::default(),
            config_validators: Vec::new(),
            on_validate_config: None,
            on_configure: None,
            on_read: None,
        }
    }
}

impl TestDataSource {
    pub(crate) fn constructor(self) -> DataSourceConstructor {
        Arc::new(move || Box::new(self.clone()))
    }
}

#[async_trait]
impl DataSource for TestDataSource {
    fn metadata(&self, _request: &DataSourceMetadataRequest) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name.clone(),
        }
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn capabilities(&self) -> DataSourceCapabilities {
        self.capabilities
    }

    fn config_validators(&self) -> Vec<Arc<dyn ConfigValidator>> {
        self.config_validators.clone()
    }

    async fn validate_config(
        &self,
        request: &ValidateConfigRequest,
        response: &mut ValidateConfigResponse,
    ) {
        if let Some(hook) = &self.on_validate_config {
            hook(request, response);
        }
    }

    async fn configure(&mut self, request: &ConfigureRequest, response: &mut ConfigureResponse) {
        if let Some(hook) = &self.on_configure {
            hook(request, response);
        }
    }

    async fn read(&self, request: DataSourceReadRequest, response: &mut DataSourceReadResponse) {
        if let Some(hook) = &self.on_read {
            hook(request, response);
        }
    }
}

/// An ephemeral resource fixture.
#[derive(Clone)]
pub(crate) struct TestEphemeralResource {
    pub(crate) type_name: String,
    pub(crate) schema: Schema,
    pub(crate) capabilities: EphemeralResourceCapabilities,
    pub(crate) config_validators: Vec<Arc<dyn ConfigValidator>>,
    pub(crate) on_validate_config: Option<ValidateHook>,
    pub(crate) on_configure: Option<ConfigureHook>,
    pub(crate) on_open: Option<OpenHook>,
    pub(crate) on_close: Option<CloseHook>,
}

impl Default for TestEphemeralResource {
    fn default() -> Self {
        Self {
            type_name: "examplecloud_thing".to_string(),
            schema: default_schema(),
            capabilities: EphemeralResourceCapabilities::default(),
            config_validators: Vec::new(),
            on_validate_config: None,
            on_configure: None,
            on_open: None,
            on_close: None,
        }
    }
}

impl TestEphemeralResource {
    pub(crate) fn constructor(self) -> EphemeralResourceConstructor {
        Arc::new(move || Box::new(self.clone()))
    }
}

#[async_trait]
impl EphemeralResource for TestEphemeralResource {
    fn metadata(
        &self,
        _request: &EphemeralResourceMetadataRequest,
    ) -> EphemeralResourceMetadataResponse {
        EphemeralResourceMetadataResponse {
            type_name: self.type_name.clone(),
        }
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn capabilities(&self) -> EphemeralResourceCapabilities {
        self.capabilities
    }

    fn config_validators(&self) -> Vec<Arc<dyn ConfigValidator>> {
        self.config_validators.clone()
    }

    async fn validate_config(
        &self,
        request: &ValidateConfigRequest,
        response: &mut ValidateConfigResponse,
    ) {
        if let Some(hook) = &self.on_validate_config {
            hook(request, response);
        }
    }

    async fn configure(&mut self, request: &ConfigureRequest, response: &mut ConfigureResponse) {
        if let Some(hook) = &self.on_configure {
            hook(request, response);
        }
    }

    async fn open(&self, request: OpenRequest, response: &mut OpenResponse) {
        if let Some(hook) = &self.on_open {
            hook(request, response);
        }
    }

    async fn close(&self, request: CloseRequest, response: &mut CloseResponse) {
        if let Some(hook) = &self.on_close {
            hook(request, response);
        }
    }
}

/// A list resource fixture producing a fixed result set per request.
#[derive(Clone)]
pub(crate) struct TestListResource {
    pub(crate) type_name: String,
    pub(crate) schema: Schema,
    pub(crate) capabilities: ListResourceCapabilities,
    pub(crate) config_validators: Vec<Arc<dyn ConfigValidator>>,
    pub(crate) on_validate_config: Option<ValidateHook>,
    pub(crate) on_configure: Option<ConfigureHook>,
    pub(crate) results: Option<ListResultsHook>,
}

impl Default for TestListResource {
    fn default() -> Self {
        Self {
            type_name: "examplecloud_thing".to_string(),
            schema: default_schema(),
            capabilities: ListResourceCapabilities::default(),
            config_validators: Vec::new(),
            on_validate_config: None,
            on_configure: None,
            results: None,
        }
    }
}

impl TestListResource {
    pub(crate) fn constructor(self) -> ListResourceConstructor {
        Arc::new(move || Box::new(self.clone()))
    }
}

#[async_trait]
impl ListResource for TestListResource {
    fn metadata(&self, _request: &ListResourceMetadataRequest) -> ListResourceMetadataResponse {
        ListResourceMetadataResponse {
            type_name: self.type_name.clone(),
        }
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn capabilities(&self) -> ListResourceCapabilities {
        self.capabilities
    }

    fn config_validators(&self) -> Vec<Arc<dyn ConfigValidator>> {
        self.config_validators.clone()
    }

    async fn validate_config(
        &self,
        request: &ValidateConfigRequest,
        response: &mut ValidateConfigResponse,
    ) {
        if let Some(hook) = &self.on_validate_config {
            hook(request, response);
        }
    }

    async fn configure(&mut self, request: &ConfigureRequest, response: &mut ConfigureResponse) {
        if let Some(hook) = &self.on_configure {
            hook(request, response);
        }
    }

    async fn list(&self, request: ListRequest, stream: &ListResultsStream) {
        if let Some(results) = &self.results {
            for result in results(&request) {
                if !stream.push(result).await {
                    return;
                }
            }
        }
    }
}

/// A state store fixture.
#[derive(Clone)]
pub(crate) struct TestStateStore {
    pub(crate) type_name: String,
    pub(crate) schema: Schema,
}

impl Default for TestStateStore {
    fn default() -> Self {
        Self {
            type_name: "examplecloud_store".to_string(),
            schema: Schema::v0(),
        }
    }
}

impl TestStateStore {
    pub(crate) fn constructor(self) -> StateStoreConstructor {
        Arc::new(move || Box::new(self.clone()))
    }
}

impl StateStore for TestStateStore {
    fn metadata(&self, _request: &StateStoreMetadataRequest) -> StateStoreMetadataResponse {
        StateStoreMetadataResponse {
            type_name: self.type_name.clone(),
        }
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }
}
