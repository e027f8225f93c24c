//! The dispatch server.
//!
//! [`Server`] wraps a [`Provider`](crate::provider::Provider) and exposes
//! one async entry point per host operation. It owns the per-kind
//! constructor registries and schema caches, injects configure data into
//! object instances, and normalizes every operation result before it
//! returns to the host. Handlers never return errors; problems surface as
//! [`Diagnostics`] on the response, and an absent request always yields an
//! empty response.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock, PoisonError, RwLock as StdRwLock};

use tokio::sync::{Mutex, RwLock};

use crate::datasource::{DataSource, DataSourceConstructor, DataSourceMetadataRequest};
use crate::diagnostics::{Diagnostics, PROVIDER_ISSUE};
use crate::ephemeral::{
    EphemeralResource, EphemeralResourceConstructor, EphemeralResourceMetadataRequest,
};
use crate::list::{ListResource, ListResourceConstructor, ListResourceMetadataRequest};
use crate::private::PrivateData;
use crate::provider::{ConfigureRequest, ConfigureResponse, Provider, ProviderData};
use crate::resource::{Resource, ResourceBehavior, ResourceConstructor, ResourceMetadataRequest};
use crate::schema::{IdentitySchema, Schema};
use crate::statestore::{StateStoreConstructor, StateStoreMetadataRequest};
use crate::types::{ClientCapabilities, Deferred};
use crate::validation::validate_definitions;
use crate::value::{AttributeType, Value};

mod configure_provider;
mod create_resource;
mod delete_resource;
mod ephemeral_resource;
mod import_resource_state;
mod list_resource;
mod move_resource_state;
mod read_data_source;
mod read_resource;
#[cfg(test)]
mod test_support;
mod update_resource;
mod validate_config;

pub use configure_provider::{ConfigureProviderRequest, ConfigureProviderResponse};
pub use create_resource::{CreateResourceRequest, CreateResourceResponse};
pub use delete_resource::{DeleteResourceRequest, DeleteResourceResponse};
pub use ephemeral_resource::{
    CloseEphemeralResourceRequest, CloseEphemeralResourceResponse, OpenEphemeralResourceRequest,
    OpenEphemeralResourceResponse,
};
pub use import_resource_state::{ImportResourceStateRequest, ImportResourceStateResponse};
pub use list_resource::{ListResourceRequest, ListResourceResponse};
pub use move_resource_state::{MoveResourceStateRequest, MoveResourceStateResponse};
pub use read_data_source::{ReadDataSourceRequest, ReadDataSourceResponse};
pub use read_resource::{ReadResourceRequest, ReadResourceResponse};
pub use update_resource::{UpdateResourceRequest, UpdateResourceResponse};
pub use validate_config::{
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
    ValidateEphemeralResourceConfigRequest, ValidateEphemeralResourceConfigResponse,
    ValidateListResourceConfigRequest, ValidateListResourceConfigResponse,
    ValidateProviderConfigRequest, ValidateProviderConfigResponse, ValidateResourceConfigRequest,
    ValidateResourceConfigResponse,
};

/// A registry cache computed on first use. The diagnostics produced while
/// building are replayed to every caller.
struct LazyInit<T> {
    cell: Mutex<Option<(T, Diagnostics)>>,
}

impl<T: Clone> LazyInit<T> {
    fn new() -> Self {
        Self {
            cell: Mutex::new(None),
        }
    }

    async fn get_or_init(&self, init: impl FnOnce() -> (T, Diagnostics)) -> (T, Diagnostics) {
        let mut guard = self.cell.lock().await;
        let (value, diagnostics) = guard.get_or_insert_with(init);
        (value.clone(), diagnostics.clone())
    }
}

/// A registered managed resource type.
#[derive(Clone)]
pub(crate) struct ResourceEntry {
    pub(crate) constructor: ResourceConstructor,
    pub(crate) behavior: ResourceBehavior,
}

/// Per-kind data produced by ConfigureProvider, injected into later
/// instances, plus any provider-level deferral.
#[derive(Default)]
pub(crate) struct ConfigureState {
    pub(crate) resource_data: Option<ProviderData>,
    pub(crate) data_source_data: Option<ProviderData>,
    pub(crate) ephemeral_resource_data: Option<ProviderData>,
    pub(crate) list_resource_data: Option<ProviderData>,
    pub(crate) state_store_data: Option<ProviderData>,
    pub(crate) deferred: Option<Deferred>,
}

/// The provider-side dispatch server.
///
/// One server instance serves one provider for the lifetime of the plugin
/// process. Registries and schema caches populate lazily on first use and
/// are safe to hit from concurrent operations.
pub struct Server {
    provider: Arc<dyn Provider>,
    provider_type_name: OnceLock<String>,
    provider_schema: OnceLock<Schema>,
    resources: LazyInit<BTreeMap<String, ResourceEntry>>,
    data_sources: LazyInit<BTreeMap<String, DataSourceConstructor>>,
    ephemeral_resources: LazyInit<BTreeMap<String, EphemeralResourceConstructor>>,
    list_resources: LazyInit<BTreeMap<String, ListResourceConstructor>>,
    state_stores: LazyInit<BTreeMap<String, StateStoreConstructor>>,
    resource_schemas: RwLock<BTreeMap<String, Schema>>,
    resource_identity_schemas: RwLock<BTreeMap<String, Option<IdentitySchema>>>,
    data_source_schemas: RwLock<BTreeMap<String, Schema>>,
    ephemeral_resource_schemas: RwLock<BTreeMap<String, Schema>>,
    list_resource_schemas: RwLock<BTreeMap<String, Schema>>,
    state_store_schemas: RwLock<BTreeMap<String, Schema>>,
    configure_state: StdRwLock<ConfigureState>,
}

impl Server {
    /// Create a dispatch server for the given provider.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            provider_type_name: OnceLock::new(),
            provider_schema: OnceLock::new(),
            resources: LazyInit::new(),
            data_sources: LazyInit::new(),
            ephemeral_resources: LazyInit::new(),
            list_resources: LazyInit::new(),
            state_stores: LazyInit::new(),
            resource_schemas: RwLock::new(BTreeMap::new()),
            resource_identity_schemas: RwLock::new(BTreeMap::new()),
            data_source_schemas: RwLock::new(BTreeMap::new()),
            ephemeral_resource_schemas: RwLock::new(BTreeMap::new()),
            list_resource_schemas: RwLock::new(BTreeMap::new()),
            state_store_schemas: RwLock::new(BTreeMap::new()),
            configure_state: StdRwLock::new(ConfigureState::default()),
        }
    }

    /// The provider's declared type name.
    pub fn provider_type_name(&self) -> String {
        self.provider_type_name
            .get_or_init(|| self.provider.metadata().type_name)
            .clone()
    }

    /// The provider's own configuration schema.
    pub fn provider_schema(&self) -> Schema {
        self.provider_schema
            .get_or_init(|| self.provider.schema())
            .clone()
    }

    // =========================================================================
    // Registries
    // =========================================================================

    pub(crate) async fn resource_registry(&self) -> (BTreeMap<String, ResourceEntry>, Diagnostics) {
        let provider = Arc::clone(&self.provider);
        let provider_type_name = self.provider_type_name();
        self.resources
            .get_or_init(move || {
                let mut diagnostics = Diagnostics::new();
                let request = ResourceMetadataRequest { provider_type_name };
                let items = provider.resources().into_iter().map(|constructor| {
                    let metadata = constructor().metadata(&request);
                    let entry = ResourceEntry {
                        constructor,
                        behavior: metadata.behavior,
                    };
                    (metadata.type_name, entry)
                });
                let entries = collect_entries("Resource", "resource", items, &mut diagnostics);
                (entries, diagnostics)
            })
            .await
    }

    pub(crate) async fn data_source_registry(
        &self,
    ) -> (BTreeMap<String, DataSourceConstructor>, Diagnostics) {
        let provider = Arc::clone(&self.provider);
        let provider_type_name = self.provider_type_name();
        self.data_sources
            .get_or_init(move || {
                let mut diagnostics = Diagnostics::new();
                let request = DataSourceMetadataRequest { provider_type_name };
                let items = provider
                    .data_sources()
                    .into_iter()
                    .map(|constructor| (constructor().metadata(&request).type_name, constructor));
                let entries = collect_entries("Data Source", "data source", items, &mut diagnostics);
                (entries, diagnostics)
            })
            .await
    }

    pub(crate) async fn ephemeral_resource_registry(
        &self,
    ) -> (BTreeMap<String, EphemeralResourceConstructor>, Diagnostics) {
        let provider = Arc::clone(&self.provider);
        let provider_type_name = self.provider_type_name();
        self.ephemeral_resources
            .get_or_init(move || {
                let mut diagnostics = Diagnostics::new();
                let request = EphemeralResourceMetadataRequest { provider_type_name };
                let items = provider
                    .ephemeral_resources()
                    .into_iter()
                    .map(|constructor| (constructor().metadata(&request).type_name, constructor));
                let entries = collect_entries(
                    "Ephemeral Resource",
                    "ephemeral resource",
                    items,
                    &mut diagnostics,
                );
                (entries, diagnostics)
            })
            .await
    }

    /// List resource types must pair with a managed resource type of the
    /// same name so the host can decode streamed resource data, unless the
    /// provider supplies raw schemas for them.
    pub(crate) async fn list_resource_registry(
        &self,
    ) -> (BTreeMap<String, ListResourceConstructor>, Diagnostics) {
        let (resource_entries, _) = self.resource_registry().await;
        let resource_names: BTreeSet<String> = resource_entries.into_keys().collect();
        let provider = Arc::clone(&self.provider);
        let provider_type_name = self.provider_type_name();
        self.list_resources
            .get_or_init(move || {
                let mut diagnostics = Diagnostics::new();
                let request = ListResourceMetadataRequest { provider_type_name };
                let items = provider
                    .list_resources()
                    .into_iter()
                    .map(|constructor| (constructor().metadata(&request).type_name, constructor));
                let mut entries =
                    collect_entries("List Resource", "list resource", items, &mut diagnostics);

                let raw_schema_names: BTreeSet<String> = if provider.capabilities().raw_list_schemas
                {
                    provider
                        .raw_list_schemas()
                        .into_iter()
                        .map(|(type_name, _)| type_name)
                        .collect()
                } else {
                    BTreeSet::new()
                };
                entries.retain(|type_name, _| {
                    if resource_names.contains(type_name) || raw_schema_names.contains(type_name) {
                        return true;
                    }
                    diagnostics.add_error(
                        "List Resource Type Defined without a Matching Managed Resource Type",
                        format!(
                            "The list resource type {type_name:?} has no managed resource type of \
                             the same name and the provider does not supply a raw schema for it. \
                             {PROVIDER_ISSUE}"
                        ),
                    );
                    false
                });
                (entries, diagnostics)
            })
            .await
    }

    pub(crate) async fn state_store_registry(
        &self,
    ) -> (BTreeMap<String, StateStoreConstructor>, Diagnostics) {
        let provider = Arc::clone(&self.provider);
        let provider_type_name = self.provider_type_name();
        self.state_stores
            .get_or_init(move || {
                let mut diagnostics = Diagnostics::new();
                let request = StateStoreMetadataRequest { provider_type_name };
                let items = provider
                    .state_stores()
                    .into_iter()
                    .map(|constructor| (constructor().metadata(&request).type_name, constructor));
                let entries = collect_entries("State Store", "state store", items, &mut diagnostics);
                (entries, diagnostics)
            })
            .await
    }

    // =========================================================================
    // Schema caches
    // =========================================================================

    /// Fetch one resource type's schema, caching it on first use.
    pub async fn resource_schema(&self, type_name: &str) -> (Option<Schema>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        {
            let schemas = self.resource_schemas.read().await;
            if let Some(schema) = schemas.get(type_name) {
                return (Some(schema.clone()), diagnostics);
            }
        }

        let (entries, mut registry_diagnostics) = self.resource_registry().await;
        diagnostics.append(&mut registry_diagnostics);
        let Some(entry) = entries.get(type_name) else {
            add_type_not_found(&mut diagnostics, "Resource", "resource", type_name);
            return (None, diagnostics);
        };

        let schema = (entry.constructor)().schema();
        let mut schemas = self.resource_schemas.write().await;
        let schema = schemas
            .entry(type_name.to_string())
            .or_insert(schema)
            .clone();
        (Some(schema), diagnostics)
    }

    /// Fetch one resource type's identity schema, caching it on first use.
    /// Resources without identity support cache and return `None`.
    pub async fn resource_identity_schema(
        &self,
        type_name: &str,
    ) -> (Option<IdentitySchema>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        {
            let schemas = self.resource_identity_schemas.read().await;
            if let Some(identity_schema) = schemas.get(type_name) {
                return (identity_schema.clone(), diagnostics);
            }
        }

        let (entries, mut registry_diagnostics) = self.resource_registry().await;
        diagnostics.append(&mut registry_diagnostics);
        let Some(entry) = entries.get(type_name) else {
            add_type_not_found(&mut diagnostics, "Resource", "resource", type_name);
            return (None, diagnostics);
        };

        let identity_schema = (entry.constructor)().identity_schema();
        let mut schemas = self.resource_identity_schemas.write().await;
        let identity_schema = schemas
            .entry(type_name.to_string())
            .or_insert(identity_schema)
            .clone();
        (identity_schema, diagnostics)
    }

    /// Fetch every resource type's schema. Uncached; each schema goes
    /// through a definition check and failing entries are skipped.
    pub async fn resource_schemas(&self) -> (BTreeMap<String, Schema>, Diagnostics) {
        let (entries, mut diagnostics) = self.resource_registry().await;
        let mut schemas = BTreeMap::new();
        for (type_name, entry) in entries {
            let schema = (entry.constructor)().schema();
            if !check_definitions(&schema, &mut diagnostics) {
                continue;
            }
            schemas.insert(type_name, schema);
        }
        (schemas, diagnostics)
    }

    /// Fetch one data source type's schema, caching it on first use.
    pub async fn data_source_schema(&self, type_name: &str) -> (Option<Schema>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        {
            let schemas = self.data_source_schemas.read().await;
            if let Some(schema) = schemas.get(type_name) {
                return (Some(schema.clone()), diagnostics);
            }
        }

        let (entries, mut registry_diagnostics) = self.data_source_registry().await;
        diagnostics.append(&mut registry_diagnostics);
        let Some(constructor) = entries.get(type_name) else {
            add_type_not_found(&mut diagnostics, "Data Source", "data source", type_name);
            return (None, diagnostics);
        };

        let schema = constructor().schema();
        let mut schemas = self.data_source_schemas.write().await;
        let schema = schemas
            .entry(type_name.to_string())
            .or_insert(schema)
            .clone();
        (Some(schema), diagnostics)
    }

    /// Fetch every data source type's schema. Uncached; each schema goes
    /// through a definition check and failing entries are skipped.
    pub async fn data_source_schemas(&self) -> (BTreeMap<String, Schema>, Diagnostics) {
        let (entries, mut diagnostics) = self.data_source_registry().await;
        let mut schemas = BTreeMap::new();
        for (type_name, constructor) in entries {
            let schema = constructor().schema();
            if !check_definitions(&schema, &mut diagnostics) {
                continue;
            }
            schemas.insert(type_name, schema);
        }
        (schemas, diagnostics)
    }

    /// Fetch one ephemeral resource type's schema, caching it on first use.
    pub async fn ephemeral_resource_schema(
        &self,
        type_name: &str,
    ) -> (Option<Schema>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        {
            let schemas = self.ephemeral_resource_schemas.read().await;
            if let Some(schema) = schemas.get(type_name) {
                return (Some(schema.clone()), diagnostics);
            }
        }

        let (entries, mut registry_diagnostics) = self.ephemeral_resource_registry().await;
        diagnostics.append(&mut registry_diagnostics);
        let Some(constructor) = entries.get(type_name) else {
            add_type_not_found(
                &mut diagnostics,
                "Ephemeral Resource",
                "ephemeral resource",
                type_name,
            );
            return (None, diagnostics);
        };

        let schema = constructor().schema();
        let mut schemas = self.ephemeral_resource_schemas.write().await;
        let schema = schemas
            .entry(type_name.to_string())
            .or_insert(schema)
            .clone();
        (Some(schema), diagnostics)
    }

    /// Fetch every ephemeral resource type's schema. Uncached; each schema
    /// goes through a definition check and failing entries are skipped.
    pub async fn ephemeral_resource_schemas(&self) -> (BTreeMap<String, Schema>, Diagnostics) {
        let (entries, mut diagnostics) = self.ephemeral_resource_registry().await;
        let mut schemas = BTreeMap::new();
        for (type_name, constructor) in entries {
            let schema = constructor().schema();
            if !check_definitions(&schema, &mut diagnostics) {
                continue;
            }
            schemas.insert(type_name, schema);
        }
        (schemas, diagnostics)
    }

    /// Fetch one list resource type's configuration schema, caching it on
    /// first use.
    pub async fn list_resource_schema(&self, type_name: &str) -> (Option<Schema>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        {
            let schemas = self.list_resource_schemas.read().await;
            if let Some(schema) = schemas.get(type_name) {
                return (Some(schema.clone()), diagnostics);
            }
        }

        let (entries, mut registry_diagnostics) = self.list_resource_registry().await;
        diagnostics.append(&mut registry_diagnostics);
        let Some(constructor) = entries.get(type_name) else {
            add_type_not_found(&mut diagnostics, "List Resource", "list resource", type_name);
            return (None, diagnostics);
        };

        let schema = constructor().schema();
        let mut schemas = self.list_resource_schemas.write().await;
        let schema = schemas
            .entry(type_name.to_string())
            .or_insert(schema)
            .clone();
        (Some(schema), diagnostics)
    }

    /// Fetch every list resource type's configuration schema. Uncached;
    /// each schema goes through a definition check and failing entries are
    /// skipped.
    pub async fn list_resource_schemas(&self) -> (BTreeMap<String, Schema>, Diagnostics) {
        let (entries, mut diagnostics) = self.list_resource_registry().await;
        let mut schemas = BTreeMap::new();
        for (type_name, constructor) in entries {
            let schema = constructor().schema();
            if !check_definitions(&schema, &mut diagnostics) {
                continue;
            }
            schemas.insert(type_name, schema);
        }
        (schemas, diagnostics)
    }

    /// Fetch one state store type's schema, caching it on first use.
    pub async fn state_store_schema(&self, type_name: &str) -> (Option<Schema>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        {
            let schemas = self.state_store_schemas.read().await;
            if let Some(schema) = schemas.get(type_name) {
                return (Some(schema.clone()), diagnostics);
            }
        }

        let (entries, mut registry_diagnostics) = self.state_store_registry().await;
        diagnostics.append(&mut registry_diagnostics);
        let Some(constructor) = entries.get(type_name) else {
            add_type_not_found(&mut diagnostics, "State Store", "state store", type_name);
            return (None, diagnostics);
        };

        let schema = constructor().schema();
        let mut schemas = self.state_store_schemas.write().await;
        let schema = schemas
            .entry(type_name.to_string())
            .or_insert(schema)
            .clone();
        (Some(schema), diagnostics)
    }

    /// Fetch every state store type's schema. Uncached; each schema goes
    /// through a definition check and failing entries are skipped.
    pub async fn state_store_schemas(&self) -> (BTreeMap<String, Schema>, Diagnostics) {
        let (entries, mut diagnostics) = self.state_store_registry().await;
        let mut schemas = BTreeMap::new();
        for (type_name, constructor) in entries {
            let schema = constructor().schema();
            if !check_definitions(&schema, &mut diagnostics) {
                continue;
            }
            schemas.insert(type_name, schema);
        }
        (schemas, diagnostics)
    }

    // =========================================================================
    // Instances
    // =========================================================================

    /// Instantiate a resource type and run its configure hook. Returns
    /// `None` when the type is unknown, the registry reported errors, or
    /// configuring failed; the diagnostics say which.
    pub(crate) async fn configured_resource(
        &self,
        type_name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<(Box<dyn Resource>, ResourceBehavior)> {
        let (entries, mut registry_diagnostics) = self.resource_registry().await;
        diagnostics.append(&mut registry_diagnostics);
        let Some(entry) = entries.get(type_name) else {
            add_type_not_found(diagnostics, "Resource", "resource", type_name);
            return None;
        };
        if diagnostics.has_error() {
            return None;
        }

        let mut instance = (entry.constructor)();
        if instance.capabilities().configure {
            let request = ConfigureRequest {
                provider_data: self.resource_configure_data(),
            };
            let mut response = ConfigureResponse::default();
            instance.configure(&request, &mut response).await;
            diagnostics.append(&mut response.diagnostics);
            if diagnostics.has_error() {
                return None;
            }
        }
        Some((instance, entry.behavior))
    }

    pub(crate) async fn configured_data_source(
        &self,
        type_name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<Box<dyn DataSource>> {
        let (entries, mut registry_diagnostics) = self.data_source_registry().await;
        diagnostics.append(&mut registry_diagnostics);
        let Some(constructor) = entries.get(type_name) else {
            add_type_not_found(diagnostics, "Data Source", "data source", type_name);
            return None;
        };
        if diagnostics.has_error() {
            return None;
        }

        let mut instance = constructor();
        if instance.capabilities().configure {
            let request = ConfigureRequest {
                provider_data: self.data_source_configure_data(),
            };
            let mut response = ConfigureResponse::default();
            instance.configure(&request, &mut response).await;
            diagnostics.append(&mut response.diagnostics);
            if diagnostics.has_error() {
                return None;
            }
        }
        Some(instance)
    }

    pub(crate) async fn configured_ephemeral_resource(
        &self,
        type_name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<Box<dyn EphemeralResource>> {
        let (entries, mut registry_diagnostics) = self.ephemeral_resource_registry().await;
        diagnostics.append(&mut registry_diagnostics);
        let Some(constructor) = entries.get(type_name) else {
            add_type_not_found(
                diagnostics,
                "Ephemeral Resource",
                "ephemeral resource",
                type_name,
            );
            return None;
        };
        if diagnostics.has_error() {
            return None;
        }

        let mut instance = constructor();
        if instance.capabilities().configure {
            let request = ConfigureRequest {
                provider_data: self.ephemeral_resource_configure_data(),
            };
            let mut response = ConfigureResponse::default();
            instance.configure(&request, &mut response).await;
            diagnostics.append(&mut response.diagnostics);
            if diagnostics.has_error() {
                return None;
            }
        }
        Some(instance)
    }

    pub(crate) async fn configured_list_resource(
        &self,
        type_name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<Box<dyn ListResource>> {
        let (entries, mut registry_diagnostics) = self.list_resource_registry().await;
        diagnostics.append(&mut registry_diagnostics);
        let Some(constructor) = entries.get(type_name) else {
            add_type_not_found(diagnostics, "List Resource", "list resource", type_name);
            return None;
        };
        if diagnostics.has_error() {
            return None;
        }

        let mut instance = constructor();
        if instance.capabilities().configure {
            let request = ConfigureRequest {
                provider_data: self.list_resource_configure_data(),
            };
            let mut response = ConfigureResponse::default();
            instance.configure(&request, &mut response).await;
            diagnostics.append(&mut response.diagnostics);
            if diagnostics.has_error() {
                return None;
            }
        }
        Some(instance)
    }

    // =========================================================================
    // Configure state
    // =========================================================================

    pub(crate) fn store_configure_state(&self, state: ConfigureState) {
        let mut guard = self
            .configure_state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = state;
    }

    pub(crate) fn resource_configure_data(&self) -> Option<ProviderData> {
        self.configure_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resource_data
            .clone()
    }

    pub(crate) fn data_source_configure_data(&self) -> Option<ProviderData> {
        self.configure_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .data_source_data
            .clone()
    }

    pub(crate) fn ephemeral_resource_configure_data(&self) -> Option<ProviderData> {
        self.configure_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ephemeral_resource_data
            .clone()
    }

    pub(crate) fn list_resource_configure_data(&self) -> Option<ProviderData> {
        self.configure_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .list_resource_data
            .clone()
    }

    /// The provider-level deferral from ConfigureProvider, when the client
    /// is willing to accept one.
    pub(crate) fn provider_deferral(
        &self,
        client_capabilities: ClientCapabilities,
    ) -> Option<Deferred> {
        if !client_capabilities.deferral_allowed {
            return None;
        }
        self.configure_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .deferred
    }
}

fn collect_entries<T>(
    kind_title: &str,
    kind_lower: &str,
    items: impl IntoIterator<Item = (String, T)>,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<String, T> {
    let mut entries = BTreeMap::new();
    for (type_name, entry) in items {
        if type_name.is_empty() {
            diagnostics.add_error(
                format!("{kind_title} Type Name Missing"),
                format!(
                    "A {kind_lower} returned an empty string from its metadata type name. \
                     {PROVIDER_ISSUE}"
                ),
            );
            continue;
        }
        if entries.contains_key(&type_name) {
            diagnostics.add_error(
                format!("Duplicate {kind_title} Type Defined"),
                format!(
                    "The {kind_lower} type name {type_name:?} was returned by more than one \
                     {kind_lower}. Type names must be unique. {PROVIDER_ISSUE}"
                ),
            );
            continue;
        }
        entries.insert(type_name, entry);
    }
    entries
}

fn add_type_not_found(
    diagnostics: &mut Diagnostics,
    kind_title: &str,
    kind_lower: &str,
    type_name: &str,
) {
    diagnostics.add_error(
        format!("{kind_title} Type Not Found"),
        format!("No {kind_lower} type named {type_name:?} was found in the provider."),
    );
}

fn check_definitions(schema: &Schema, diagnostics: &mut Diagnostics) -> bool {
    let mut definition_diagnostics = validate_definitions(schema);
    let valid = !definition_diagnostics.has_error();
    diagnostics.append(&mut definition_diagnostics);
    valid
}

/// Default an absent request side to a null value of the schema's object
/// type.
pub(crate) fn value_or_null(value: Option<Value>, value_type: AttributeType) -> Value {
    value.unwrap_or_else(|| Value::null(value_type))
}

/// Decode a private state blob, reporting malformed data. Empty input
/// yields an empty blob.
pub(crate) fn decode_private(data: &[u8], diagnostics: &mut Diagnostics) -> Option<PrivateData> {
    let (decoded, mut decode_diagnostics) = PrivateData::from_bytes(data);
    let failed = decode_diagnostics.has_error();
    diagnostics.append(&mut decode_diagnostics);
    if failed {
        return None;
    }
    Some(decoded.unwrap_or_default())
}

/// Encode a private state blob for the response. `None` when there is
/// nothing to store or encoding failed.
pub(crate) fn encode_private(
    private: &PrivateData,
    diagnostics: &mut Diagnostics,
) -> Option<Vec<u8>> {
    let (encoded, mut encode_diagnostics) = private.to_bytes();
    diagnostics.append(&mut encode_diagnostics);
    encoded
}

/// Flag identity data returned by a resource that never declared identity
/// support.
pub(crate) fn check_identity_support(
    operation: &str,
    identity_schema: Option<&IdentitySchema>,
    new_identity: Option<&Value>,
    diagnostics: &mut Diagnostics,
) {
    if new_identity.is_none() || identity_schema.is_some() {
        return;
    }
    diagnostics.add_error(
        format!("Unexpected {operation} Response"),
        format!(
            "The {} operation returned identity data, but the resource type does not declare an \
             identity schema. {PROVIDER_ISSUE}",
            operation.to_lowercase()
        ),
    );
}

/// Flag an identity that changed even though the resource did not declare
/// the mutable identity behavior. Only fully known prior identities are
/// compared.
pub(crate) fn check_identity_change(
    operation: &str,
    prior_identity: Option<&Value>,
    new_identity: Option<&Value>,
    behavior: ResourceBehavior,
    diagnostics: &mut Diagnostics,
) {
    if behavior.mutable_identity {
        return;
    }
    let Some(prior) = prior_identity else {
        return;
    };
    if prior.is_null() || !prior.is_fully_known() {
        return;
    }
    let changed = match new_identity {
        Some(new) => new != prior,
        None => true,
    };
    if !changed {
        return;
    }

    let rendered_new = new_identity.map_or_else(|| "null".to_string(), ToString::to_string);
    diagnostics.add_error(
        "Unexpected Identity Change",
        format!(
            "During the {} operation, the resource reported a change to its identity. If the \
             identity of this resource can change, the resource must declare the mutable identity \
             behavior. {PROVIDER_ISSUE}\n\nPrior Identity: {prior}\n\nNew Identity: {rendered_new}",
            operation.to_lowercase()
        ),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::test_support::{TestListResource, TestProvider, TestResource, TestStateStore};
    use super::*;
    use crate::provider::ProviderCapabilities;
    use crate::schema::{Attribute, AttributeFlags, IdentityAttribute};

    fn server_with_resources(resources: Vec<ResourceConstructor>) -> Server {
        Server::new(Arc::new(TestProvider {
            resources,
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn test_provider_type_name() {
        let server = Server::new(Arc::new(TestProvider::default()));
        assert_eq!(server.provider_type_name(), "examplecloud");
    }

    #[tokio::test]
    async fn test_registry_detects_duplicate_type_names_keeping_first() {
        let first = TestResource {
            type_name: "examplecloud_server".to_string(),
            behavior: ResourceBehavior {
                mutable_identity: true,
            },
            ..Default::default()
        };
        let second = TestResource {
            type_name: "examplecloud_server".to_string(),
            ..Default::default()
        };
        let server = server_with_resources(vec![first.constructor(), second.constructor()]);

        let (entries, diagnostics) = server.resource_registry().await;
        assert_eq!(entries.len(), 1);
        assert!(diagnostics.has_error());
        assert_eq!(diagnostics[0].summary, "Duplicate Resource Type Defined");
        assert!(entries["examplecloud_server"].behavior.mutable_identity);
    }

    #[tokio::test]
    async fn test_registry_reports_missing_type_name() {
        let unnamed = TestResource {
            type_name: String::new(),
            ..Default::default()
        };
        let server = server_with_resources(vec![unnamed.constructor()]);

        let (entries, diagnostics) = server.resource_registry().await;
        assert!(entries.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Resource Type Name Missing");
    }

    #[tokio::test]
    async fn test_list_registry_requires_matching_resource_type() {
        let list = TestListResource {
            type_name: "examplecloud_orphan".to_string(),
            ..Default::default()
        };
        let server = Server::new(Arc::new(TestProvider {
            list_resources: vec![list.constructor()],
            ..Default::default()
        }));

        let (entries, diagnostics) = server.list_resource_registry().await;
        assert!(entries.is_empty());
        assert_eq!(
            diagnostics[0].summary,
            "List Resource Type Defined without a Matching Managed Resource Type"
        );
    }

    #[tokio::test]
    async fn test_list_registry_accepts_paired_and_raw_schema_types() {
        let resource = TestResource {
            type_name: "examplecloud_server".to_string(),
            ..Default::default()
        };
        let paired = TestListResource {
            type_name: "examplecloud_server".to_string(),
            ..Default::default()
        };
        let raw = TestListResource {
            type_name: "examplecloud_external".to_string(),
            ..Default::default()
        };
        let server = Server::new(Arc::new(TestProvider {
            resources: vec![resource.constructor()],
            list_resources: vec![paired.constructor(), raw.constructor()],
            capabilities: ProviderCapabilities {
                raw_list_schemas: true,
            },
            raw_list_schemas: vec![("examplecloud_external".to_string(), Schema::v0())],
            ..Default::default()
        }));

        let (entries, diagnostics) = server.list_resource_registry().await;
        assert!(diagnostics.is_empty());
        assert_eq!(
            entries.keys().collect::<Vec<_>>(),
            vec!["examplecloud_external", "examplecloud_server"]
        );
    }

    #[tokio::test]
    async fn test_resource_schema_cached_per_type() {
        static CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

        let resource = TestResource {
            type_name: "examplecloud_server".to_string(),
            schema: Schema::v0().with_attribute("name", Attribute::required_string()),
            ..Default::default()
        };
        let constructor: ResourceConstructor = Arc::new(move || {
            CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
            Box::new(resource.clone())
        });
        let server = server_with_resources(vec![constructor]);

        let (schema, diagnostics) = server.resource_schema("examplecloud_server").await;
        assert!(diagnostics.is_empty());
        assert!(schema.unwrap().block.attributes.contains_key("name"));
        let constructions_after_first = CONSTRUCTIONS.load(Ordering::SeqCst);

        let (schema, _) = server.resource_schema("examplecloud_server").await;
        assert!(schema.is_some());
        assert_eq!(CONSTRUCTIONS.load(Ordering::SeqCst), constructions_after_first);
    }

    #[tokio::test]
    async fn test_unknown_type_reports_not_found() {
        let server = server_with_resources(Vec::new());

        let (schema, diagnostics) = server.resource_schema("examplecloud_missing").await;
        assert!(schema.is_none());
        assert_eq!(diagnostics[0].summary, "Resource Type Not Found");

        let mut diagnostics = Diagnostics::new();
        let instance = server
            .configured_resource("examplecloud_missing", &mut diagnostics)
            .await;
        assert!(instance.is_none());
        assert_eq!(diagnostics[0].summary, "Resource Type Not Found");
    }

    #[tokio::test]
    async fn test_bulk_schemas_skip_invalid_definitions() {
        let mut conflicted = AttributeFlags::required();
        conflicted.optional = true;
        let invalid = TestResource {
            type_name: "examplecloud_invalid".to_string(),
            schema: Schema::v0()
                .with_attribute("name", Attribute::new(AttributeType::String, conflicted)),
            ..Default::default()
        };
        let valid = TestResource {
            type_name: "examplecloud_server".to_string(),
            schema: Schema::v0().with_attribute("name", Attribute::required_string()),
            ..Default::default()
        };
        let server = server_with_resources(vec![invalid.constructor(), valid.constructor()]);

        let (schemas, diagnostics) = server.resource_schemas().await;
        assert_eq!(schemas.keys().collect::<Vec<_>>(), vec!["examplecloud_server"]);
        assert!(diagnostics.has_error());
        assert_eq!(diagnostics[0].summary, "Invalid Attribute Definition");
    }

    #[tokio::test]
    async fn test_identity_schema_caches_none_for_resources_without_identity() {
        let with_identity = TestResource {
            type_name: "examplecloud_server".to_string(),
            identity_schema: Some(
                IdentitySchema::new(1)
                    .with_attribute("id", IdentityAttribute::new(AttributeType::String)),
            ),
            ..Default::default()
        };
        let without_identity = TestResource {
            type_name: "examplecloud_volume".to_string(),
            ..Default::default()
        };
        let server =
            server_with_resources(vec![with_identity.constructor(), without_identity.constructor()]);

        let (identity, _) = server.resource_identity_schema("examplecloud_server").await;
        assert!(identity.is_some());

        let (identity, diagnostics) = server
            .resource_identity_schema("examplecloud_volume")
            .await;
        assert!(identity.is_none());
        assert!(diagnostics.is_empty());

        // Second fetch hits the cached None.
        let (identity, diagnostics) = server
            .resource_identity_schema("examplecloud_volume")
            .await;
        assert!(identity.is_none());
        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_state_store_registry_and_schema() {
        let store = TestStateStore {
            type_name: "examplecloud_bucket_store".to_string(),
            schema: Schema::v0().with_attribute("bucket", Attribute::required_string()),
        };
        let server = Server::new(Arc::new(TestProvider {
            state_stores: vec![store.constructor()],
            ..Default::default()
        }));

        let (schemas, diagnostics) = server.state_store_schemas().await;
        assert!(diagnostics.is_empty());
        assert!(schemas.contains_key("examplecloud_bucket_store"));

        let (schema, _) = server.state_store_schema("examplecloud_bucket_store").await;
        assert!(schema.unwrap().block.attributes.contains_key("bucket"));
    }

    #[test]
    fn test_identity_support_check() {
        let mut diagnostics = Diagnostics::new();
        check_identity_support(
            "Create",
            None,
            Some(&Value::object([("id".to_string(), Value::string("a"))].into())),
            &mut diagnostics,
        );
        assert_eq!(diagnostics[0].summary, "Unexpected Create Response");

        let mut diagnostics = Diagnostics::new();
        check_identity_support("Create", None, None, &mut diagnostics);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_identity_change_check() {
        let prior = Value::object([("id".to_string(), Value::string("a"))].into());
        let changed = Value::object([("id".to_string(), Value::string("b"))].into());

        let mut diagnostics = Diagnostics::new();
        check_identity_change(
            "Read",
            Some(&prior),
            Some(&changed),
            ResourceBehavior::default(),
            &mut diagnostics,
        );
        assert_eq!(diagnostics[0].summary, "Unexpected Identity Change");
        let detail = diagnostics[0].detail.clone().unwrap_or_default();
        assert!(detail.contains("Prior Identity: {id: \"a\"}"));
        assert!(detail.contains("New Identity: {id: \"b\"}"));

        // Mutable identity resources may change their identity freely.
        let mut diagnostics = Diagnostics::new();
        check_identity_change(
            "Read",
            Some(&prior),
            Some(&changed),
            ResourceBehavior {
                mutable_identity: true,
            },
            &mut diagnostics,
        );
        assert!(diagnostics.is_empty());

        // An unchanged identity passes.
        let mut diagnostics = Diagnostics::new();
        check_identity_change(
            "Read",
            Some(&prior),
            Some(&prior.clone()),
            ResourceBehavior::default(),
            &mut diagnostics,
        );
        assert!(diagnostics.is_empty());

        // A prior identity with unknown values is not compared.
        let unknown_prior = Value::object([(
            "id".to_string(),
            Value::unknown(AttributeType::String),
        )]
        .into());
        let mut diagnostics = Diagnostics::new();
        check_identity_change(
            "Read",
            Some(&unknown_prior),
            Some(&changed),
            ResourceBehavior::default(),
            &mut diagnostics,
        );
        assert!(diagnostics.is_empty());
    }
}
