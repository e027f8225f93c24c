//! The state store trait.
//!
//! State stores let a provider offer pluggable storage for host state.
//! The dispatcher registers them and serves their schemas; the storage
//! operations themselves ride a separate host channel and are out of
//! scope here.

use std::sync::Arc;

use crate::schema::Schema;

/// Constructs a fresh state store instance, once per operation.
pub type StateStoreConstructor = Arc<dyn Fn() -> Box<dyn StateStore> + Send + Sync>;

/// Request for a state store's metadata.
#[derive(Debug, Clone)]
pub struct StateStoreMetadataRequest {
    /// The provider's type name, for deriving prefixed store names.
    pub provider_type_name: String,
}

/// A state store's declared metadata.
#[derive(Debug, Clone, Default)]
pub struct StateStoreMetadataResponse {
    /// The store's type name, conventionally prefixed with the provider
    /// type name.
    pub type_name: String,
}

/// A state store implementation.
pub trait StateStore: Send + Sync {
    /// The state store's type name.
    fn metadata(&self, request: &StateStoreMetadataRequest) -> StateStoreMetadataResponse;

    /// The schema describing this state store's configuration.
    fn schema(&self) -> Schema;
}
