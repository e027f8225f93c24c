//! The MoveResourceState operation.

use tracing::{debug, info, instrument, warn};

use crate::diagnostics::{Diagnostics, FRAMEWORK_ISSUE};
use crate::nullify::nullify_write_only;
use crate::private::PrivateData;
use crate::resource::{MoveStateRequest, MoveStateResponse};
use crate::server::{decode_private, encode_private, Server};
use crate::types::RawState;
use crate::value::Value;

/// Host request to move state from another resource type into this one.
#[derive(Debug, Clone, Default)]
pub struct MoveResourceStateRequest {
    /// The resource type the state is moving into.
    pub target_type_name: String,
    /// The address of the provider the state is moving from.
    pub source_provider_address: String,
    /// The resource type name the state is moving from.
    pub source_type_name: String,
    /// The schema version of the source state.
    pub source_schema_version: i64,
    /// The stored source state exactly as the host holds it.
    pub source_raw_state: Option<RawState>,
    /// The encoded private state blob stored with the source.
    pub source_private: Vec<u8>,
}

/// Host response from moving resource state.
#[derive(Debug, Default)]
pub struct MoveResourceStateResponse {
    /// The state for the target resource type, with write-only attributes
    /// nulled.
    pub target_state: Option<Value>,
    /// The encoded private state blob to store with the target, when there
    /// is one.
    pub target_private: Option<Vec<u8>>,
    /// Diagnostics reported while moving.
    pub diagnostics: Diagnostics,
}

impl Server {
    /// Move state stored for another resource type into a target resource
    /// type, trying the target's declared state movers in order.
    ///
    /// The first mover to report an error or to produce target state
    /// decides the outcome; its diagnostics replace anything earlier movers
    /// reported. Movers that decline contribute only their warnings, and
    /// those surface when every mover declines.
    #[instrument(skip(self, request))]
    pub async fn move_resource_state(
        &self,
        request: Option<MoveResourceStateRequest>,
    ) -> MoveResourceStateResponse {
        let mut response = MoveResourceStateResponse::default();
        let Some(request) = request else {
            return response;
        };
        debug!(
            type_name = %request.target_type_name,
            source_type_name = %request.source_type_name,
            "MoveResourceState called"
        );

        let Some((resource, _)) = self
            .configured_resource(&request.target_type_name, &mut response.diagnostics)
            .await
        else {
            return response;
        };

        let schema = resource.schema();
        let movers = resource.state_movers();
        if movers.is_empty() {
            add_unable_to_move(&request, &mut response.diagnostics);
            return response;
        }

        let Some(raw_state) = request.source_raw_state.clone() else {
            response.diagnostics.add_error(
                "Missing Source Resource State",
                format!(
                    "The host did not supply the source resource state to move. \
                     {FRAMEWORK_ISSUE}"
                ),
            );
            return response;
        };

        let Some(source_private) =
            decode_private(&request.source_private, &mut response.diagnostics)
        else {
            return response;
        };

        let mut declined = Diagnostics::new();
        for mover in movers {
            let source_state = match mover.source_schema() {
                Some(source_schema) => match raw_state.to_json() {
                    Ok(json) => {
                        match Value::from_json_ignoring_undefined(
                            &source_schema.object_type(),
                            &json,
                        ) {
                            Ok(value) => Some(value),
                            Err(err) => {
                                debug!(
                                    error = %err,
                                    "source state does not decode against the mover's source schema"
                                );
                                None
                            }
                        }
                    }
                    Err(err) => {
                        debug!(error = %err, "source raw state is not parseable JSON");
                        None
                    }
                },
                None => None,
            };

            let mover_request = MoveStateRequest {
                source_provider_address: request.source_provider_address.clone(),
                source_type_name: request.source_type_name.clone(),
                source_schema_version: request.source_schema_version,
                source_raw_state: raw_state.clone(),
                source_state,
                source_private: source_private.provider.clone(),
            };
            let mut mover_response = MoveStateResponse::default();
            mover.move_state(mover_request, &mut mover_response).await;

            if mover_response.diagnostics.has_error() {
                response.diagnostics = mover_response.diagnostics;
                warn!(
                    diagnostics = response.diagnostics.len(),
                    "MoveResourceState completed with errors"
                );
                return response;
            }

            match mover_response.target_state {
                Some(target_state) if !target_state.is_null() => {
                    response.diagnostics = mover_response.diagnostics;
                    let target_state = nullify_write_only(&schema, &target_state);
                    let mut private = PrivateData::new();
                    private.provider = mover_response.target_private;
                    response.target_private = encode_private(&private, &mut response.diagnostics);
                    response.target_state = Some(target_state);
                    info!("MoveResourceState completed successfully");
                    return response;
                }
                _ => declined.append(&mut mover_response.diagnostics),
            }
        }

        response.diagnostics.append(&mut declined);
        add_unable_to_move(&request, &mut response.diagnostics);
        warn!(
            diagnostics = response.diagnostics.len(),
            "MoveResourceState completed with errors"
        );
        response
    }
}

fn add_unable_to_move(request: &MoveResourceStateRequest, diagnostics: &mut Diagnostics) {
    diagnostics.add_error(
        "Unable to Move Resource State",
        format!(
            "The target resource type has no state mover that accepts the given source. The \
             provider developer must add support for this move.\n\n\
             Source Provider Address: {}\n\
             Source Resource Type: {}\n\
             Source Schema Version: {}\n\
             Target Resource Type: {}",
            request.source_provider_address,
            request.source_type_name,
            request.source_schema_version,
            request.target_type_name,
        ),
    );
}
