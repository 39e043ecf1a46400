use crate::api::schemas::{error_response, ApiError, AppState, ObservationAck};
use crate::domain::model::StationReading;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::{debug, instrument, warn};

/// `GET /addWeatherObservation`, the station's upload hook.
///
/// Stores one row with the computed dewpoint and echoes `dateutc` back.
#[instrument(skip_all)]
pub async fn add_observation(
    State(state): State<AppState>,
    query: Result<Query<StationReading>, QueryRejection>,
) -> Result<Json<ObservationAck>, ApiError> {
    let Query(reading) = query.map_err(|rejection| {
        warn!("Malformed observation query: {}", rejection.body_text());
        error_response(StatusCode::BAD_REQUEST, "BAD_REQUEST", rejection.body_text())
    })?;

    if let Some(expected) = state.config.server.passkey.as_deref() {
        if reading.passkey.as_deref() != Some(expected) {
            warn!("Rejected observation with wrong PASSKEY");
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "PASSKEY does not match this station",
            ));
        }
    }

    let stored = state.observations.append(&reading).await?;
    debug!("Observation {} accepted", stored.id);

    Ok(Json(ObservationAck {
        dateutc: reading.dateutc,
    }))
}
