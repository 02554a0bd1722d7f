//! Partner-facing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use event_store::EventStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::bookings::AppState;

#[derive(Serialize)]
pub struct NotificationResponse {
    pub booking_id: String,
    pub sequence_id: String,
    pub message: String,
    pub created_at: String,
}

/// GET /partners/notifications — the caller's notifications, newest first.
#[tracing::instrument(skip(state, headers))]
pub async fn notifications<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let partner_id = state.actor(&headers)?.require_partner()?;

    let mut notifications = state.notification_log.notifications_for(partner_id);
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(
        notifications
            .into_iter()
            .map(|n| NotificationResponse {
                booking_id: n.booking_id.to_string(),
                sequence_id: n.sequence_id.to_string(),
                message: n.message,
                created_at: n.created_at.to_rfc3339(),
            })
            .collect(),
    ))
}
