use axum::extract::State;
use chrono::NaiveDate;
use gerot_db::{BookingFilter, NewRoomBooking, RoomBookingRecord, RoomBookingUpdate};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
    state::ApiState,
};

#[derive(Debug, Default, Deserialize)]
pub struct BookingQuery {
    pub room: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Only the person who booked the room, or an admin, may change it.
async fn load_own_booking(
    state: &ApiState,
    current: &CurrentUser,
    id: i64,
) -> Result<RoomBookingRecord, ApiError> {
    let booking = state
        .db
        .get_booking(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("booking {} not found", id)))?;
    if booking.user_id != current.id() && !current.actor().role.is_admin() {
        return Err(ApiError::forbidden());
    }
    Ok(booking)
}

pub async fn list_bookings(
    State(state): State<ApiState>,
    _current: CurrentUser,
    Query(query): Query<BookingQuery>,
) -> ApiResult<Vec<RoomBookingRecord>> {
    let filter = BookingFilter {
        room: query.room.filter(|r| !r.trim().is_empty()),
        date: query.date,
    };
    Ok(Json(state.db.list_bookings(&filter).await?))
}

pub async fn create_booking(
    State(state): State<ApiState>,
    current: CurrentUser,
    Json(payload): Json<NewRoomBooking>,
) -> ApiResult<RoomBookingRecord> {
    Ok(Json(state.db.create_booking(current.id(), &payload).await?))
}

pub async fn get_booking(
    State(state): State<ApiState>,
    _current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<RoomBookingRecord> {
    let booking = state
        .db
        .get_booking(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("booking {} not found", id)))?;
    Ok(Json(booking))
}

pub async fn update_booking(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<RoomBookingUpdate>,
) -> ApiResult<RoomBookingRecord> {
    load_own_booking(&state, &current, id).await?;
    Ok(Json(state.db.update_booking(id, &payload).await?))
}

pub async fn cancel_booking(
    State(state): State<ApiState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    let booking = load_own_booking(&state, &current, id).await?;
    state.db.cancel_booking(id).await?;
    tracing::info!(booking_id = id, room = %booking.room, cancelled_by = current.id(), "Room booking cancelled");
    Ok(Json(json!({ "message": "Agendamento cancelado", "id": id })))
}
