use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::external::{AppointmentLedger, AuditLog, DoctorDirectory};
use crate::models::{BlockDateRequest, BookSlotRequest, SetRecurringRequest, SetSingleRequest};
use crate::services::{BookingService, ResolutionService, ScheduleService, SearchService};
use crate::store::AvailabilityStore;

/// Shared handles for the scheduling cell: the availability store plus the
/// external collaborators.
pub struct SchedulingState {
    pub store: Arc<AvailabilityStore>,
    pub directory: Arc<dyn DoctorDirectory>,
    pub ledger: Arc<dyn AppointmentLedger>,
    pub audit: Arc<dyn AuditLog>,
}

impl SchedulingState {
    pub fn new(
        store: Arc<AvailabilityStore>,
        directory: Arc<dyn DoctorDirectory>,
        ledger: Arc<dyn AppointmentLedger>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            store,
            directory,
            ledger,
            audit,
        }
    }
}

// Query parameters for the read endpoints
#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub date: Option<NaiveDate>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub include_inactive: Option<bool>,
}

/// Identity of the acting user, minted by the upstream gateway.
fn actor_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let value = headers
        .get("x-actor-id")
        .ok_or_else(|| AppError::BadRequest("missing x-actor-id header".to_string()))?;
    value
        .to_str()
        .ok()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| AppError::BadRequest("malformed x-actor-id header".to_string()))
}

// ==============================================================================
// READ HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn resolve_availability(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<Value>, AppError> {
    let resolution_service = ResolutionService::new(state.store.clone());

    let resolved = resolution_service.resolve(doctor_id, query.date).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "available": resolved.available,
        "day_of_week": resolved.day_of_week,
        "availability_type": resolved.availability_type,
        "slots": resolved.slots,
    })))
}

#[axum::debug_handler]
pub async fn availability_range(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Value>, AppError> {
    let resolution_service = ResolutionService::new(state.store.clone());

    let days = resolution_service
        .resolve_range(doctor_id, query.start_date, query.end_date)
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "days": days,
        "total": days.len(),
    })))
}

#[axum::debug_handler]
pub async fn search_availability(
    State(state): State<Arc<SchedulingState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, AppError> {
    let search_service = SearchService::new(state.store.clone(), state.directory.clone());

    let results = search_service
        .search(query.date, query.name.as_deref())
        .await?;

    Ok(Json(json!({
        "results": results,
        "total": results.len(),
    })))
}

#[axum::debug_handler]
pub async fn list_schedule(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = ScheduleService::new(state.store.clone(), state.audit.clone());

    let records = schedule_service
        .list_records(doctor_id, query.include_inactive.unwrap_or(false))
        .await;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "records": records,
        "total": records.len(),
    })))
}

// ==============================================================================
// MUTATION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn set_single(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<SetSingleRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_id(&headers)?;
    let schedule_service = ScheduleService::new(state.store.clone(), state.audit.clone());

    let record = schedule_service
        .set_single(doctor_id, request, actor)
        .await?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn set_recurring(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<SetRecurringRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_id(&headers)?;
    let schedule_service = ScheduleService::new(state.store.clone(), state.audit.clone());

    let records = schedule_service
        .set_recurring(doctor_id, request, actor)
        .await?;

    Ok(Json(json!({
        "records": records,
        "total": records.len(),
    })))
}

#[axum::debug_handler]
pub async fn block_date(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<BlockDateRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_id(&headers)?;
    let schedule_service = ScheduleService::new(state.store.clone(), state.audit.clone());

    let record = schedule_service
        .block(doctor_id, request.date, actor)
        .await?;

    Ok(Json(json!(record)))
}

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<SchedulingState>>,
    Path(doctor_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_id(&headers)?;
    let booking_service = BookingService::new(
        state.store.clone(),
        state.directory.clone(),
        state.ledger.clone(),
        state.audit.clone(),
    );

    let confirmation = booking_service.book(doctor_id, request, actor).await?;

    Ok(Json(json!(confirmation)))
}

#[axum::debug_handler]
pub async fn remove_slot(
    State(state): State<Arc<SchedulingState>>,
    Path((record_id, index)): Path<(Uuid, usize)>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let actor = actor_id(&headers)?;
    let schedule_service = ScheduleService::new(state.store.clone(), state.audit.clone());

    let record = schedule_service.remove_slot(record_id, index, actor).await?;

    Ok(Json(json!(record)))
}
