use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// CORE AVAILABILITY MODELS
// ==============================================================================

/// Which calendar dates an availability record applies to: every matching
/// weekday (a template), or exactly one date (an override).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Recurring,
    Single,
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleKind::Recurring => write!(f, "recurring"),
            ScheduleKind::Single => write!(f, "single"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_booked: bool,
}

impl TimeSlot {
    pub fn unbooked(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time,
            is_booked: false,
        }
    }

    pub fn matches(&self, start_time: NaiveTime, end_time: NaiveTime) -> bool {
        self.start_time == start_time && self.end_time == end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub kind: ScheduleKind,
    /// 0 = Sunday .. 6 = Saturday; set iff kind is Recurring.
    pub day_of_week: Option<i32>,
    /// Pure calendar date; set iff kind is Single.
    pub date: Option<NaiveDate>,
    pub time_slots: Vec<TimeSlot>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AvailabilityRecord {
    pub fn unbooked_slots(&self) -> Vec<TimeSlot> {
        self.time_slots
            .iter()
            .filter(|slot| !slot.is_booked)
            .cloned()
            .collect()
    }

    /// An active Single with no slots is an explicit block, not "fall back
    /// to the weekly template".
    pub fn is_block(&self) -> bool {
        self.kind == ScheduleKind::Single && self.time_slots.is_empty()
    }

    /// Deterministic presentation order for queries: kind, then weekday,
    /// then date.
    pub fn sort_key(&self) -> (ScheduleKind, i32, NaiveDate) {
        (
            self.kind,
            self.day_of_week.unwrap_or(0),
            self.date.unwrap_or(NaiveDate::MIN),
        )
    }
}

/// Store query filter. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityQuery {
    pub doctor_id: Option<Uuid>,
    pub kind: Option<ScheduleKind>,
    pub date: Option<NaiveDate>,
    pub day_of_week: Option<i32>,
    pub active_only: bool,
}

// ==============================================================================
// REQUEST / RESPONSE DTOS
// ==============================================================================

/// A slot as submitted by a doctor edit; a missing end time is inferred as
/// one hour after the start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotInput {
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSingleRequest {
    pub date: NaiveDate,
    pub slots: Vec<SlotInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyScheduleEntry {
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRecurringRequest {
    pub schedule: Vec<WeeklyScheduleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDateRequest {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedAvailability {
    pub available: bool,
    pub day_of_week: i32,
    pub availability_type: Option<ScheduleKind>,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub available: bool,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySearchResult {
    pub doctor: DoctorProfile,
    pub availability_type: ScheduleKind,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub appointment_id: Uuid,
    pub record_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    /// True when the booking forked a per-date record off the weekly template.
    pub materialized: bool,
}

// ==============================================================================
// EXTERNAL COLLABORATOR PAYLOADS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub booked_by: Uuid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    SetSingle,
    SetRecurring,
    BlockDate,
    RemoveSlot,
    BookSlot,
    ReleaseSlot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor_id: Uuid,
    pub action: AuditAction,
    pub doctor_id: Uuid,
    pub record_id: Option<Uuid>,
    pub success: bool,
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn success(actor_id: Uuid, action: AuditAction, doctor_id: Uuid, record_id: Option<Uuid>) -> Self {
        Self {
            actor_id,
            action,
            doctor_id,
            record_id,
            success: true,
            detail: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn failure(actor_id: Uuid, action: AuditAction, doctor_id: Uuid, detail: String) -> Self {
        Self {
            actor_id,
            action,
            doctor_id,
            record_id: None,
            success: false,
            detail: Some(detail),
            occurred_at: Utc::now(),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Availability state invariant violated: {0}")]
    StateInvariant(String),

    #[error("Appointment ledger error: {0}")]
    Ledger(String),

    #[error("Doctor directory error: {0}")]
    Directory(String),
}

impl SchedulingError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::NotFound(msg) => AppError::NotFound(msg),
            SchedulingError::InvalidInput { field, message } => {
                AppError::ValidationError(format!("Invalid {}: {}", field, message))
            }
            SchedulingError::Conflict(msg) => AppError::Conflict(msg),
            SchedulingError::StateInvariant(msg) => AppError::Internal(msg),
            SchedulingError::Ledger(msg) | SchedulingError::Directory(msg) => {
                AppError::ExternalService(msg)
            }
        }
    }
}
