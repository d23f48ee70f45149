use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::HospitalApiClient;

use crate::models::{AuditEvent, DoctorProfile, NewAppointment, SchedulingError};

// ==============================================================================
// COLLABORATOR SEAMS
// ==============================================================================

/// Read-only doctor lookup for search joins and booking validation.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn find(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, SchedulingError>;
}

/// The system of record for appointments. The booking guard writes here only
/// after the slot is durably reserved.
#[async_trait]
pub trait AppointmentLedger: Send + Sync {
    async fn create_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Uuid, SchedulingError>;
}

/// Fire-and-forget audit trail. Implementations must never block or fail the
/// operation being audited.
pub trait AuditLog: Send + Sync {
    fn record(&self, event: AuditEvent);
}

// ==============================================================================
// HOSPITAL PLATFORM IMPLEMENTATIONS
// ==============================================================================

pub struct HttpDoctorDirectory {
    api: Arc<HospitalApiClient>,
}

impl HttpDoctorDirectory {
    pub fn new(api: Arc<HospitalApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DoctorDirectory for HttpDoctorDirectory {
    async fn find(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, SchedulingError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .api
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SchedulingError::Directory(e.to_string()))?;

        let Some(doctor) = result.first() else {
            return Ok(None);
        };

        Ok(Some(DoctorProfile {
            id: doctor_id,
            full_name: doctor["full_name"].as_str().unwrap_or("Unknown").to_string(),
            specialty: doctor["specialty"].as_str().unwrap_or("General").to_string(),
        }))
    }
}

pub struct HttpAppointmentLedger {
    api: Arc<HospitalApiClient>,
}

impl HttpAppointmentLedger {
    pub fn new(api: Arc<HospitalApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl AppointmentLedger for HttpAppointmentLedger {
    async fn create_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Uuid, SchedulingError> {
        debug!(
            "Creating ledger appointment for doctor {} on {}",
            appointment.doctor_id, appointment.date
        );

        let body = json!({
            "doctor_id": appointment.doctor_id,
            "patient_id": appointment.patient_id,
            "appointment_date": appointment.date,
            "start_time": appointment.start_time,
            "end_time": appointment.end_time,
            "booked_by": appointment.booked_by,
            "status": "confirmed",
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .api
            .request_with_headers(Method::POST, "/rest/v1/appointments", Some(body), Some(headers))
            .await
            .map_err(|e| SchedulingError::Ledger(e.to_string()))?;

        let id = result
            .first()
            .and_then(|appt| appt["id"].as_str())
            .ok_or_else(|| {
                SchedulingError::Ledger("ledger returned no appointment id".to_string())
            })?;

        Uuid::parse_str(id)
            .map_err(|e| SchedulingError::Ledger(format!("malformed appointment id: {}", e)))
    }
}

pub struct HttpAuditLog {
    api: Arc<HospitalApiClient>,
}

impl HttpAuditLog {
    pub fn new(api: Arc<HospitalApiClient>) -> Self {
        Self { api }
    }
}

impl AuditLog for HttpAuditLog {
    fn record(&self, event: AuditEvent) {
        let api = Arc::clone(&self.api);
        // Audit must never block the primary operation; the post runs on its
        // own task and failures are only logged.
        tokio::spawn(async move {
            let body = match serde_json::to_value(&event) {
                Ok(body) => body,
                Err(e) => {
                    warn!("Failed to serialize audit event: {}", e);
                    return;
                }
            };
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                "Prefer",
                reqwest::header::HeaderValue::from_static("return=representation"),
            );
            if let Err(e) = api
                .request_with_headers::<Vec<Value>>(
                    Method::POST,
                    "/rest/v1/audit_events",
                    Some(body),
                    Some(headers),
                )
                .await
            {
                warn!("Failed to deliver audit event: {}", e);
            }
        });
    }
}
