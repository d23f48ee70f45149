#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use scheduling_cell::external::{AppointmentLedger, AuditLog, DoctorDirectory};
use scheduling_cell::models::{
    AuditEvent, DoctorProfile, NewAppointment, SchedulingError, SetRecurringRequest,
    WeeklyScheduleEntry,
};

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// One-day weekly template request with hourly slots.
pub fn weekly(day_of_week: i32, start: NaiveTime, end: NaiveTime) -> SetRecurringRequest {
    SetRecurringRequest {
        schedule: vec![WeeklyScheduleEntry {
            day_of_week,
            start_time: start,
            end_time: end,
            slot_minutes: None,
        }],
    }
}

#[derive(Default)]
pub struct StubDirectory {
    doctors: HashMap<Uuid, DoctorProfile>,
}

impl StubDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doctor(mut self, id: Uuid, full_name: &str, specialty: &str) -> Self {
        self.doctors.insert(
            id,
            DoctorProfile {
                id,
                full_name: full_name.to_string(),
                specialty: specialty.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl DoctorDirectory for StubDirectory {
    async fn find(&self, doctor_id: Uuid) -> Result<Option<DoctorProfile>, SchedulingError> {
        Ok(self.doctors.get(&doctor_id).cloned())
    }
}

#[derive(Default)]
pub struct StubLedger {
    pub fail: bool,
    pub created: Mutex<Vec<NewAppointment>>,
}

impl StubLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl AppointmentLedger for StubLedger {
    async fn create_appointment(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Uuid, SchedulingError> {
        if self.fail {
            return Err(SchedulingError::Ledger("ledger unavailable".to_string()));
        }
        self.created.lock().unwrap().push(appointment.clone());
        Ok(Uuid::new_v4())
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    pub events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for RecordingAudit {
    fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}
