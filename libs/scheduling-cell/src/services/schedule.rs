use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};
use uuid::Uuid;

use crate::external::AuditLog;
use crate::models::{
    AuditAction, AuditEvent, AvailabilityQuery, AvailabilityRecord, SchedulingError,
    SetRecurringRequest, SetSingleRequest, TimeSlot,
};
use crate::slots::{self, DEFAULT_SLOT_MINUTES};
use crate::store::AvailabilityStore;

/// Doctor-initiated schedule edits: weekly template updates, date-specific
/// overrides, date blocks and slot removal.
pub struct ScheduleService {
    store: Arc<AvailabilityStore>,
    audit: Arc<dyn AuditLog>,
}

impl ScheduleService {
    pub fn new(store: Arc<AvailabilityStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self { store, audit }
    }

    /// Replace the override for one date. An empty slot list is a block.
    pub async fn set_single(
        &self,
        doctor_id: Uuid,
        request: SetSingleRequest,
        actor: Uuid,
    ) -> Result<AvailabilityRecord, SchedulingError> {
        debug!(
            "Setting single availability for doctor {} on {}",
            doctor_id, request.date
        );

        let slots = slots::build_slots(&request.slots)?;
        let record = self
            .audited(
                AuditAction::SetSingle,
                doctor_id,
                actor,
                self.store.create_single(doctor_id, request.date, slots, actor),
            )
            .await?;
        Ok(record)
    }

    /// Replace the weekly template for every day named in the request.
    /// Multiple windows for the same day merge into one record.
    pub async fn set_recurring(
        &self,
        doctor_id: Uuid,
        request: SetRecurringRequest,
        actor: Uuid,
    ) -> Result<Vec<AvailabilityRecord>, SchedulingError> {
        if request.schedule.is_empty() {
            return Err(SchedulingError::invalid(
                "schedule",
                "must contain at least one day",
            ));
        }

        let mut per_day: BTreeMap<i32, Vec<TimeSlot>> = BTreeMap::new();
        for entry in &request.schedule {
            if !(0..=6).contains(&entry.day_of_week) {
                return Err(SchedulingError::invalid(
                    "day_of_week",
                    "must be between 0 (Sunday) and 6 (Saturday)",
                ));
            }
            let slot_minutes = entry.slot_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);
            let slots = slots::slots_from_range(entry.start_time, entry.end_time, slot_minutes)?;
            per_day.entry(entry.day_of_week).or_default().extend(slots);
        }

        let mut records = Vec::with_capacity(per_day.len());
        for (day_of_week, slots) in per_day {
            let slots = slots::validate_slot_list(slots)?;
            let record = self
                .audited(
                    AuditAction::SetRecurring,
                    doctor_id,
                    actor,
                    self.store.upsert_recurring(doctor_id, day_of_week, slots, actor),
                )
                .await?;
            records.push(record);
        }

        info!(
            "Weekly template updated for doctor {} ({} days)",
            doctor_id,
            records.len()
        );
        Ok(records)
    }

    /// Mark a date explicitly unavailable, regardless of the weekly template.
    pub async fn block(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        actor: Uuid,
    ) -> Result<AvailabilityRecord, SchedulingError> {
        debug!("Blocking doctor {} on {}", doctor_id, date);

        self.audited(
            AuditAction::BlockDate,
            doctor_id,
            actor,
            self.store.create_single(doctor_id, date, Vec::new(), actor),
        )
        .await
    }

    pub async fn remove_slot(
        &self,
        record_id: Uuid,
        index: usize,
        actor: Uuid,
    ) -> Result<AvailabilityRecord, SchedulingError> {
        let record = self.store.remove_slot(record_id, index, actor).await?;

        self.audit.record(AuditEvent::success(
            actor,
            AuditAction::RemoveSlot,
            record.doctor_id,
            Some(record.id),
        ));
        Ok(record)
    }

    /// Run a store edit and audit its outcome either way.
    async fn audited<F>(
        &self,
        action: AuditAction,
        doctor_id: Uuid,
        actor: Uuid,
        op: F,
    ) -> Result<AvailabilityRecord, SchedulingError>
    where
        F: std::future::Future<Output = Result<AvailabilityRecord, SchedulingError>>,
    {
        match op.await {
            Ok(record) => {
                self.audit.record(AuditEvent::success(
                    actor,
                    action,
                    doctor_id,
                    Some(record.id),
                ));
                Ok(record)
            }
            Err(err) => {
                self.audit.record(AuditEvent::failure(
                    actor,
                    action,
                    doctor_id,
                    err.to_string(),
                ));
                Err(err)
            }
        }
    }

    /// A doctor's availability records in presentation order.
    pub async fn list_records(
        &self,
        doctor_id: Uuid,
        include_inactive: bool,
    ) -> Vec<AvailabilityRecord> {
        self.store
            .query(&AvailabilityQuery {
                doctor_id: Some(doctor_id),
                active_only: !include_inactive,
                ..Default::default()
            })
            .await
    }
}
