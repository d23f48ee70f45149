use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{NaiveDate, NaiveTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error};
use uuid::Uuid;

use crate::models::{
    AvailabilityQuery, AvailabilityRecord, SchedulingError, ScheduleKind, TimeSlot,
};
use crate::services::resolution::effective_availability;
use crate::slots::day_of_week;

/// Serialization key for mutations: every write that touches the same
/// doctor/date or doctor/weekday goes through the same critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LockKey {
    Date(Uuid, NaiveDate),
    Weekday(Uuid, i32),
}

/// Outcome of an atomic booking inside the store.
#[derive(Debug, Clone)]
pub struct BookedSlot {
    pub record_id: Uuid,
    pub slot: TimeSlot,
    pub materialized: bool,
}

/// In-process store for availability records.
///
/// Mutations serialize per `(doctor, date)` / `(doctor, weekday)` key and
/// commit inside a single write-guard critical section, so concurrent readers
/// observe either the pre- or post-state of an edit, never a half-applied
/// one. Records are superseded by deactivation, never deleted.
#[derive(Default)]
pub struct AvailabilityStore {
    records: RwLock<HashMap<Uuid, AvailabilityRecord>>,
    write_locks: StdMutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl AvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key_lock(&self, key: LockKey) -> Arc<Mutex<()>> {
        let mut locks = self
            .write_locks
            .lock()
            .expect("availability lock registry poisoned");
        locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Replace the active Single record for `(doctor, date)`: deactivate any
    /// existing one and insert the new record as one commit.
    pub async fn create_single(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slots: Vec<TimeSlot>,
        actor: Uuid,
    ) -> Result<AvailabilityRecord, SchedulingError> {
        let lock = self.key_lock(LockKey::Date(doctor_id, date));
        let _guard = lock.lock().await;

        let now = Utc::now();
        let mut records = self.records.write().await;

        let superseded =
            Self::sole_active_id(&records, doctor_id, ScheduleKind::Single, None, Some(date))?;
        if let Some(id) = superseded {
            if let Some(old) = records.get_mut(&id) {
                old.is_active = false;
                old.updated_by = actor;
                old.updated_at = now;
                debug!("Superseded single availability record {} for {}", id, date);
            }
        }

        let record = AvailabilityRecord {
            id: Uuid::new_v4(),
            doctor_id,
            kind: ScheduleKind::Single,
            day_of_week: None,
            date: Some(date),
            time_slots: slots,
            is_active: true,
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
        };
        Self::assert_no_active(
            &records,
            doctor_id,
            ScheduleKind::Single,
            None,
            Some(date),
            None,
        )?;
        records.insert(record.id, record.clone());

        debug!(
            "Created single availability record {} for doctor {} on {}",
            record.id, doctor_id, date
        );
        Ok(record)
    }

    /// Create the weekly template record for `(doctor, day_of_week)`, or
    /// overwrite the existing one. A previously superseded record is
    /// reactivated rather than duplicated, so repeated weekly edits never
    /// accumulate rows.
    pub async fn upsert_recurring(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
        slots: Vec<TimeSlot>,
        actor: Uuid,
    ) -> Result<AvailabilityRecord, SchedulingError> {
        let lock = self.key_lock(LockKey::Weekday(doctor_id, day_of_week));
        let _guard = lock.lock().await;

        let now = Utc::now();
        let mut records = self.records.write().await;

        // Supersede the current template first; it then becomes the inactive
        // match below, so repeated edits recycle one record instead of
        // accumulating rows.
        if let Some(id) = Self::sole_active_id(
            &records,
            doctor_id,
            ScheduleKind::Recurring,
            Some(day_of_week),
            None,
        )? {
            if let Some(old) = records.get_mut(&id) {
                old.is_active = false;
                old.updated_by = actor;
                old.updated_at = now;
            }
        }

        let reactivate = records
            .values()
            .filter(|r| {
                !r.is_active
                    && r.doctor_id == doctor_id
                    && r.kind == ScheduleKind::Recurring
                    && r.day_of_week == Some(day_of_week)
            })
            .max_by_key(|r| r.updated_at)
            .map(|r| r.id);

        if let Some(id) = reactivate {
            Self::assert_no_active(
                &records,
                doctor_id,
                ScheduleKind::Recurring,
                Some(day_of_week),
                None,
                Some(id),
            )?;
            let record = records
                .get_mut(&id)
                .ok_or_else(|| SchedulingError::StateInvariant("record vanished mid-write".into()))?;
            if record.time_slots.iter().any(|slot| slot.is_booked) {
                error!("Recurring template {} carries a booked slot", id);
                return Err(SchedulingError::StateInvariant(format!(
                    "recurring template {} carries a booked slot",
                    id
                )));
            }
            record.is_active = true;
            record.time_slots = slots;
            record.updated_by = actor;
            record.updated_at = now;
            debug!(
                "Reactivated recurring availability {} for weekday {}",
                id, day_of_week
            );
            return Ok(record.clone());
        }

        let record = AvailabilityRecord {
            id: Uuid::new_v4(),
            doctor_id,
            kind: ScheduleKind::Recurring,
            day_of_week: Some(day_of_week),
            date: None,
            time_slots: slots,
            is_active: true,
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
        };
        Self::assert_no_active(
            &records,
            doctor_id,
            ScheduleKind::Recurring,
            Some(day_of_week),
            None,
            None,
        )?;
        records.insert(record.id, record.clone());

        debug!(
            "Created recurring availability record {} for doctor {} weekday {}",
            record.id, doctor_id, day_of_week
        );
        Ok(record)
    }

    /// Remove one unbooked slot from a record. Booked slots are immovable.
    pub async fn remove_slot(
        &self,
        record_id: Uuid,
        index: usize,
        actor: Uuid,
    ) -> Result<AvailabilityRecord, SchedulingError> {
        let key = {
            let records = self.records.read().await;
            let record = records
                .get(&record_id)
                .ok_or_else(|| SchedulingError::NotFound(format!("availability record {}", record_id)))?;
            Self::record_key(record)
        };

        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let mut records = self.records.write().await;
        let record = records
            .get(&record_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("availability record {}", record_id)))?;

        if !record.is_active {
            return Err(SchedulingError::Conflict(
                "cannot edit a superseded availability record".to_string(),
            ));
        }
        let slot = record.time_slots.get(index).ok_or_else(|| {
            SchedulingError::NotFound(format!("slot {} on record {}", index, record_id))
        })?;
        if slot.is_booked {
            return Err(SchedulingError::Conflict(
                "cannot remove a booked slot".to_string(),
            ));
        }

        let record = records
            .get_mut(&record_id)
            .ok_or_else(|| SchedulingError::StateInvariant("record vanished mid-write".into()))?;
        record.time_slots.remove(index);
        record.updated_by = actor;
        record.updated_at = Utc::now();

        debug!("Removed slot {} from record {}", index, record_id);
        Ok(record.clone())
    }

    /// Atomically convert a resolved free slot into a booked one.
    ///
    /// Runs the whole resolve-then-write cycle inside the `(doctor, date)`
    /// critical section: when the effective slot comes from the weekly
    /// template, a Single record for the date is materialized with the target
    /// slot already booked, in the same commit. The template itself is never
    /// touched.
    pub async fn book_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        actor: Uuid,
    ) -> Result<BookedSlot, SchedulingError> {
        let lock = self.key_lock(LockKey::Date(doctor_id, date));
        let _guard = lock.lock().await;

        let now = Utc::now();
        let mut records = self.records.write().await;

        let single_id =
            Self::sole_active_id(&records, doctor_id, ScheduleKind::Single, None, Some(date))?;
        let recurring_id = Self::sole_active_id(
            &records,
            doctor_id,
            ScheduleKind::Recurring,
            Some(day_of_week(date)),
            None,
        )?;

        let effective = effective_availability(
            single_id.and_then(|id| records.get(&id)),
            recurring_id.and_then(|id| records.get(&id)),
        );

        if !effective.available
            || !effective
                .slots
                .iter()
                .any(|slot| slot.matches(start_time, end_time))
        {
            return Err(SchedulingError::Conflict("slot unavailable".to_string()));
        }

        match (effective.kind, effective.record_id) {
            (Some(ScheduleKind::Single), Some(record_id)) => {
                let record = records.get_mut(&record_id).ok_or_else(|| {
                    SchedulingError::StateInvariant("record vanished mid-write".into())
                })?;
                let slot = record
                    .time_slots
                    .iter_mut()
                    .find(|slot| slot.matches(start_time, end_time))
                    .ok_or_else(|| SchedulingError::Conflict("slot unavailable".to_string()))?;
                if slot.is_booked {
                    return Err(SchedulingError::Conflict("slot already booked".to_string()));
                }
                slot.is_booked = true;
                let booked = slot.clone();
                record.updated_by = actor;
                record.updated_at = now;

                debug!(
                    "Booked slot {}-{} on single record {}",
                    start_time, end_time, record_id
                );
                Ok(BookedSlot {
                    record_id,
                    slot: booked,
                    materialized: false,
                })
            }
            (Some(ScheduleKind::Recurring), Some(template_id)) => {
                let template = records.get(&template_id).ok_or_else(|| {
                    SchedulingError::StateInvariant("record vanished mid-write".into())
                })?;
                let mut slots = template.time_slots.clone();
                let slot = slots
                    .iter_mut()
                    .find(|slot| slot.matches(start_time, end_time))
                    .ok_or_else(|| SchedulingError::Conflict("slot unavailable".to_string()))?;
                slot.is_booked = true;
                let booked = slot.clone();

                Self::assert_no_active(
                    &records,
                    doctor_id,
                    ScheduleKind::Single,
                    None,
                    Some(date),
                    None,
                )?;
                let record = AvailabilityRecord {
                    id: Uuid::new_v4(),
                    doctor_id,
                    kind: ScheduleKind::Single,
                    day_of_week: None,
                    date: Some(date),
                    time_slots: slots,
                    is_active: true,
                    created_by: actor,
                    updated_by: actor,
                    created_at: now,
                    updated_at: now,
                };
                let record_id = record.id;
                records.insert(record_id, record);

                debug!(
                    "Materialized single record {} from template {} and booked {}-{}",
                    record_id, template_id, start_time, end_time
                );
                Ok(BookedSlot {
                    record_id,
                    slot: booked,
                    materialized: true,
                })
            }
            _ => Err(SchedulingError::Conflict("slot unavailable".to_string())),
        }
    }

    /// Flip a booked slot back to free. Compensation path for ledger
    /// failures; not reachable from the public surface.
    pub async fn release_slot(
        &self,
        record_id: Uuid,
        start_time: NaiveTime,
        end_time: NaiveTime,
        actor: Uuid,
    ) -> Result<(), SchedulingError> {
        let key = {
            let records = self.records.read().await;
            let record = records
                .get(&record_id)
                .ok_or_else(|| SchedulingError::NotFound(format!("availability record {}", record_id)))?;
            Self::record_key(record)
        };

        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let mut records = self.records.write().await;
        let record = records
            .get_mut(&record_id)
            .ok_or_else(|| SchedulingError::NotFound(format!("availability record {}", record_id)))?;
        let slot = record
            .time_slots
            .iter_mut()
            .find(|slot| slot.matches(start_time, end_time))
            .ok_or_else(|| {
                SchedulingError::NotFound(format!(
                    "slot {}-{} on record {}",
                    start_time, end_time, record_id
                ))
            })?;
        if !slot.is_booked {
            return Err(SchedulingError::Conflict("slot is not booked".to_string()));
        }
        slot.is_booked = false;
        record.updated_by = actor;
        record.updated_at = Utc::now();

        debug!("Released slot {}-{} on record {}", start_time, end_time, record_id);
        Ok(())
    }

    pub async fn get(&self, record_id: Uuid) -> Option<AvailabilityRecord> {
        self.records.read().await.get(&record_id).cloned()
    }

    /// Filtered snapshot, ordered by `(kind, day_of_week, date)`.
    pub async fn query(&self, filter: &AvailabilityQuery) -> Vec<AvailabilityRecord> {
        let records = self.records.read().await;
        let mut matches: Vec<AvailabilityRecord> = records
            .values()
            .filter(|r| {
                (!filter.active_only || r.is_active)
                    && filter.doctor_id.map_or(true, |id| r.doctor_id == id)
                    && filter.kind.map_or(true, |kind| r.kind == kind)
                    && filter.date.map_or(true, |date| r.date == Some(date))
                    && filter
                        .day_of_week
                        .map_or(true, |dow| r.day_of_week == Some(dow))
            })
            .cloned()
            .collect();
        matches.sort_by_key(|r| r.sort_key());
        matches
    }

    /// The active Single record for `(doctor, date)`, if any. More than one
    /// is store corruption and surfaces as an error.
    pub async fn active_single_for(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityRecord>, SchedulingError> {
        let records = self.records.read().await;
        let id = Self::sole_active_id(&records, doctor_id, ScheduleKind::Single, None, Some(date))?;
        Ok(id.and_then(|id| records.get(&id).cloned()))
    }

    /// The active Recurring record for `(doctor, day_of_week)`, if any.
    pub async fn active_recurring_for(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
    ) -> Result<Option<AvailabilityRecord>, SchedulingError> {
        let records = self.records.read().await;
        let id = Self::sole_active_id(
            &records,
            doctor_id,
            ScheduleKind::Recurring,
            Some(day_of_week),
            None,
        )?;
        Ok(id.and_then(|id| records.get(&id).cloned()))
    }

    fn record_key(record: &AvailabilityRecord) -> LockKey {
        match (record.kind, record.date, record.day_of_week) {
            (ScheduleKind::Single, Some(date), _) => LockKey::Date(record.doctor_id, date),
            (ScheduleKind::Recurring, _, Some(dow)) => LockKey::Weekday(record.doctor_id, dow),
            // A record violating the kind/field pairing cannot be keyed more
            // precisely than by doctor and date epoch; never expected.
            _ => LockKey::Date(record.doctor_id, NaiveDate::MIN),
        }
    }

    fn matching_active_ids(
        records: &HashMap<Uuid, AvailabilityRecord>,
        doctor_id: Uuid,
        kind: ScheduleKind,
        day_of_week: Option<i32>,
        date: Option<NaiveDate>,
    ) -> Vec<Uuid> {
        records
            .values()
            .filter(|r| {
                r.is_active
                    && r.doctor_id == doctor_id
                    && r.kind == kind
                    && day_of_week.map_or(true, |dow| r.day_of_week == Some(dow))
                    && date.map_or(true, |d| r.date == Some(d))
            })
            .map(|r| r.id)
            .collect()
    }

    fn sole_active_id(
        records: &HashMap<Uuid, AvailabilityRecord>,
        doctor_id: Uuid,
        kind: ScheduleKind,
        day_of_week: Option<i32>,
        date: Option<NaiveDate>,
    ) -> Result<Option<Uuid>, SchedulingError> {
        let mut ids = Self::matching_active_ids(records, doctor_id, kind, day_of_week, date);
        if ids.len() > 1 {
            error!(
                "Found {} active {} records for doctor {} (day_of_week {:?}, date {:?})",
                ids.len(),
                kind,
                doctor_id,
                day_of_week,
                date
            );
            return Err(SchedulingError::StateInvariant(format!(
                "found {} active {} records for a single-active key",
                ids.len(),
                kind
            )));
        }
        Ok(ids.pop())
    }

    /// Uniqueness backstop, checked inside the write guard immediately before
    /// a record is activated: no other active record may hold the same key.
    fn assert_no_active(
        records: &HashMap<Uuid, AvailabilityRecord>,
        doctor_id: Uuid,
        kind: ScheduleKind,
        day_of_week: Option<i32>,
        date: Option<NaiveDate>,
        exclude: Option<Uuid>,
    ) -> Result<(), SchedulingError> {
        let conflicting = Self::matching_active_ids(records, doctor_id, kind, day_of_week, date)
            .into_iter()
            .filter(|id| Some(*id) != exclude)
            .count();
        if conflicting > 0 {
            error!(
                "Uniqueness constraint violation: {} active {} records already exist for doctor {}",
                conflicting, kind, doctor_id
            );
            return Err(SchedulingError::StateInvariant(format!(
                "an active {} record already exists for this key",
                kind
            )));
        }
        Ok(())
    }
}
