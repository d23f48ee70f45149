use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AvailabilityRecord, DayAvailability, ResolvedAvailability, SchedulingError, ScheduleKind,
    TimeSlot,
};
use crate::slots::day_of_week;
use crate::store::AvailabilityStore;

const MAX_RANGE_DAYS: i64 = 366;

/// Effective availability for one doctor-date, as derived from the records
/// that currently apply.
#[derive(Debug, Clone)]
pub struct Effective {
    pub available: bool,
    pub kind: Option<ScheduleKind>,
    pub record_id: Option<Uuid>,
    pub slots: Vec<TimeSlot>,
}

impl Effective {
    fn unavailable() -> Self {
        Self {
            available: false,
            kind: None,
            record_id: None,
            slots: Vec::new(),
        }
    }
}

/// The one place the precedence law lives: Single overrides Recurring
/// overrides nothing. An empty Single is an explicit block; the weekly
/// template is never consulted behind it. Only unbooked slots surface.
pub fn effective_availability(
    single: Option<&AvailabilityRecord>,
    recurring: Option<&AvailabilityRecord>,
) -> Effective {
    if let Some(record) = single {
        if record.time_slots.is_empty() {
            return Effective::unavailable();
        }
        return Effective {
            available: true,
            kind: Some(ScheduleKind::Single),
            record_id: Some(record.id),
            slots: record.unbooked_slots(),
        };
    }

    if let Some(record) = recurring {
        if !record.time_slots.is_empty() {
            return Effective {
                available: true,
                kind: Some(ScheduleKind::Recurring),
                record_id: Some(record.id),
                slots: record.unbooked_slots(),
            };
        }
    }

    Effective::unavailable()
}

pub struct ResolutionService {
    store: Arc<AvailabilityStore>,
}

impl ResolutionService {
    pub fn new(store: Arc<AvailabilityStore>) -> Self {
        Self { store }
    }

    /// Effective availability for `(doctor, date)`.
    pub async fn resolve(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<ResolvedAvailability, SchedulingError> {
        let dow = day_of_week(date);

        let single = self.store.active_single_for(doctor_id, date).await?;
        let recurring = match single {
            // A date override, block or not, settles the question by itself.
            Some(_) => None,
            None => self.store.active_recurring_for(doctor_id, dow).await?,
        };

        let effective = effective_availability(single.as_ref(), recurring.as_ref());
        debug!(
            "Resolved doctor {} on {}: available={} type={:?} ({} slots)",
            doctor_id,
            date,
            effective.available,
            effective.kind,
            effective.slots.len()
        );

        Ok(ResolvedAvailability {
            available: effective.available,
            day_of_week: dow,
            availability_type: effective.kind,
            slots: effective.slots,
        })
    }

    /// Per-day resolution over an inclusive date range.
    pub async fn resolve_range(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DayAvailability>, SchedulingError> {
        if start_date > end_date {
            return Err(SchedulingError::invalid(
                "start_date",
                "must not be after end_date",
            ));
        }
        let span = (end_date - start_date).num_days();
        if span >= MAX_RANGE_DAYS {
            return Err(SchedulingError::invalid(
                "end_date",
                format!("range cannot exceed {} days", MAX_RANGE_DAYS),
            ));
        }

        let mut days = Vec::with_capacity(span as usize + 1);
        for date in start_date.iter_days().take(span as usize + 1) {
            let resolved = self.resolve(doctor_id, date).await?;
            days.push(DayAvailability {
                date,
                available: resolved.available,
                slots: resolved.slots,
            });
        }
        Ok(days)
    }
}
