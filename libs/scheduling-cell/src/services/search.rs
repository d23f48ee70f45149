use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::external::DoctorDirectory;
use crate::models::{
    AvailabilityQuery, AvailabilityRecord, AvailabilitySearchResult, SchedulingError, ScheduleKind,
};
use crate::slots::day_of_week;
use crate::store::AvailabilityStore;

pub struct SearchService {
    store: Arc<AvailabilityStore>,
    directory: Arc<dyn DoctorDirectory>,
}

impl SearchService {
    pub fn new(store: Arc<AvailabilityStore>, directory: Arc<dyn DoctorDirectory>) -> Self {
        Self { store, directory }
    }

    /// Availability search across doctors. At least one criterion is
    /// required; with neither a date nor a name the result is empty.
    pub async fn search(
        &self,
        date: Option<NaiveDate>,
        name: Option<&str>,
    ) -> Result<Vec<AvailabilitySearchResult>, SchedulingError> {
        match (date, name) {
            (Some(date), name) => self.search_by_date(date, name).await,
            (None, Some(name)) => self.search_by_name(name).await,
            (None, None) => Ok(Vec::new()),
        }
    }

    /// Date search: date overrides enter the result set before weekly
    /// templates, a blocked doctor's template never enters at all, and the
    /// name filter runs over the assembled set.
    async fn search_by_date(
        &self,
        date: NaiveDate,
        name: Option<&str>,
    ) -> Result<Vec<AvailabilitySearchResult>, SchedulingError> {
        debug!("Searching availability for date {}", date);

        let singles = self
            .store
            .query(&AvailabilityQuery {
                kind: Some(ScheduleKind::Single),
                date: Some(date),
                active_only: true,
                ..Default::default()
            })
            .await;
        let recurrings = self
            .store
            .query(&AvailabilityQuery {
                kind: Some(ScheduleKind::Recurring),
                day_of_week: Some(day_of_week(date)),
                active_only: true,
                ..Default::default()
            })
            .await;

        let blocked: HashSet<Uuid> = singles
            .iter()
            .filter(|r| r.is_block())
            .map(|r| r.doctor_id)
            .collect();

        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut entries: Vec<&AvailabilityRecord> = Vec::new();

        for record in singles.iter().filter(|r| !r.time_slots.is_empty()) {
            if seen.insert(record.doctor_id) {
                entries.push(record);
            }
        }
        for record in &recurrings {
            if blocked.contains(&record.doctor_id) {
                continue;
            }
            if seen.insert(record.doctor_id) {
                entries.push(record);
            }
        }

        let mut results = Vec::new();
        for record in entries {
            let unbooked = record.unbooked_slots();
            if unbooked.is_empty() {
                continue;
            }
            let Some(profile) = self.directory.find(record.doctor_id).await? else {
                warn!("Doctor not found in directory: {}", record.doctor_id);
                continue;
            };
            if let Some(needle) = name {
                if !Self::name_matches(&profile.full_name, needle) {
                    continue;
                }
            }
            results.push(AvailabilitySearchResult {
                doctor: profile,
                availability_type: record.kind,
                slots: unbooked,
            });
        }

        debug!("Date search returned {} doctors", results.len());
        Ok(results)
    }

    /// Name-only search: scan every active record, keep the first record per
    /// doctor, and match case-insensitively on the doctor's name.
    async fn search_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<AvailabilitySearchResult>, SchedulingError> {
        debug!("Searching availability by name '{}'", name);

        let records = self
            .store
            .query(&AvailabilityQuery {
                active_only: true,
                ..Default::default()
            })
            .await;

        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut results = Vec::new();

        for record in &records {
            if !seen.insert(record.doctor_id) {
                continue;
            }
            let Some(profile) = self.directory.find(record.doctor_id).await? else {
                warn!("Doctor not found in directory: {}", record.doctor_id);
                continue;
            };
            if !Self::name_matches(&profile.full_name, name) {
                continue;
            }
            results.push(AvailabilitySearchResult {
                doctor: profile,
                availability_type: record.kind,
                slots: record.unbooked_slots(),
            });
        }

        debug!("Name search returned {} doctors", results.len());
        Ok(results)
    }

    fn name_matches(full_name: &str, needle: &str) -> bool {
        full_name.to_lowercase().contains(&needle.to_lowercase())
    }
}
