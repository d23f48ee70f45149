mod support;

use std::sync::Arc;

use uuid::Uuid;

use scheduling_cell::models::{ScheduleKind, SetSingleRequest, SlotInput};
use scheduling_cell::services::{ScheduleService, SearchService};
use scheduling_cell::store::AvailabilityStore;

use support::{d, t, weekly, RecordingAudit, StubDirectory};

struct Fixture {
    store: Arc<AvailabilityStore>,
    schedule: ScheduleService,
    actor: Uuid,
}

fn fixture() -> Fixture {
    let store = Arc::new(AvailabilityStore::new());
    Fixture {
        schedule: ScheduleService::new(store.clone(), Arc::new(RecordingAudit::new())),
        store,
        actor: Uuid::new_v4(),
    }
}

fn search_service(f: &Fixture, directory: StubDirectory) -> SearchService {
    SearchService::new(f.store.clone(), Arc::new(directory))
}

fn single(date_day: u32, starts: &[u32]) -> SetSingleRequest {
    SetSingleRequest {
        date: d(2025, 12, date_day),
        slots: starts
            .iter()
            .map(|&h| SlotInput {
                start_time: t(h, 0),
                end_time: None,
            })
            .collect(),
    }
}

#[tokio::test]
async fn date_search_prefers_overrides_and_filters_by_name() {
    let f = fixture();
    let sam = Uuid::new_v4();
    let alice = Uuid::new_v4();
    let directory = StubDirectory::new()
        .with_doctor(sam, "Dr. Sam Carter", "Cardiology")
        .with_doctor(alice, "Dr. Alice Wong", "Dermatology");

    // both doctors work Mondays; Sam also has a two-slot override for Dec 1
    f.schedule
        .set_recurring(sam, weekly(1, t(9, 0), t(17, 0)), f.actor)
        .await
        .unwrap();
    f.schedule
        .set_recurring(alice, weekly(1, t(9, 0), t(17, 0)), f.actor)
        .await
        .unwrap();
    f.schedule
        .set_single(sam, single(1, &[10, 11]), f.actor)
        .await
        .unwrap();

    let results = search_service(&f, directory)
        .search(Some(d(2025, 12, 1)), Some("sam"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].doctor.id, sam);
    assert_eq!(results[0].availability_type, ScheduleKind::Single);
    assert_eq!(results[0].slots.len(), 2, "the override wins over the template");
}

#[tokio::test]
async fn date_search_lists_overrides_before_templates() {
    let f = fixture();
    let overridden = Uuid::new_v4();
    let templated = Uuid::new_v4();
    let directory = StubDirectory::new()
        .with_doctor(overridden, "Dr. Maria Ortiz", "Oncology")
        .with_doctor(templated, "Dr. Ben Adler", "Cardiology");

    f.schedule
        .set_recurring(templated, weekly(1, t(9, 0), t(12, 0)), f.actor)
        .await
        .unwrap();
    f.schedule
        .set_single(overridden, single(1, &[14]), f.actor)
        .await
        .unwrap();

    let results = search_service(&f, directory)
        .search(Some(d(2025, 12, 1)), None)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].doctor.id, overridden);
    assert_eq!(results[1].doctor.id, templated);
}

#[tokio::test]
async fn blocked_doctors_are_excluded_from_date_search() {
    let f = fixture();
    let doctor = Uuid::new_v4();
    let directory = StubDirectory::new().with_doctor(doctor, "Dr. Sam Carter", "Cardiology");

    f.schedule
        .set_recurring(doctor, weekly(1, t(9, 0), t(17, 0)), f.actor)
        .await
        .unwrap();
    f.schedule.block(doctor, d(2025, 12, 1), f.actor).await.unwrap();

    let results = search_service(&f, directory)
        .search(Some(d(2025, 12, 1)), None)
        .await
        .unwrap();

    assert!(results.is_empty(), "a block hides the weekly template too");
}

#[tokio::test]
async fn fully_booked_doctors_are_dropped_from_date_search() {
    let f = fixture();
    let doctor = Uuid::new_v4();
    let directory = StubDirectory::new().with_doctor(doctor, "Dr. Sam Carter", "Cardiology");

    f.schedule
        .set_single(doctor, single(1, &[10]), f.actor)
        .await
        .unwrap();
    f.store
        .book_slot(doctor, d(2025, 12, 1), t(10, 0), t(11, 0), f.actor)
        .await
        .unwrap();

    let results = search_service(&f, directory)
        .search(Some(d(2025, 12, 1)), None)
        .await
        .unwrap();

    assert!(results.is_empty());
}

#[tokio::test]
async fn name_search_deduplicates_by_doctor() {
    let f = fixture();
    let doctor = Uuid::new_v4();
    let directory = StubDirectory::new().with_doctor(doctor, "Dr. Sam Carter", "Cardiology");

    f.schedule
        .set_recurring(doctor, weekly(1, t(9, 0), t(12, 0)), f.actor)
        .await
        .unwrap();
    f.schedule
        .set_recurring(doctor, weekly(3, t(13, 0), t(17, 0)), f.actor)
        .await
        .unwrap();

    let results = search_service(&f, directory)
        .search(None, Some("CARTER"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1, "one entry per doctor, first record kept");
    assert_eq!(results[0].availability_type, ScheduleKind::Recurring);
    assert_eq!(results[0].slots.len(), 3);
}

#[tokio::test]
async fn name_search_is_case_insensitive_substring() {
    let f = fixture();
    let sam = Uuid::new_v4();
    let alice = Uuid::new_v4();
    let directory = StubDirectory::new()
        .with_doctor(sam, "Dr. Sam Carter", "Cardiology")
        .with_doctor(alice, "Dr. Alice Wong", "Dermatology");

    f.schedule
        .set_recurring(sam, weekly(1, t(9, 0), t(12, 0)), f.actor)
        .await
        .unwrap();
    f.schedule
        .set_recurring(alice, weekly(1, t(9, 0), t(12, 0)), f.actor)
        .await
        .unwrap();

    let results = search_service(&f, directory)
        .search(None, Some("won"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].doctor.id, alice);
}

#[tokio::test]
async fn search_without_criteria_is_empty() {
    let f = fixture();
    let doctor = Uuid::new_v4();
    let directory = StubDirectory::new().with_doctor(doctor, "Dr. Sam Carter", "Cardiology");

    f.schedule
        .set_recurring(doctor, weekly(1, t(9, 0), t(12, 0)), f.actor)
        .await
        .unwrap();

    let results = search_service(&f, directory).search(None, None).await.unwrap();

    assert!(results.is_empty());
}

#[tokio::test]
async fn doctors_missing_from_the_directory_are_skipped() {
    let f = fixture();
    let known = Uuid::new_v4();
    let unknown = Uuid::new_v4();
    let directory = StubDirectory::new().with_doctor(known, "Dr. Sam Carter", "Cardiology");

    f.schedule
        .set_recurring(known, weekly(1, t(9, 0), t(12, 0)), f.actor)
        .await
        .unwrap();
    f.schedule
        .set_recurring(unknown, weekly(1, t(9, 0), t(12, 0)), f.actor)
        .await
        .unwrap();

    let results = search_service(&f, directory)
        .search(Some(d(2025, 12, 1)), None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].doctor.id, known);
}
