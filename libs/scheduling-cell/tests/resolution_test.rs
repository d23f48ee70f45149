mod support;

use std::sync::Arc;

use assert_matches::assert_matches;
use uuid::Uuid;

use scheduling_cell::models::{SchedulingError, ScheduleKind, SetSingleRequest, SlotInput};
use scheduling_cell::services::{ResolutionService, ScheduleService};
use scheduling_cell::store::AvailabilityStore;

use support::{d, t, weekly, RecordingAudit};

struct Fixture {
    schedule: ScheduleService,
    resolution: ResolutionService,
    store: Arc<AvailabilityStore>,
    doctor: Uuid,
    actor: Uuid,
}

fn fixture() -> Fixture {
    let store = Arc::new(AvailabilityStore::new());
    Fixture {
        schedule: ScheduleService::new(store.clone(), Arc::new(RecordingAudit::new())),
        resolution: ResolutionService::new(store.clone()),
        store,
        doctor: Uuid::new_v4(),
        actor: Uuid::new_v4(),
    }
}

fn slot(start_h: u32, end_h: u32) -> SlotInput {
    SlotInput {
        start_time: t(start_h, 0),
        end_time: Some(t(end_h, 0)),
    }
}

#[tokio::test]
async fn weekly_template_resolves_for_matching_weekday() {
    let f = fixture();
    f.schedule
        .set_recurring(f.doctor, weekly(1, t(9, 0), t(17, 0)), f.actor)
        .await
        .unwrap();

    // 2025-12-01 is a Monday
    let resolved = f.resolution.resolve(f.doctor, d(2025, 12, 1)).await.unwrap();

    assert!(resolved.available);
    assert_eq!(resolved.day_of_week, 1);
    assert_eq!(resolved.availability_type, Some(ScheduleKind::Recurring));
    assert_eq!(resolved.slots.len(), 8);
    assert_eq!(resolved.slots[0].start_time, t(9, 0));
    assert_eq!(resolved.slots[7].end_time, t(17, 0));
}

#[tokio::test]
async fn other_weekdays_stay_unavailable() {
    let f = fixture();
    f.schedule
        .set_recurring(f.doctor, weekly(1, t(9, 0), t(17, 0)), f.actor)
        .await
        .unwrap();

    // 2025-12-02 is a Tuesday
    let resolved = f.resolution.resolve(f.doctor, d(2025, 12, 2)).await.unwrap();

    assert!(!resolved.available);
    assert!(resolved.slots.is_empty());
}

#[tokio::test]
async fn date_override_takes_precedence_over_template() {
    let f = fixture();
    f.schedule
        .set_recurring(f.doctor, weekly(1, t(9, 0), t(17, 0)), f.actor)
        .await
        .unwrap();
    f.schedule
        .set_single(
            f.doctor,
            SetSingleRequest {
                date: d(2025, 12, 1),
                slots: vec![slot(10, 11), slot(11, 12)],
            },
            f.actor,
        )
        .await
        .unwrap();

    let resolved = f.resolution.resolve(f.doctor, d(2025, 12, 1)).await.unwrap();

    assert!(resolved.available);
    assert_eq!(resolved.availability_type, Some(ScheduleKind::Single));
    assert_eq!(resolved.slots.len(), 2, "template slots never leak through");

    // the next Monday still resolves from the template
    let next_week = f.resolution.resolve(f.doctor, d(2025, 12, 8)).await.unwrap();
    assert_eq!(next_week.availability_type, Some(ScheduleKind::Recurring));
    assert_eq!(next_week.slots.len(), 8);
}

#[tokio::test]
async fn blocked_date_is_unavailable_despite_template() {
    let f = fixture();
    f.schedule
        .set_recurring(f.doctor, weekly(1, t(9, 0), t(17, 0)), f.actor)
        .await
        .unwrap();
    f.schedule.block(f.doctor, d(2025, 12, 1), f.actor).await.unwrap();

    let resolved = f.resolution.resolve(f.doctor, d(2025, 12, 1)).await.unwrap();

    assert!(!resolved.available);
    assert!(resolved.slots.is_empty());
}

#[tokio::test]
async fn unknown_doctor_resolves_to_unavailable() {
    let f = fixture();

    let resolved = f.resolution.resolve(Uuid::new_v4(), d(2025, 12, 1)).await.unwrap();

    assert!(!resolved.available);
    assert_eq!(resolved.availability_type, None);
}

#[tokio::test]
async fn booked_slots_are_hidden_from_resolution() {
    let f = fixture();
    f.schedule
        .set_recurring(f.doctor, weekly(1, t(9, 0), t(17, 0)), f.actor)
        .await
        .unwrap();
    f.store
        .book_slot(f.doctor, d(2025, 12, 1), t(10, 0), t(11, 0), f.actor)
        .await
        .unwrap();

    let resolved = f.resolution.resolve(f.doctor, d(2025, 12, 1)).await.unwrap();

    assert!(resolved.available);
    assert_eq!(resolved.slots.len(), 7);
    assert!(resolved.slots.iter().all(|s| s.start_time != t(10, 0)));
}

#[tokio::test]
async fn range_resolves_each_day_independently() {
    let f = fixture();
    f.schedule
        .set_recurring(f.doctor, weekly(1, t(9, 0), t(17, 0)), f.actor)
        .await
        .unwrap();
    f.schedule.block(f.doctor, d(2025, 12, 8), f.actor).await.unwrap();

    let days = f
        .resolution
        .resolve_range(f.doctor, d(2025, 12, 1), d(2025, 12, 15))
        .await
        .unwrap();

    assert_eq!(days.len(), 15);
    assert!(days[0].available, "first Monday comes from the template");
    assert!(!days[7].available, "second Monday is blocked");
    assert!(days[14].available, "third Monday comes from the template");
    assert!(days[1..7].iter().all(|day| !day.available));
}

#[tokio::test]
async fn range_rejects_inverted_and_oversized_spans() {
    let f = fixture();

    assert_matches!(
        f.resolution
            .resolve_range(f.doctor, d(2025, 12, 2), d(2025, 12, 1))
            .await,
        Err(SchedulingError::InvalidInput { .. })
    );
    assert_matches!(
        f.resolution
            .resolve_range(f.doctor, d(2025, 1, 1), d(2027, 1, 1))
            .await,
        Err(SchedulingError::InvalidInput { .. })
    );
}
