use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

use crate::models::{SchedulingError, SlotInput, TimeSlot};

pub const DEFAULT_SLOT_MINUTES: i64 = 60;

/// Weekday index for a calendar date (0 = Sunday, 1 = Monday, etc.).
/// Stateless: the date alone determines the weekday, no clock involved.
pub fn day_of_week(date: NaiveDate) -> i32 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

/// Expand a working window into discrete slot start times.
pub fn expand_range(
    start: NaiveTime,
    end: NaiveTime,
    increment_minutes: i64,
) -> Result<Vec<NaiveTime>, SchedulingError> {
    if increment_minutes <= 0 {
        return Err(SchedulingError::invalid(
            "increment_minutes",
            "must be positive",
        ));
    }
    if start >= end {
        return Err(SchedulingError::invalid(
            "start_time",
            "must be before end time",
        ));
    }

    let step = Duration::minutes(increment_minutes);
    let mut starts = Vec::new();
    let mut current = start;

    loop {
        let (slot_end, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 || slot_end > end {
            break;
        }
        starts.push(current);
        current = slot_end;
    }

    Ok(starts)
}

/// Default end time for a slot submitted without one: one hour after the
/// start. A start late enough that the hour would cross midnight is rejected;
/// slots never span a day boundary.
pub fn infer_end_time(start: NaiveTime) -> Result<NaiveTime, SchedulingError> {
    let (end, wrapped) = start.overflowing_add_signed(Duration::minutes(DEFAULT_SLOT_MINUTES));
    if wrapped != 0 {
        return Err(SchedulingError::invalid(
            "start_time",
            "a slot starting after 23:00 requires an explicit end time",
        ));
    }
    Ok(end)
}

/// Turn doctor-submitted slot inputs into a validated, ordered slot list.
/// Slots always come out unbooked; only the booking path flips that flag.
pub fn build_slots(inputs: &[SlotInput]) -> Result<Vec<TimeSlot>, SchedulingError> {
    let mut slots = Vec::with_capacity(inputs.len());

    for input in inputs {
        let end_time = match input.end_time {
            Some(end) => end,
            None => infer_end_time(input.start_time)?,
        };
        slots.push(TimeSlot::unbooked(input.start_time, end_time));
    }

    validate_slot_list(slots)
}

/// Sort a slot list by start time and reject empty or overlapping intervals.
pub fn validate_slot_list(mut slots: Vec<TimeSlot>) -> Result<Vec<TimeSlot>, SchedulingError> {
    for slot in &slots {
        if slot.start_time >= slot.end_time {
            return Err(SchedulingError::invalid(
                "slots",
                format!(
                    "slot starting at {} must end after it starts",
                    slot.start_time
                ),
            ));
        }
    }

    slots.sort_by_key(|slot| slot.start_time);

    for pair in slots.windows(2) {
        if pair[1].start_time < pair[0].end_time {
            return Err(SchedulingError::invalid(
                "slots",
                format!(
                    "slots starting at {} and {} overlap",
                    pair[0].start_time, pair[1].start_time
                ),
            ));
        }
    }

    Ok(slots)
}

/// Expand a working window directly into slots of a fixed length.
pub fn slots_from_range(
    start: NaiveTime,
    end: NaiveTime,
    slot_minutes: i64,
) -> Result<Vec<TimeSlot>, SchedulingError> {
    let starts = expand_range(start, end, slot_minutes)?;
    Ok(starts
        .into_iter()
        .map(|slot_start| {
            // expand_range already proved slot_start + slot_minutes fits
            let slot_end = slot_start + Duration::minutes(slot_minutes);
            TimeSlot::unbooked(slot_start, slot_end)
        })
        .collect())
}
