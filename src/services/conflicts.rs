//! Timetable slot conflict detection.
//!
//! Two lessons collide when they share a teacher, a room or a class on the
//! same weekday of the same timetable and their time ranges overlap. Ranges
//! are half-open, so a lesson ending at 09:00 does not collide with one
//! starting at 09:00.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::{DayOfWeek, TimetableSlot};
use crate::validation::field_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictDimension {
    Teacher,
    Room,
    Class,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotConflict {
    pub dimension: ConflictDimension,
    pub slot: TimetableSlot,
}

/// A proposed slot, not necessarily stored.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "candidate_times"))]
pub struct CandidateSlot {
    /// Taken from the path when checking through a timetable's endpoint.
    #[serde(default)]
    pub timetable_id: Uuid,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub room_id: Option<Uuid>,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

fn candidate_times(candidate: &CandidateSlot) -> Result<(), ValidationError> {
    if candidate.start_time >= candidate.end_time {
        return Err(field_error("endTime", "time_range", "endTime must be after startTime"));
    }
    Ok(())
}

impl From<&TimetableSlot> for CandidateSlot {
    fn from(slot: &TimetableSlot) -> Self {
        Self {
            timetable_id: slot.timetable_id,
            class_id: slot.class_id,
            teacher_id: slot.teacher_id,
            room_id: slot.room_id,
            day_of_week: slot.day_of_week,
            start_time: slot.start_time,
            end_time: slot.end_time,
        }
    }
}

pub fn overlaps(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && b_start < a_end
}

/// Every (slot, dimension) pair among `existing` that collides with
/// `candidate`. The slot with id `exclude` (the one being edited) is skipped.
pub fn find_conflicts(candidate: &CandidateSlot, existing: &[TimetableSlot], exclude: Option<Uuid>) -> Vec<SlotConflict> {
    let mut conflicts = Vec::new();

    for slot in existing {
        if Some(slot.id) == exclude
            || slot.timetable_id != candidate.timetable_id
            || slot.day_of_week != candidate.day_of_week
            || !overlaps(candidate.start_time, candidate.end_time, slot.start_time, slot.end_time)
        {
            continue;
        }

        if slot.teacher_id == candidate.teacher_id {
            conflicts.push(SlotConflict { dimension: ConflictDimension::Teacher, slot: slot.clone() });
        }
        // An unassigned room never collides
        if candidate.room_id.is_some() && slot.room_id == candidate.room_id {
            conflicts.push(SlotConflict { dimension: ConflictDimension::Room, slot: slot.clone() });
        }
        if slot.class_id == candidate.class_id {
            conflicts.push(SlotConflict { dimension: ConflictDimension::Class, slot: slot.clone() });
        }
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn t(hhmm: &str) -> NaiveTime {
        NaiveTime::parse_from_str(hhmm, "%H:%M").unwrap()
    }

    struct Ids {
        timetable: Uuid,
        teacher: Uuid,
        room: Uuid,
        class: Uuid,
    }

    fn ids() -> Ids {
        Ids { timetable: Uuid::new_v4(), teacher: Uuid::new_v4(), room: Uuid::new_v4(), class: Uuid::new_v4() }
    }

    fn slot(ids: &Ids, day: DayOfWeek, start: &str, end: &str) -> TimetableSlot {
        TimetableSlot {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            timetable_id: ids.timetable,
            class_id: ids.class,
            teacher_id: ids.teacher,
            subject_id: Uuid::new_v4(),
            room_id: Some(ids.room),
            day_of_week: day,
            start_time: t(start),
            end_time: t(end),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn candidate(ids: &Ids, day: DayOfWeek, start: &str, end: &str) -> CandidateSlot {
        CandidateSlot {
            timetable_id: ids.timetable,
            class_id: Uuid::new_v4(),
            teacher_id: ids.teacher,
            room_id: None,
            day_of_week: day,
            start_time: t(start),
            end_time: t(end),
        }
    }

    #[test]
    fn overlapping_teacher_is_reported() {
        let ids = ids();
        let a = slot(&ids, DayOfWeek::Monday, "08:00", "09:00");
        let b = candidate(&ids, DayOfWeek::Monday, "08:30", "09:30");

        let conflicts = find_conflicts(&b, &[a.clone()], None);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].dimension, ConflictDimension::Teacher);
        assert_eq!(conflicts[0].slot.id, a.id);
    }

    #[test]
    fn touching_ranges_do_not_conflict() {
        let ids = ids();
        let a = slot(&ids, DayOfWeek::Monday, "08:00", "09:00");
        let c = candidate(&ids, DayOfWeek::Monday, "09:00", "10:00");
        assert!(find_conflicts(&c, &[a], None).is_empty());
    }

    #[test]
    fn other_days_and_timetables_are_ignored() {
        let ids = ids();
        let mut other_timetable = slot(&ids, DayOfWeek::Monday, "08:00", "09:00");
        other_timetable.timetable_id = Uuid::new_v4();
        let tuesday = slot(&ids, DayOfWeek::Tuesday, "08:00", "09:00");
        let b = candidate(&ids, DayOfWeek::Monday, "08:30", "09:30");
        assert!(find_conflicts(&b, &[other_timetable, tuesday], None).is_empty());
    }

    #[test]
    fn reports_each_colliding_dimension() {
        let ids = ids();
        let a = slot(&ids, DayOfWeek::Friday, "10:00", "11:00");
        let mut b = candidate(&ids, DayOfWeek::Friday, "10:15", "10:45");
        b.class_id = ids.class;
        b.room_id = Some(ids.room);

        let dims: Vec<_> = find_conflicts(&b, &[a], None).into_iter().map(|c| c.dimension).collect();
        assert_eq!(dims, vec![ConflictDimension::Teacher, ConflictDimension::Room, ConflictDimension::Class]);
    }

    #[test]
    fn edited_slot_is_excluded() {
        let ids = ids();
        let a = slot(&ids, DayOfWeek::Monday, "08:00", "09:00");
        let moved = CandidateSlot::from(&a);
        assert!(find_conflicts(&moved, &[a.clone()], Some(a.id)).is_empty());
        assert_eq!(find_conflicts(&moved, &[a], None).len(), 3);
    }

    #[test]
    fn rooms_only_collide_when_both_assigned() {
        let ids = ids();
        let mut a = slot(&ids, DayOfWeek::Monday, "08:00", "09:00");
        a.room_id = None;
        a.teacher_id = Uuid::new_v4();
        let b = candidate(&ids, DayOfWeek::Monday, "08:00", "09:00");
        assert!(find_conflicts(&b, &[a], None).is_empty());
    }
}
