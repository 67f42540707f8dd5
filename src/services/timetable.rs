use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ConflictPolicy;
use crate::database::{Condition, FieldValue, Order, SelectQuery, Store};
use crate::models::timetable::{
    CreateTimetableException, CreateTimetableSlot, UpdateTimetableException, UpdateTimetableSlot,
};
use crate::models::{DayOfWeek, ExceptionKind, Timetable, TimetableException, TimetableSlot};
use crate::services::conflicts::{find_conflicts, CandidateSlot, SlotConflict};
use crate::services::entity::{Entity, EntityService, Stamp};
use crate::services::error::{ServiceError, ServiceResult};
use crate::tenant::TenantScope;

/// A stored slot together with the conflicts found when writing it.
#[derive(Debug, Clone, Serialize)]
pub struct SlotWrite {
    pub slot: TimetableSlot,
    pub conflicts: Vec<SlotConflict>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LessonStatus {
    Scheduled,
    Cancelled,
    Rescheduled,
    Substituted,
    RoomChanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledLesson {
    pub slot_id: Uuid,
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub room_id: Option<Uuid>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: LessonStatus,
    pub exception_id: Option<Uuid>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub timetable_id: Uuid,
    pub date: NaiveDate,
    pub day_of_week: DayOfWeek,
    pub lessons: Vec<ScheduledLesson>,
}

/// Slot and exception writes, conflict checks and dated schedules.
pub struct TimetableService {
    timetables: EntityService<Timetable>,
    slots: EntityService<TimetableSlot>,
    exceptions: EntityService<TimetableException>,
    policy: ConflictPolicy,
}

impl TimetableService {
    pub fn new(store: Arc<dyn Store>, policy: ConflictPolicy) -> Self {
        Self {
            timetables: EntityService::new(store.clone()),
            slots: EntityService::new(store.clone()),
            exceptions: EntityService::new(store),
            policy,
        }
    }

    /// Existing slots of the candidate's timetable and weekday that collide with it.
    pub async fn detect_conflicts(
        &self,
        scope: &TenantScope,
        candidate: &CandidateSlot,
        exclude: Option<Uuid>,
    ) -> ServiceResult<Vec<SlotConflict>> {
        let query = SelectQuery {
            conditions: vec![
                Condition::eq("timetableId", candidate.timetable_id),
                Condition::Eq("dayOfWeek", FieldValue::variant(&candidate.day_of_week)),
            ],
            order: vec![Order::asc("startTime")],
            ..SelectQuery::default()
        };
        let existing = self.slots.select(scope, &query).await?;
        Ok(find_conflicts(candidate, &existing, exclude))
    }

    /// Conflict check for an arbitrary candidate in a timetable of this school.
    pub async fn check_candidate(
        &self,
        scope: &TenantScope,
        timetable_id: Uuid,
        mut candidate: CandidateSlot,
        exclude: Option<Uuid>,
    ) -> ServiceResult<Vec<SlotConflict>> {
        self.timetables.get_by_id(scope, timetable_id).await?;
        candidate.timetable_id = timetable_id;
        self.detect_conflicts(scope, &candidate, exclude).await
    }

    pub async fn create_slot(&self, scope: &TenantScope, actor: Uuid, input: CreateTimetableSlot) -> ServiceResult<SlotWrite> {
        let slot = TimetableSlot::from_create(input, &Stamp::new(*scope, actor));
        slot.check()?;
        let conflicts = self.detect_conflicts(scope, &CandidateSlot::from(&slot), None).await?;
        self.enforce(&conflicts)?;

        let slot = self.slots.insert(scope, slot).await?;
        Ok(SlotWrite { slot, conflicts })
    }

    pub async fn update_slot(&self, scope: &TenantScope, id: Uuid, input: UpdateTimetableSlot) -> ServiceResult<SlotWrite> {
        let mut slot = self.slots.get_by_id(scope, id).await?;
        slot.apply_update(input, Utc::now());
        slot.check()?;
        let conflicts = self.detect_conflicts(scope, &CandidateSlot::from(&slot), Some(id)).await?;
        self.enforce(&conflicts)?;

        let slot = self.slots.replace(scope, slot).await?;
        Ok(SlotWrite { slot, conflicts })
    }

    fn enforce(&self, conflicts: &[SlotConflict]) -> ServiceResult<()> {
        if conflicts.is_empty() {
            return Ok(());
        }
        match self.policy {
            ConflictPolicy::Advisory => {
                tracing::warn!(count = conflicts.len(), "timetable slot stored with conflicts");
                Ok(())
            }
            ConflictPolicy::Reject => Err(ServiceError::conflict_with(
                "SLOT_CONFLICT",
                "The slot overlaps existing lessons",
                Some(json!({ "conflicts": conflicts })),
            )),
        }
    }

    pub async fn create_exception(
        &self,
        scope: &TenantScope,
        actor: Uuid,
        input: CreateTimetableException,
    ) -> ServiceResult<TimetableException> {
        let exception = TimetableException::from_create(input, &Stamp::new(*scope, actor));
        self.check_against_slot(scope, &exception).await?;
        self.exceptions.insert(scope, exception).await
    }

    pub async fn update_exception(
        &self,
        scope: &TenantScope,
        id: Uuid,
        input: UpdateTimetableException,
    ) -> ServiceResult<TimetableException> {
        let mut exception = self.exceptions.get_by_id(scope, id).await?;
        exception.apply_update(input, Utc::now());
        self.check_against_slot(scope, &exception).await?;
        self.exceptions.replace(scope, exception).await
    }

    /// The date must fall on the slot's weekday and inside its timetable's window.
    async fn check_against_slot(&self, scope: &TenantScope, exception: &TimetableException) -> ServiceResult<()> {
        exception.check()?;
        let slot = self.slots.get_by_id(scope, exception.slot_id).await?;
        let timetable = self.timetables.get_by_id(scope, slot.timetable_id).await?;

        let day = DayOfWeek::of(exception.date);
        if day != slot.day_of_week {
            return Err(ServiceError::validation(
                "date",
                format!("Date falls on {:?} but the slot is on {:?}", day, slot.day_of_week),
            ));
        }
        if !timetable.covers(exception.date) {
            return Err(ServiceError::validation(
                "date",
                "Date is outside the timetable's validity period",
            ));
        }
        Ok(())
    }

    /// Lessons of one day of a timetable with that day's exceptions applied.
    pub async fn schedule(&self, scope: &TenantScope, timetable_id: Uuid, date: NaiveDate) -> ServiceResult<DaySchedule> {
        let timetable = self.timetables.get_by_id(scope, timetable_id).await?;
        if !timetable.covers(date) {
            return Err(ServiceError::validation(
                "date",
                "Date is outside the timetable's validity period",
            ));
        }

        let day = DayOfWeek::of(date);
        let slots = self
            .slots
            .select(
                scope,
                &SelectQuery {
                    conditions: vec![
                        Condition::eq("timetableId", timetable_id),
                        Condition::Eq("dayOfWeek", FieldValue::variant(&day)),
                    ],
                    order: vec![Order::asc("startTime")],
                    ..SelectQuery::default()
                },
            )
            .await?;
        let exceptions = self
            .exceptions
            .select(
                scope,
                &SelectQuery { conditions: vec![Condition::eq("date", date)], ..SelectQuery::default() },
            )
            .await?;

        Ok(DaySchedule {
            timetable_id,
            date,
            day_of_week: day,
            lessons: apply_exceptions(&slots, &exceptions),
        })
    }
}

/// Overlays dated exceptions on weekly slots. Exceptions for other slots are ignored.
pub fn apply_exceptions(slots: &[TimetableSlot], exceptions: &[TimetableException]) -> Vec<ScheduledLesson> {
    let by_slot: HashMap<Uuid, &TimetableException> = exceptions.iter().map(|e| (e.slot_id, e)).collect();

    let mut lessons: Vec<ScheduledLesson> = slots
        .iter()
        .map(|slot| {
            let mut lesson = ScheduledLesson {
                slot_id: slot.id,
                class_id: slot.class_id,
                subject_id: slot.subject_id,
                teacher_id: slot.teacher_id,
                room_id: slot.room_id,
                start_time: slot.start_time,
                end_time: slot.end_time,
                status: LessonStatus::Scheduled,
                exception_id: None,
                reason: None,
            };
            if let Some(exception) = by_slot.get(&slot.id) {
                lesson.exception_id = Some(exception.id);
                lesson.reason = exception.reason.clone();
                match exception.kind {
                    ExceptionKind::Cancelled => lesson.status = LessonStatus::Cancelled,
                    ExceptionKind::Rescheduled => {
                        lesson.status = LessonStatus::Rescheduled;
                        lesson.start_time = exception.start_time.unwrap_or(slot.start_time);
                        lesson.end_time = exception.end_time.unwrap_or(slot.end_time);
                        if exception.room_id.is_some() {
                            lesson.room_id = exception.room_id;
                        }
                    }
                    ExceptionKind::Substitution => {
                        lesson.status = LessonStatus::Substituted;
                        lesson.teacher_id = exception.substitute_teacher_id.unwrap_or(slot.teacher_id);
                    }
                    ExceptionKind::RoomChange => {
                        lesson.status = LessonStatus::RoomChanged;
                        lesson.room_id = exception.room_id.or(slot.room_id);
                    }
                }
            }
            lesson
        })
        .collect();

    lessons.sort_by_key(|l| l.start_time);
    lessons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::{Class, Level, Subject, Teacher};
    use serde_json::json;

    struct Fixture {
        scope: TenantScope,
        store: Arc<MemoryStore>,
        timetable: Timetable,
        class_a: Uuid,
        class_b: Uuid,
        teacher: Uuid,
        other_teacher: Uuid,
        subject: Uuid,
    }

    async fn create<E: Entity>(store: &Arc<MemoryStore>, scope: &TenantScope, body: serde_json::Value) -> E {
        let input: E::Create = crate::validation::validate(body).unwrap();
        EntityService::<E>::new(store.clone()).create(scope, Uuid::nil(), input).await.unwrap()
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let scope = TenantScope::assume(Uuid::new_v4());
        let level: Level = create(&store, &scope, json!({"name": "Grade 1", "code": "G1"})).await;
        let class_a: Class =
            create(&store, &scope, json!({"name": "1A", "levelId": level.id, "academicYear": "2024-2025"})).await;
        let class_b: Class =
            create(&store, &scope, json!({"name": "1B", "levelId": level.id, "academicYear": "2024-2025"})).await;
        let teacher: Teacher = create(
            &store,
            &scope,
            json!({"employeeNumber": "E1", "firstName": "A", "lastName": "B", "email": "a@s.test"}),
        )
        .await;
        let other: Teacher = create(
            &store,
            &scope,
            json!({"employeeNumber": "E2", "firstName": "C", "lastName": "D", "email": "c@s.test"}),
        )
        .await;
        let subject: Subject = create(&store, &scope, json!({"name": "Maths", "code": "MATH"})).await;
        let timetable: Timetable = create(
            &store,
            &scope,
            json!({"name": "Autumn", "validFrom": "2024-09-01", "validTo": "2024-12-20"}),
        )
        .await;
        Fixture {
            scope,
            store,
            timetable,
            class_a: class_a.id,
            class_b: class_b.id,
            teacher: teacher.id,
            other_teacher: other.id,
            subject: subject.id,
        }
    }

    fn slot_input(f: &Fixture, class: Uuid, teacher: Uuid, start: &str, end: &str) -> CreateTimetableSlot {
        crate::validation::validate(json!({
            "timetableId": f.timetable.id,
            "classId": class,
            "teacherId": teacher,
            "subjectId": f.subject,
            "dayOfWeek": "MONDAY",
            "startTime": start,
            "endTime": end
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn advisory_policy_stores_and_reports() {
        let f = fixture().await;
        let service = TimetableService::new(f.store.clone(), ConflictPolicy::Advisory);
        let first = service
            .create_slot(&f.scope, Uuid::nil(), slot_input(&f, f.class_a, f.teacher, "08:00:00", "09:00:00"))
            .await
            .unwrap();
        assert!(first.conflicts.is_empty());

        let second = service
            .create_slot(&f.scope, Uuid::nil(), slot_input(&f, f.class_b, f.teacher, "08:30:00", "09:30:00"))
            .await
            .unwrap();
        assert_eq!(second.conflicts.len(), 1);
        assert_eq!(second.conflicts[0].slot.id, first.slot.id);
    }

    #[tokio::test]
    async fn reject_policy_refuses_conflicting_slots() {
        let f = fixture().await;
        let service = TimetableService::new(f.store.clone(), ConflictPolicy::Reject);
        service
            .create_slot(&f.scope, Uuid::nil(), slot_input(&f, f.class_a, f.teacher, "08:00:00", "09:00:00"))
            .await
            .unwrap();

        let err = service
            .create_slot(&f.scope, Uuid::nil(), slot_input(&f, f.class_a, f.other_teacher, "08:59:00", "10:00:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { code: "SLOT_CONFLICT", .. }));

        // Touching is fine
        service
            .create_slot(&f.scope, Uuid::nil(), slot_input(&f, f.class_a, f.other_teacher, "09:00:00", "10:00:00"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn moving_a_slot_ignores_itself() {
        let f = fixture().await;
        let service = TimetableService::new(f.store.clone(), ConflictPolicy::Reject);
        let write = service
            .create_slot(&f.scope, Uuid::nil(), slot_input(&f, f.class_a, f.teacher, "08:00:00", "09:00:00"))
            .await
            .unwrap();
        let patch: UpdateTimetableSlot = crate::validation::validate(json!({"endTime": "09:30:00"})).unwrap();
        let moved = service.update_slot(&f.scope, write.slot.id, patch).await.unwrap();
        assert_eq!(moved.slot.end_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn exception_dates_must_match_the_slot() {
        let f = fixture().await;
        let service = TimetableService::new(f.store.clone(), ConflictPolicy::Advisory);
        let slot = service
            .create_slot(&f.scope, Uuid::nil(), slot_input(&f, f.class_a, f.teacher, "08:00:00", "09:00:00"))
            .await
            .unwrap()
            .slot;

        // 2024-09-03 is a Tuesday
        let tuesday: CreateTimetableException =
            crate::validation::validate(json!({"slotId": slot.id, "date": "2024-09-03", "kind": "CANCELLED"})).unwrap();
        match service.create_exception(&f.scope, Uuid::nil(), tuesday).await {
            Err(ServiceError::Validation { field, .. }) => assert_eq!(field.as_deref(), Some("date")),
            other => panic!("expected validation error, got {:?}", other),
        }

        // Monday outside the window
        let late: CreateTimetableException =
            crate::validation::validate(json!({"slotId": slot.id, "date": "2025-01-06", "kind": "CANCELLED"})).unwrap();
        assert!(matches!(
            service.create_exception(&f.scope, Uuid::nil(), late).await,
            Err(ServiceError::Validation { .. })
        ));

        let ok: CreateTimetableException = crate::validation::validate(json!({
            "slotId": slot.id, "date": "2024-09-02", "kind": "SUBSTITUTION", "substituteTeacherId": f.other_teacher
        }))
        .unwrap();
        service.create_exception(&f.scope, Uuid::nil(), ok).await.unwrap();

        let day = service
            .schedule(&f.scope, f.timetable.id, NaiveDate::from_ymd_opt(2024, 9, 2).unwrap())
            .await
            .unwrap();
        assert_eq!(day.lessons.len(), 1);
        assert_eq!(day.lessons[0].status, LessonStatus::Substituted);
        assert_eq!(day.lessons[0].teacher_id, f.other_teacher);

        let next_week = service
            .schedule(&f.scope, f.timetable.id, NaiveDate::from_ymd_opt(2024, 9, 9).unwrap())
            .await
            .unwrap();
        assert_eq!(next_week.lessons[0].status, LessonStatus::Scheduled);
    }
}
