use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{merge, nullable, search_term, trimmed, trimmed_opt};
use crate::database::{Condition, FieldValue, Order};
use crate::services::entity::{Entity, ListFilter, Reference, Stamp};
use crate::services::{ServiceError, ServiceResult};
use crate::validation::field_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    #[serde(alias = "MON")]
    Monday,
    #[serde(alias = "TUE")]
    Tuesday,
    #[serde(alias = "WED")]
    Wednesday,
    #[serde(alias = "THU")]
    Thursday,
    #[serde(alias = "FRI")]
    Friday,
    #[serde(alias = "SAT")]
    Saturday,
    #[serde(alias = "SUN")]
    Sunday,
}

impl DayOfWeek {
    /// Wire names in calendar order, Monday first.
    pub const ORDER: &'static [&'static str] =
        &["MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY", "SATURDAY", "SUNDAY"];

    pub fn of(date: NaiveDate) -> Self {
        use chrono::Datelike;
        date.weekday().into()
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// A weekly timetable, valid between two dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timetable {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && date <= self.valid_to
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "timetable_window"))]
pub struct CreateTimetable {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    pub is_active: Option<bool>,
}

fn timetable_window(input: &CreateTimetable) -> Result<(), ValidationError> {
    if input.valid_from > input.valid_to {
        return Err(field_error("validTo", "date_range", "validTo must not be before validFrom"));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimetable {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimetableFilter {
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl ListFilter for TimetableFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(active) = self.is_active {
            conditions.push(Condition::eq("isActive", active));
        }
        if let Some(term) = search_term(&self.search) {
            conditions.push(Condition::Search(vec!["name"], term));
        }
        conditions
    }
}

impl Entity for Timetable {
    const RESOURCE: &'static str = "Timetable";
    const TABLE: &'static str = "timetables";

    type Create = CreateTimetable;
    type Update = UpdateTimetable;
    type Filter = TimetableFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateTimetable, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            name: input.name,
            valid_from: input.valid_from,
            valid_to: input.valid_to,
            is_active: input.is_active.unwrap_or(true),
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, input: UpdateTimetable, now: DateTime<Utc>) {
        merge(&mut self.name, input.name);
        merge(&mut self.valid_from, input.valid_from);
        merge(&mut self.valid_to, input.valid_to);
        merge(&mut self.is_active, input.is_active);
        self.updated_at = now;
    }

    fn check(&self) -> ServiceResult<()> {
        if self.valid_from > self.valid_to {
            return Err(ServiceError::validation("validTo", "validTo must not be before validFrom"));
        }
        Ok(())
    }

    fn default_order() -> Vec<Order> {
        vec![Order::desc("validFrom"), Order::asc("name")]
    }
}

/// A recurring weekly lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableSlot {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub timetable_id: Uuid,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub room_id: Option<Uuid>,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "slot_times"))]
pub struct CreateTimetableSlot {
    pub timetable_id: Uuid,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub room_id: Option<Uuid>,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

fn slot_times(input: &CreateTimetableSlot) -> Result<(), ValidationError> {
    if input.start_time >= input.end_time {
        return Err(field_error("endTime", "time_range", "endTime must be after startTime"));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimetableSlot {
    pub class_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    #[serde(default, deserialize_with = "nullable")]
    pub room_id: Option<Option<Uuid>>,
    pub day_of_week: Option<DayOfWeek>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimetableSlotFilter {
    pub timetable_id: Option<Uuid>,
    pub class_id: Option<Uuid>,
    pub teacher_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub day_of_week: Option<DayOfWeek>,
}

impl ListFilter for TimetableSlotFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(id) = self.timetable_id {
            conditions.push(Condition::eq("timetableId", id));
        }
        if let Some(id) = self.class_id {
            conditions.push(Condition::eq("classId", id));
        }
        if let Some(id) = self.teacher_id {
            conditions.push(Condition::eq("teacherId", id));
        }
        if let Some(id) = self.room_id {
            conditions.push(Condition::eq("roomId", id));
        }
        if let Some(day) = &self.day_of_week {
            conditions.push(Condition::Eq("dayOfWeek", FieldValue::variant(day)));
        }
        conditions
    }
}

impl Entity for TimetableSlot {
    const RESOURCE: &'static str = "TimetableSlot";
    const TABLE: &'static str = "timetable_slots";

    type Create = CreateTimetableSlot;
    type Update = UpdateTimetableSlot;
    type Filter = TimetableSlotFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateTimetableSlot, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            timetable_id: input.timetable_id,
            class_id: input.class_id,
            teacher_id: input.teacher_id,
            subject_id: input.subject_id,
            room_id: input.room_id,
            day_of_week: input.day_of_week,
            start_time: input.start_time,
            end_time: input.end_time,
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, input: UpdateTimetableSlot, now: DateTime<Utc>) {
        merge(&mut self.class_id, input.class_id);
        merge(&mut self.teacher_id, input.teacher_id);
        merge(&mut self.subject_id, input.subject_id);
        merge(&mut self.room_id, input.room_id);
        merge(&mut self.day_of_week, input.day_of_week);
        merge(&mut self.start_time, input.start_time);
        merge(&mut self.end_time, input.end_time);
        self.updated_at = now;
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![
            Reference::new("Timetable", "timetables", self.timetable_id),
            Reference::new("Class", "classes", self.class_id),
            Reference::new("Teacher", "teachers", self.teacher_id),
            Reference::new("Subject", "subjects", self.subject_id),
        ];
        refs.extend(Reference::optional("Room", "rooms", self.room_id));
        refs
    }

    fn check(&self) -> ServiceResult<()> {
        if self.start_time >= self.end_time {
            return Err(ServiceError::validation("endTime", "endTime must be after startTime"));
        }
        Ok(())
    }

    fn default_order() -> Vec<Order> {
        vec![Order::ranked("dayOfWeek", DayOfWeek::ORDER), Order::asc("startTime")]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionKind {
    Cancelled,
    Rescheduled,
    Substitution,
    RoomChange,
}

/// A date-specific override of one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableException {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub slot_id: Uuid,
    pub date: NaiveDate,
    pub kind: ExceptionKind,
    pub substitute_teacher_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimetableException {
    pub slot_id: Uuid,
    pub date: NaiveDate,
    pub kind: ExceptionKind,
    pub substitute_teacher_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTimetableException {
    pub date: Option<NaiveDate>,
    pub kind: Option<ExceptionKind>,
    #[serde(default, deserialize_with = "nullable")]
    pub substitute_teacher_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub room_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_time: Option<Option<NaiveTime>>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_time: Option<Option<NaiveTime>>,
    #[serde(default, deserialize_with = "nullable")]
    pub reason: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimetableExceptionFilter {
    pub slot_id: Option<Uuid>,
    pub kind: Option<ExceptionKind>,
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ListFilter for TimetableExceptionFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(id) = self.slot_id {
            conditions.push(Condition::eq("slotId", id));
        }
        if let Some(kind) = &self.kind {
            conditions.push(Condition::Eq("kind", FieldValue::variant(kind)));
        }
        if let Some(date) = self.date {
            conditions.push(Condition::eq("date", date));
        }
        if let Some(from) = self.from {
            conditions.push(Condition::Gte("date", from.into()));
        }
        if let Some(to) = self.to {
            conditions.push(Condition::Lte("date", to.into()));
        }
        conditions
    }
}

impl Entity for TimetableException {
    const RESOURCE: &'static str = "TimetableException";
    const TABLE: &'static str = "timetable_exceptions";

    type Create = CreateTimetableException;
    type Update = UpdateTimetableException;
    type Filter = TimetableExceptionFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateTimetableException, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            slot_id: input.slot_id,
            date: input.date,
            kind: input.kind,
            substitute_teacher_id: input.substitute_teacher_id,
            room_id: input.room_id,
            start_time: input.start_time,
            end_time: input.end_time,
            reason: input.reason,
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, input: UpdateTimetableException, now: DateTime<Utc>) {
        merge(&mut self.date, input.date);
        merge(&mut self.kind, input.kind);
        merge(&mut self.substitute_teacher_id, input.substitute_teacher_id);
        merge(&mut self.room_id, input.room_id);
        merge(&mut self.start_time, input.start_time);
        merge(&mut self.end_time, input.end_time);
        merge(&mut self.reason, input.reason);
        self.updated_at = now;
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![Reference::new("TimetableSlot", "timetable_slots", self.slot_id)];
        refs.extend(Reference::optional("Teacher", "teachers", self.substitute_teacher_id));
        refs.extend(Reference::optional("Room", "rooms", self.room_id));
        refs
    }

    /// Per-kind requirements. Checks against the slot itself live in the
    /// timetable service.
    fn check(&self) -> ServiceResult<()> {
        match self.kind {
            ExceptionKind::Substitution if self.substitute_teacher_id.is_none() => Err(ServiceError::validation(
                "substituteTeacherId",
                "A substitution requires a substitute teacher",
            )),
            ExceptionKind::RoomChange if self.room_id.is_none() => {
                Err(ServiceError::validation("roomId", "A room change requires a room"))
            }
            ExceptionKind::Rescheduled => match (self.start_time, self.end_time) {
                (Some(start), Some(end)) if start < end => Ok(()),
                (Some(_), Some(_)) => Err(ServiceError::validation("endTime", "endTime must be after startTime")),
                _ => Err(ServiceError::validation(
                    "startTime",
                    "A rescheduled lesson requires startTime and endTime",
                )),
            },
            _ => Ok(()),
        }
    }

    fn default_order() -> Vec<Order> {
        vec![Order::asc("date")]
    }
}
