use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{merge, nullable, numeric_8_2, trimmed, trimmed_opt};
use crate::database::{Condition, FieldValue, Order};
use crate::services::entity::{Entity, ListFilter, Reference, Stamp};
use crate::services::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentType {
    Exam,
    Quiz,
    Homework,
    Project,
    Oral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub student_id: Uuid,
    pub subject_id: Uuid,
    pub term: String,
    pub assessment_type: AssessmentType,
    pub score: Decimal,
    pub max_score: Decimal,
    pub assessed_on: NaiveDate,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Grade {
    /// Score as a percentage of the maximum.
    pub fn percent(&self) -> Decimal {
        if self.max_score.is_zero() {
            return Decimal::ZERO;
        }
        self.score * Decimal::ONE_HUNDRED / self.max_score
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGrade {
    pub student_id: Uuid,
    pub subject_id: Uuid,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 30))]
    pub term: String,
    pub assessment_type: AssessmentType,
    #[validate(custom(function = "numeric_8_2"))]
    pub score: Decimal,
    #[validate(custom(function = "numeric_8_2"))]
    pub max_score: Option<Decimal>,
    pub assessed_on: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGrade {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 1, max = 30))]
    pub term: Option<String>,
    pub assessment_type: Option<AssessmentType>,
    #[validate(custom(function = "numeric_8_2"))]
    pub score: Option<Decimal>,
    #[validate(custom(function = "numeric_8_2"))]
    pub max_score: Option<Decimal>,
    pub assessed_on: Option<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub comment: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GradeFilter {
    pub student_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub term: Option<String>,
    pub assessment_type: Option<AssessmentType>,
}

impl ListFilter for GradeFilter {
    fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(student_id) = self.student_id {
            conditions.push(Condition::eq("studentId", student_id));
        }
        if let Some(subject_id) = self.subject_id {
            conditions.push(Condition::eq("subjectId", subject_id));
        }
        if let Some(term) = &self.term {
            conditions.push(Condition::eq("term", term.as_str()));
        }
        if let Some(kind) = &self.assessment_type {
            conditions.push(Condition::Eq("assessmentType", FieldValue::variant(kind)));
        }
        conditions
    }
}

impl Entity for Grade {
    const RESOURCE: &'static str = "Grade";
    const TABLE: &'static str = "grades";

    type Create = CreateGrade;
    type Update = UpdateGrade;
    type Filter = GradeFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_create(input: CreateGrade, stamp: &Stamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: stamp.tenant.tenant_id(),
            student_id: input.student_id,
            subject_id: input.subject_id,
            term: input.term,
            assessment_type: input.assessment_type,
            score: input.score,
            max_score: input.max_score.unwrap_or(Decimal::ONE_HUNDRED),
            assessed_on: input.assessed_on.unwrap_or_else(|| stamp.now.date_naive()),
            comment: input.comment,
            created_at: stamp.now,
            updated_at: stamp.now,
        }
    }

    fn apply_update(&mut self, input: UpdateGrade, now: DateTime<Utc>) {
        merge(&mut self.term, input.term);
        merge(&mut self.assessment_type, input.assessment_type);
        merge(&mut self.score, input.score);
        merge(&mut self.max_score, input.max_score);
        merge(&mut self.assessed_on, input.assessed_on);
        merge(&mut self.comment, input.comment);
        self.updated_at = now;
    }

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference::new("Student", "students", self.student_id),
            Reference::new("Subject", "subjects", self.subject_id),
        ]
    }

    fn check(&self) -> ServiceResult<()> {
        if self.max_score <= Decimal::ZERO {
            return Err(ServiceError::validation("maxScore", "Maximum score must be greater than zero"));
        }
        if self.score < Decimal::ZERO {
            return Err(ServiceError::validation("score", "Score cannot be negative"));
        }
        if self.score > self.max_score {
            return Err(ServiceError::validation("score", "Score cannot exceed the maximum score"));
        }
        Ok(())
    }

    fn default_order() -> Vec<Order> {
        vec![Order::desc("assessedOn"), Order::desc("createdAt")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::TenantScope;

    fn grade(score: &str, max: &str) -> Grade {
        let stamp = Stamp::new(TenantScope::assume(Uuid::new_v4()), Uuid::new_v4());
        Grade::from_create(
            CreateGrade {
                student_id: Uuid::new_v4(),
                subject_id: Uuid::new_v4(),
                term: "T1".into(),
                assessment_type: AssessmentType::Exam,
                score: score.parse().unwrap(),
                max_score: Some(max.parse().unwrap()),
                assessed_on: None,
                comment: None,
            },
            &stamp,
        )
    }

    #[test]
    fn score_above_max_names_the_score_field() {
        match grade("21", "20").check() {
            Err(ServiceError::Validation { field, .. }) => assert_eq!(field.as_deref(), Some("score")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(grade("20", "20").check().is_ok());
    }

    #[test]
    fn percent_of_max() {
        assert_eq!(grade("15", "20").percent(), Decimal::from(75));
    }
}
