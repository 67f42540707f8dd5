use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::database::{Condition, SelectQuery, Store};
use crate::models::{Grade, Student, Subject};
use crate::services::entity::EntityService;
use crate::services::error::ServiceResult;
use crate::tenant::TenantScope;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SummaryParams {
    #[validate(length(min = 1, max = 30))]
    pub term: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject_id: Uuid,
    pub subject_name: String,
    pub subject_code: String,
    pub coefficient: Decimal,
    pub grade_count: usize,
    /// Mean of the grades' percentages of their maximum score.
    pub average: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSummary {
    pub student_id: Uuid,
    pub term: Option<String>,
    pub subjects: Vec<SubjectAverage>,
    /// Coefficient-weighted mean of the subject averages; `None` without grades.
    pub overall_average: Option<Decimal>,
}

pub async fn grade_summary(
    store: Arc<dyn Store>,
    scope: &TenantScope,
    student_id: Uuid,
    params: &SummaryParams,
) -> ServiceResult<GradeSummary> {
    EntityService::<Student>::new(store.clone()).get_by_id(scope, student_id).await?;

    let mut conditions = vec![Condition::eq("studentId", student_id)];
    if let Some(term) = &params.term {
        conditions.push(Condition::eq("term", term.as_str()));
    }
    let grades = EntityService::<Grade>::new(store.clone())
        .select(scope, &SelectQuery { conditions, ..SelectQuery::default() })
        .await?;
    let subjects: HashMap<Uuid, Subject> = EntityService::<Subject>::new(store)
        .select(scope, &SelectQuery::default())
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let subject_averages = summarize(&grades, &subjects);
    Ok(GradeSummary {
        student_id,
        term: params.term.clone(),
        overall_average: weighted_mean(&subject_averages),
        subjects: subject_averages,
    })
}

/// Per-subject averages, ordered by subject name.
pub fn summarize(grades: &[Grade], subjects: &HashMap<Uuid, Subject>) -> Vec<SubjectAverage> {
    let mut by_subject: BTreeMap<Uuid, Vec<Decimal>> = BTreeMap::new();
    for grade in grades {
        by_subject.entry(grade.subject_id).or_default().push(grade.percent());
    }

    let mut averages: Vec<SubjectAverage> = by_subject
        .into_iter()
        .filter_map(|(subject_id, percents)| {
            let subject = subjects.get(&subject_id)?;
            let sum: Decimal = percents.iter().copied().sum();
            Some(SubjectAverage {
                subject_id,
                subject_name: subject.name.clone(),
                subject_code: subject.code.clone(),
                coefficient: subject.coefficient,
                grade_count: percents.len(),
                average: round(sum / Decimal::from(percents.len())),
            })
        })
        .collect();
    averages.sort_by(|a, b| a.subject_name.cmp(&b.subject_name));
    averages
}

fn weighted_mean(averages: &[SubjectAverage]) -> Option<Decimal> {
    let weight = averages
        .iter()
        .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a.coefficient))?;
    if averages.is_empty() || weight.is_zero() {
        return None;
    }
    let total = averages
        .iter()
        .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a.average.checked_mul(a.coefficient)?))?;
    total.checked_div(weight).map(round)
}

fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::grade::AssessmentType;
    use chrono::Utc;

    fn subject(name: &str, coefficient: i64) -> Subject {
        Subject {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            name: name.into(),
            code: name.to_uppercase(),
            coefficient: Decimal::from(coefficient),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn grade(subject: &Subject, score: i64, max: i64) -> Grade {
        Grade {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            student_id: Uuid::nil(),
            subject_id: subject.id,
            term: "T1".into(),
            assessment_type: AssessmentType::Exam,
            score: Decimal::from(score),
            max_score: Decimal::from(max),
            assessed_on: Utc::now().date_naive(),
            comment: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn averages_percentages_and_weights_subjects() {
        let maths = subject("Maths", 3);
        let art = subject("Art", 1);
        let grades = vec![grade(&maths, 15, 20), grade(&maths, 50, 100), grade(&art, 9, 10)];
        let subjects: HashMap<_, _> = [(maths.id, maths.clone()), (art.id, art.clone())].into_iter().collect();

        let averages = summarize(&grades, &subjects);
        assert_eq!(averages[0].subject_name, "Art");
        assert_eq!(averages[0].average, Decimal::from(90));
        assert_eq!(averages[1].average, Decimal::new(625, 1));
        assert_eq!(averages[1].grade_count, 2);

        // (62.5 * 3 + 90) / 4
        assert_eq!(weighted_mean(&averages), Some(Decimal::new(6938, 2)));
    }

    #[test]
    fn no_grades_no_overall() {
        assert_eq!(weighted_mean(&[]), None);
    }

    #[test]
    fn overflowing_weights_yield_no_overall() {
        let heavy = |name: &str| SubjectAverage {
            subject_id: Uuid::new_v4(),
            subject_name: name.into(),
            subject_code: name.into(),
            coefficient: Decimal::MAX,
            grade_count: 1,
            average: Decimal::ONE_HUNDRED,
        };
        assert_eq!(weighted_mean(&[heavy("A"), heavy("B")]), None);
    }
}
