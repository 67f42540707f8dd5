use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::auth::Session;
use crate::database::models::{Membership, NewSchool, School};
use crate::database::{Directory, StoreError};
use crate::services::error::{ServiceError, ServiceResult};
use crate::tenant::TenantScope;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchool {
    #[serde(deserialize_with = "crate::models::trimmed")]
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(deserialize_with = "crate::models::trimmed")]
    #[validate(length(min = 2, max = 60), custom(function = "validate_slug"))]
    pub slug: String,
}

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("slug").with_message("Use lowercase letters, digits and inner hyphens".into()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Bootstrap {
    pub school: School,
    pub membership: Membership,
}

pub struct SchoolService {
    directory: Arc<dyn Directory>,
}

impl SchoolService {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Creates a school owned by a caller who has none yet.
    pub async fn bootstrap(&self, session: &Session, input: CreateSchool) -> ServiceResult<Bootstrap> {
        if session.tenant_id.is_some() {
            return Err(ServiceError::conflict_with(
                "ALREADY_MEMBER",
                "You already belong to a school",
                None,
            ));
        }

        let school = NewSchool { name: input.name, slug: input.slug };
        let (school, membership) = self
            .directory
            .bootstrap_school(session.user_id, school)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation { .. } => ServiceError::conflict("A school with this slug already exists"),
                other => other.into(),
            })?;

        tracing::info!(school_id = %school.id, owner = %session.user_id, "school bootstrapped");
        Ok(Bootstrap { school, membership })
    }

    pub async fn current(&self, scope: &TenantScope) -> ServiceResult<School> {
        self.directory
            .find_school(scope)
            .await?
            .ok_or_else(|| ServiceError::not_found("School", scope))
    }
}
