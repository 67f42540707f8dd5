use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{Credentials, TokenKind, TokenService};
use crate::database::models::{Membership, User};
use crate::database::Directory;
use crate::services::error::{ServiceError, ServiceResult};
use crate::tenant::TenantScope;

/// The principal behind one request. Built per request and never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    /// Empty when the user has no active membership yet (school bootstrap).
    pub tenant_id: Option<Uuid>,
    pub membership_id: Option<Uuid>,
    pub role_id: Option<Uuid>,
}

impl Session {
    pub fn new(user: &User, membership: Option<&Membership>) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            tenant_id: membership.map(|m| m.school_id),
            membership_id: membership.map(|m| m.id),
            role_id: membership.map(|m| m.role_id),
        }
    }

    pub fn require_tenant(&self) -> ServiceResult<TenantScope> {
        self.tenant_id
            .map(TenantScope::new)
            .ok_or_else(|| ServiceError::unauthorized("Tenant context required"))
    }
}

/// Fails with `Unauthorized` when no principal could be resolved.
pub fn require_auth(session: Option<Session>) -> ServiceResult<Session> {
    session.ok_or_else(|| ServiceError::unauthorized("Authentication required"))
}

pub struct SessionResolver {
    tokens: TokenService,
    directory: Arc<dyn Directory>,
}

impl SessionResolver {
    pub fn new(tokens: TokenService, directory: Arc<dyn Directory>) -> Self {
        Self { tokens, directory }
    }

    /// `Ok(None)` for anonymous requests and for credentials that do not
    /// resolve to a known user. Store failures propagate.
    pub async fn resolve_session(&self, credentials: &Credentials) -> ServiceResult<Option<Session>> {
        let Some(token) = credentials.access_token.as_deref() else {
            return Ok(None);
        };

        let claims = match self.tokens.verify(token, TokenKind::Access) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(error = %e, "rejected access credential");
                return Ok(None);
            }
        };

        let Some(user) = self.directory.find_user(claims.sub).await? else {
            tracing::warn!(user_id = %claims.sub, "credential refers to an unknown user");
            return Ok(None);
        };

        let membership = self.directory.active_membership(user.id).await?;
        if membership.is_none() {
            tracing::debug!(user_id = %user.id, "session has no active membership");
        }
        Ok(Some(Session::new(&user, membership.as_ref())))
    }

    /// Exchanges a refresh credential for a new access credential.
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<(User, String)> {
        let claims = self.tokens.verify(refresh_token, TokenKind::Refresh).map_err(|e| {
            tracing::warn!(error = %e, "rejected refresh credential");
            ServiceError::unauthorized("Invalid or expired refresh token")
        })?;

        let user = self
            .directory
            .find_user(claims.sub)
            .await?
            .ok_or_else(|| ServiceError::unauthorized("Invalid or expired refresh token"))?;

        let access = self
            .tokens
            .issue(user.id, &user.email, TokenKind::Access)
            .map_err(|e| ServiceError::internal(e.to_string()))?;
        Ok((user, access))
    }
}
