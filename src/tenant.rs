use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Proof that a request is acting inside one school.
///
/// Every record store method takes a `&TenantScope`, so a query that is not
/// scoped to a tenant cannot be written. Inside the request pipeline the only
/// way to obtain one is `Session::require_tenant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TenantScope(Uuid);

impl TenantScope {
    pub(crate) fn new(tenant_id: Uuid) -> Self {
        Self(tenant_id)
    }

    /// Scope for operator tooling and tests that act on a school directly,
    /// outside of any user session.
    pub fn assume(tenant_id: Uuid) -> Self {
        tracing::debug!(%tenant_id, "assuming tenant scope outside of a session");
        Self(tenant_id)
    }

    pub fn tenant_id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
