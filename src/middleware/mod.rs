pub mod response;
pub mod session;

pub use response::{ApiResponse, ApiResult};
pub use session::{session_middleware, AuthSession, ResolvedSession, TenantContext};
