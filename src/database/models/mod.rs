pub mod membership;
pub mod role;
pub mod school;
pub mod user;

pub use membership::Membership;
pub use role as system_roles;
pub use school::{NewSchool, School};
pub use user::{NewUser, User};
