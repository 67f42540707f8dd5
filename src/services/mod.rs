// services/mod.rs - Domain services
//
// Everything here takes a TenantScope and returns ServiceResult; nothing in
// this layer knows about HTTP.

pub mod bulk;
pub mod conflicts;
pub mod entity;
pub mod error;
pub mod export;
pub mod grades;
pub mod messages;
pub mod pagination;
pub mod schools;
pub mod timetable;

pub use entity::{BulkReport, Entity, EntityService, Stamp};
pub use error::{ServiceError, ServiceResult};
pub use messages::MessageService;
pub use pagination::{PageParams, PageRequest, Paginated};
pub use schools::SchoolService;
pub use timetable::TimetableService;
