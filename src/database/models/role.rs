//! Roles seeded by the initial migration. Ids are fixed so code can refer to them.

use uuid::Uuid;

pub const ADMIN: Uuid = Uuid::from_u128(0x6a1f_0000_0000_4000_8000_0000_0000_0001);
pub const TEACHER: Uuid = Uuid::from_u128(0x6a1f_0000_0000_4000_8000_0000_0000_0002);
pub const STAFF: Uuid = Uuid::from_u128(0x6a1f_0000_0000_4000_8000_0000_0000_0003);

pub fn name_of(role_id: Uuid) -> Option<&'static str> {
    match role_id {
        id if id == ADMIN => Some("ADMIN"),
        id if id == TEACHER => Some("TEACHER"),
        id if id == STAFF => Some("STAFF"),
        _ => None,
    }
}
