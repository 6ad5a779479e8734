pub use super::checkin::Entity as Checkin;
pub use super::user::Entity as User;
