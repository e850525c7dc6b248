//! Employee roster: records, status updates and avatar lifecycle.

pub mod model;
pub mod service;
pub mod validate;

pub use entity::EmployeeStatus;
pub use model::{AvatarUpload, CreateEmployee, Employee, UpdateStatus};
pub use service::{RosterService, seed_demo};
pub use validate::{MAX_AVATAR_BYTES, MAX_NAME_LEN, MAX_TITLE_LEN};
