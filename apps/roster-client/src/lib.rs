//! HTTP client and view state for the employee roster service.

pub mod api;
pub mod avatar;
pub mod error;
pub mod model;
pub mod view;

pub use api::{HttpRoster, RosterBackend};
pub use avatar::{AvatarImage, initials, placeholder_url};
pub use error::{ClientError, ClientResult};
pub use model::{AvatarFile, CreateEmployee, Employee, EmployeeStatus, ParseStatusError};
pub use view::{CreateForm, RosterView};
