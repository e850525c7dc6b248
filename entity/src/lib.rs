//! sea-orm entities for the roster schema.

pub mod employees;

pub use employees::Status as EmployeeStatus;
