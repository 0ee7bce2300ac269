//! Attendance status engine and the service that runs it against storage.

pub mod dashboard;
pub mod engine;
pub mod error;
pub mod export;
pub mod policy;
pub mod service;
pub mod summary;

pub use error::AttendanceError;
pub use policy::AttendancePolicy;
pub use service::{AttendanceService, SweepOutcome};
