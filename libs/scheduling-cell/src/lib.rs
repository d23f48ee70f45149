pub mod external;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod slots;
pub mod store;

// Re-export the model and service layer for external use
pub use models::*;
pub use services::*;

pub use external::{AppointmentLedger, AuditLog, DoctorDirectory};
pub use handlers::SchedulingState;
pub use store::AvailabilityStore;
