use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::handlers::{self, SchedulingState};

pub fn scheduling_routes(state: Arc<SchedulingState>) -> Router {
    Router::new()
        // Availability resolution
        .route("/doctors/{doctor_id}/availability", get(handlers::resolve_availability))
        .route("/doctors/{doctor_id}/availability/range", get(handlers::availability_range))
        .route("/doctors/{doctor_id}/schedule", get(handlers::list_schedule))
        .route("/availability/search", get(handlers::search_availability))

        // Schedule editing
        .route("/doctors/{doctor_id}/availability/single", post(handlers::set_single))
        .route("/doctors/{doctor_id}/availability/recurring", post(handlers::set_recurring))
        .route("/doctors/{doctor_id}/availability/block", post(handlers::block_date))
        .route("/availability/{record_id}/slots/{index}", delete(handlers::remove_slot))

        // Booking
        .route("/doctors/{doctor_id}/bookings", post(handlers::book_slot))
        .with_state(state)
}
