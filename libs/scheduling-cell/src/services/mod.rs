pub mod booking;
pub mod resolution;
pub mod schedule;
pub mod search;

pub use booking::BookingService;
pub use resolution::ResolutionService;
pub use schedule::ScheduleService;
pub use search::SearchService;
