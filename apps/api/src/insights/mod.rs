// Mood insights: validate → rate-limit → fetch → aggregate → respond.
// The reader and aggregator are side-effect free; the only write on this path
// is the rate limiter's window transaction.

pub mod aggregator;
pub mod handlers;
pub mod models;
pub mod reader;
pub mod service;

pub use models::MoodEntry;
pub use service::InsightsService;
