// Mood entry write path. Entries recorded here are what the insights reader
// aggregates; the recorder never touches rate-limit windows.

pub mod handlers;
pub mod recorder;

pub use recorder::{record_mood, NewMoodEntry, RecordedMood};
