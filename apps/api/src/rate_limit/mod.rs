// Sliding 24-hour call windows, one document per (user, operation).
// All mutation goes through `store::run_transaction`; nothing here holds
// counters in process memory.

pub mod limiter;
pub mod window;

pub use limiter::{FailurePolicy, QuotaStatus, RateLimiter};
