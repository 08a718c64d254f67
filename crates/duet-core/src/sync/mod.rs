//! Live message subscription with reconnect and cancellation.

mod backoff;
mod stream;

pub use backoff::BackoffPolicy;
pub use stream::{MessageStream, Snapshot, SubscriptionHandle, SubscriptionToken};
