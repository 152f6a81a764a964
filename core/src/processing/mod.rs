pub mod bucket;
pub mod severity;

pub use bucket::{Bucketer, LocationBucket, LocationBuckets, TimeBuckets};
pub use severity::classify;
