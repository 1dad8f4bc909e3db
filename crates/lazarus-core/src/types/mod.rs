mod id;
mod timestamp;

pub use id::RecordId;
pub use timestamp::Timestamp;
