/// Job identifiers are UUIDs (v7, time-ordered) generated by the
/// application at creation time and never reused.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
