use chrono::{Local, NaiveDateTime};
use serde::Serialize;

/// Metadata for one sequenced specimen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub id: String,
    /// Cohort or family grouping.
    pub group_id: Option<String>,
    /// Origin of the depth data (alignment or depth output path).
    pub source: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Sample {
    /// New sample stamped with the current local time.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group_id: None,
            source: None,
            created_at: Local::now().naive_local(),
        }
    }

    pub fn with_group(mut self, group_id: Option<String>) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }
}
