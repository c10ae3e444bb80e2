//! Clinical trial records and search result types.
//!
//! `TrialRecord` is the primary-store record; only `id`, `title`, `description`
//! and `primary_outcome` take part in indexing.

use crate::types::error::{IndexError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// External record identifier (primary-store id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random (UUID v4) identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Trial phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TrialPhase {
    #[serde(rename = "1")]
    #[default]
    Phase1,
    #[serde(rename = "2")]
    Phase2,
    #[serde(rename = "3")]
    Phase3,
    #[serde(rename = "4")]
    Phase4,
}

/// Trial recruitment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
    #[default]
    Planned,
    Recruiting,
    Active,
    Completed,
    Terminated,
}

fn generated_id() -> RecordId {
    RecordId::generate()
}

/// Clinical trial record as held by the primary store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Primary-store identifier (random UUID when omitted from new input)
    #[serde(default = "generated_id")]
    pub id: RecordId,

    /// ClinicalTrials.gov identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nct_id: Option<String>,

    pub title: String,

    #[serde(default)]
    pub phase: TrialPhase,

    #[serde(default)]
    pub status: TrialStatus,

    #[serde(default = "Utc::now")]
    pub start_date: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    pub description: String,

    pub primary_outcome: String,

    #[serde(default)]
    pub secondary_outcomes: Vec<String>,

    #[serde(default)]
    pub inclusion_criteria: Vec<String>,

    #[serde(default)]
    pub exclusion_criteria: Vec<String>,

    #[serde(default)]
    pub locations: Vec<String>,

    #[serde(default)]
    pub sponsor: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl TrialRecord {
    /// Create a record with a generated id and default metadata.
    ///
    /// # Arguments
    ///
    /// * `title` - Trial title
    /// * `description` - Free-text description
    /// * `primary_outcome` - Primary outcome measure
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        primary_outcome: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::generate(),
            nct_id: None,
            title: title.into(),
            phase: TrialPhase::default(),
            status: TrialStatus::default(),
            start_date: now,
            end_date: None,
            description: description.into(),
            primary_outcome: primary_outcome.into(),
            secondary_outcomes: Vec::new(),
            inclusion_criteria: Vec::new(),
            exclusion_criteria: Vec::new(),
            locations: Vec::new(),
            sponsor: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the generated id.
    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = id.into();
        self
    }

    /// Text the record's embedding is computed from.
    ///
    /// `title ++ " " ++ description ++ " " ++ primary_outcome`
    pub fn subject_text(&self) -> String {
        format!("{} {} {}", self.title, self.description, self.primary_outcome)
    }

    /// Validate record fields.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Validation` if the title is blank or the end date
    /// precedes the start date
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(IndexError::validation("title must not be empty"));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(IndexError::validation(format!(
                    "end_date {} is before start_date {}",
                    end, self.start_date
                )));
            }
        }
        Ok(())
    }
}

/// One nearest-neighbor hit, before record resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub record_id: RecordId,

    /// `1 - distance / 10`; not bounded to [0, 1]
    pub similarity_score: f32,

    /// Slot in the index / ledger
    pub position: usize,

    /// Raw distance under the index metric
    pub distance: f32,
}

/// Search hit resolved against the primary store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialMatch {
    #[serde(flatten)]
    pub record: TrialRecord,

    pub similarity_score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_subject_text_concatenation() {
        let record = TrialRecord::new("Diabetes Study", "Type 2 management", "HbA1c");
        assert_eq!(record.subject_text(), "Diabetes Study Type 2 management HbA1c");
    }

    #[test]
    fn test_validate_rejects_end_before_start() {
        let mut record = TrialRecord::new("Trial", "desc", "outcome");
        record.end_date = Some(record.start_date - Duration::days(1));
        assert!(matches!(record.validate(), Err(IndexError::Validation(_))));

        record.end_date = Some(record.start_date + Duration::days(30));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let json = r#"{
            "title": "A Phase 3 Trial of Wegovy in Obesity",
            "phase": "3",
            "status": "recruiting",
            "description": "Evaluating the efficacy of Wegovy in treatment of obesity",
            "primary_outcome": "Weight loss percentage after 68 weeks",
            "locations": ["Copenhagen, Denmark"]
        }"#;

        let record: TrialRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.phase, TrialPhase::Phase3);
        assert_eq!(record.status, TrialStatus::Recruiting);
        assert_eq!(record.locations.len(), 1);
        assert!(!record.id.as_str().is_empty());
    }

    #[test]
    fn test_record_id_serializes_as_string() {
        let id = RecordId::from("test-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"test-1\"");
    }
}
