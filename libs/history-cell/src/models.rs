use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryEntryType {
    Inference,
    ReportAnalysis,
    Chatbot,
    MeetingSummary,
    DoctorVisit,
}

impl fmt::Display for HistoryEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryEntryType::Inference => write!(f, "inference"),
            HistoryEntryType::ReportAnalysis => write!(f, "report_analysis"),
            HistoryEntryType::Chatbot => write!(f, "chatbot"),
            HistoryEntryType::MeetingSummary => write!(f, "meeting_summary"),
            HistoryEntryType::DoctorVisit => write!(f, "doctor_visit"),
        }
    }
}

/// One appended journal record. Entries are written once and never updated
/// or deleted; each append is its own store row, so concurrent appends from
/// the same user cannot clobber each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_type: HistoryEntryType,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
pub struct AppendHistoryRequest {
    pub entry_type: HistoryEntryType,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
