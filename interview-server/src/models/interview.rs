//! Interview sessions and their aggregated summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interview mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InterviewKind {
    Practice,
    Real,
}

impl InterviewKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InterviewKind::Practice => "PRACTICE",
            InterviewKind::Real => "REAL",
        }
    }
}

impl fmt::Display for InterviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PRACTICE" => Ok(InterviewKind::Practice),
            "REAL" => Ok(InterviewKind::Real),
            other => Err(format!("unknown interview kind: {}", other)),
        }
    }
}

/// Aggregated narrative written once enough videos are analyzed
///
/// Stored as JSON text on the interview row and fully overwritten on every
/// recomputation. `comparison` is omitted when the owner has no earlier
/// interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSummary {
    pub overallcompare: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<String>,
}

/// One interview session owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub interview_id: i64,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
    pub kind: InterviewKind,
    pub summary: Option<InterviewSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_omits_absent_comparison() {
        let summary = InterviewSummary {
            overallcompare: "steady".to_string(),
            comparison: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json, serde_json::json!({"overallcompare": "steady"}));
    }

    #[test]
    fn test_kind_round_trip_through_str() {
        for kind in [InterviewKind::Practice, InterviewKind::Real] {
            assert_eq!(kind.as_str().parse::<InterviewKind>().unwrap(), kind);
        }
        assert_eq!("practice".parse::<InterviewKind>().unwrap(), InterviewKind::Practice);
    }
}
