//! Interview questions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Question origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionKind {
    /// Shared catalog question visible to every user
    Common,
    /// Generated from a user's résumé
    Resume,
    /// Written by the user
    Custom,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Common => "COMMON",
            QuestionKind::Resume => "RESUME",
            QuestionKind::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COMMON" => Ok(QuestionKind::Common),
            "RESUME" => Ok(QuestionKind::Resume),
            "CUSTOM" => Ok(QuestionKind::Custom),
            other => Err(format!("unknown question kind: {}", other)),
        }
    }
}

/// A question a user can answer on video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: i64,
    /// None for COMMON questions
    pub owner_id: Option<String>,
    pub kind: QuestionKind,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!("resume".parse::<QuestionKind>().unwrap(), QuestionKind::Resume);
        assert_eq!("CUSTOM".parse::<QuestionKind>().unwrap(), QuestionKind::Custom);
        assert!("FOLLOWUP".parse::<QuestionKind>().is_err());
    }
}
