use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::question::Question;

/// Where the questions of a quiz came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizSource {
    Ai,
    Fallback,
}

impl QuizSource {
    pub fn as_str(self) -> &'static str {
        match self {
            QuizSource::Ai => "ai",
            QuizSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for QuizSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai" => Ok(QuizSource::Ai),
            "fallback" => Ok(QuizSource::Fallback),
            other => Err(format!("unknown quiz source '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub topic: String,
    pub normalized_topic: String,
    pub model: String,
    pub cache_key: String,
    pub requester_id: Option<String>,
    pub source: QuizSource,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Quiz {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_accessible_by(&self, requester_id: Option<&str>) -> bool {
        owner_allows(self.requester_id.as_deref(), requester_id)
    }
}

/// A resource bound to an owner may only be handed to or used by that owner.
pub fn owner_allows(owner: Option<&str>, requester_id: Option<&str>) -> bool {
    match owner {
        None => true,
        Some(owner) => requester_id == Some(owner),
    }
}

/// A quiz together with its questions ordered by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredQuiz {
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}
