use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{MemberId, Term};

pub type LogId = i64;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash,
    Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LogKind {
    #[default]
    Unapproved,
    Approved,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Unapproved => write!(f, "unapproved"),
            LogKind::Approved => write!(f, "approved"),
        }
    }
}

/// A payment filed by a member for a term.
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct Log {
    pub id: LogId,
    pub member_id: MemberId,
    pub year: i32,
    pub semester: i32,
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Log {
    /// A new unapproved payment, timestamped now.
    /// The id is assigned by the store.
    pub fn new(term: Term, member_id: &str, amount: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: 0,
            member_id: member_id.to_string(),
            year: term.year,
            semester: term.semester,
            amount,
            kind: LogKind::Unapproved,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn term(&self) -> Term {
        Term::new(self.year, self.semester)
    }

    pub fn is_approved(&self) -> bool {
        self.kind == LogKind::Approved
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LogFilter {
    pub ids: Option<Vec<LogId>>,
    pub year: Option<i32>,
    pub semester: Option<i32>,
    pub member_id: Option<MemberId>,
    pub kind: Option<LogKind>,
}

impl LogFilter {
    /// All logs of a term
    pub fn term(term: Term) -> Self {
        Self {
            year: Some(term.year),
            semester: Some(term.semester),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogChange {
    /// Mark as approved at the given unix time
    Approve { at: i64 },
}
