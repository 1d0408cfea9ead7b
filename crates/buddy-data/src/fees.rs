use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::LogId;

/// An academic term, the key of a fee.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash,
    PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Term {
    pub year: i32,
    pub semester: i32,
}

impl Term {
    pub fn new(year: i32, semester: i32) -> Self {
        Self { year, semester }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.year, self.semester)
    }
}

/// The dues of a term and the payment logs filed for it.
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct Fee {
    pub year: i32,
    pub semester: i32,
    pub amount: i64,
    #[sqlx(skip)]
    pub logs: Vec<LogId>,
}

impl Fee {
    pub fn new(term: Term, amount: i64) -> Self {
        Self {
            year: term.year,
            semester: term.semester,
            amount,
            logs: vec![],
        }
    }

    pub fn term(&self) -> Term {
        Term::new(self.year, self.semester)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FeeFilter {
    pub year: Option<i32>,
    pub semester: Option<i32>,
}

impl From<Term> for FeeFilter {
    fn from(term: Term) -> Self {
        Self {
            year: Some(term.year),
            semester: Some(term.semester),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeChange {
    /// Add to the due amount. The store only applies it
    /// when the resulting amount is not negative.
    Deposit(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_display_and_order() {
        let spring = Term::new(2022, 1);
        let fall = Term::new(2022, 2);
        assert_eq!(spring.to_string(), "2022/1");
        assert!(spring < fall);
        assert!(Term::new(2021, 2) < spring);
    }

    #[test]
    fn test_fee_term() {
        let fee = Fee::new(Term::new(2021, 1), 40000);
        assert_eq!(fee.term(), Term::new(2021, 1));
        assert!(fee.logs.is_empty());

        let filter: FeeFilter = fee.term().into();
        assert_eq!(filter.year, Some(2021));
        assert_eq!(filter.semester, Some(1));
    }
}
