use std::collections::HashSet;
use std::hash::Hash;

use buddy_data::Term;

use crate::{Error, Result};

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

pub(crate) fn require_positive(field: &str, value: i64) -> Result<()> {
    if value <= 0 {
        return Err(Error::Validation(format!(
            "{} must be positive, got {}",
            field, value
        )));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &str, value: i64) -> Result<()> {
    if value < 0 {
        return Err(Error::Validation(format!(
            "{} must not be negative, got {}",
            field, value
        )));
    }
    Ok(())
}

pub(crate) fn require_term(term: Term) -> Result<()> {
    if term.year <= 0 || term.semester <= 0 {
        return Err(Error::Validation(format!("invalid term {}", term)));
    }
    Ok(())
}

/// Drop repeated keys, keeping the first occurrence
pub(crate) fn unique<K>(keys: &[K]) -> Vec<K>
where
    K: Clone + Eq + Hash,
{
    let mut seen = HashSet::new();
    keys.iter()
        .filter(|key| seen.insert((*key).clone()))
        .cloned()
        .collect()
}

/// The first wanted key that is not among the found ones
pub(crate) fn first_missing<'a, K>(
    wanted: &'a [K],
    found: impl IntoIterator<Item = K>,
) -> Option<&'a K>
where
    K: Eq + Hash,
{
    let found: HashSet<K> = found.into_iter().collect();
    wanted.iter().find(|key| !found.contains(*key))
}
