//! Filters narrowing an entity source to a query set.

use super::SourceRecord;
use crate::value::Value;

static NULL: Value = Value::Null;

/// A predicate over source records.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordFilter {
    /// Field equals value.
    Eq(String, Value),
    /// Field does not equal value.
    Ne(String, Value),
    /// String field starts with prefix.
    StartsWith(String, String),
    /// String field matches a SQL LIKE pattern (`%` and `_`).
    Like(String, String),
    /// Field is null or absent.
    IsNull(String),
    /// Field equals one of the values.
    In(String, Vec<Value>),
    /// All filters match.
    And(Vec<RecordFilter>),
    /// Any filter matches.
    Or(Vec<RecordFilter>),
    /// Filter does not match.
    Not(Box<RecordFilter>),
}

impl RecordFilter {
    /// Field equals value.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        RecordFilter::Eq(field.into(), value.into())
    }

    /// Field does not equal value.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        RecordFilter::Ne(field.into(), value.into())
    }

    /// String field starts with prefix.
    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        RecordFilter::StartsWith(field.into(), prefix.into())
    }

    /// String field matches a LIKE pattern.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        RecordFilter::Like(field.into(), pattern.into())
    }

    /// Negate this filter.
    pub fn negate(self) -> Self {
        RecordFilter::Not(Box::new(self))
    }

    /// Evaluate against a record. Absent fields read as null.
    pub fn matches(&self, record: &SourceRecord) -> bool {
        match self {
            RecordFilter::Eq(field, value) => value_of(record, field) == value,
            RecordFilter::Ne(field, value) => value_of(record, field) != value,
            RecordFilter::StartsWith(field, prefix) => value_of(record, field)
                .as_str()
                .is_some_and(|s| s.starts_with(prefix.as_str())),
            RecordFilter::Like(field, pattern) => value_of(record, field)
                .as_str()
                .is_some_and(|s| like_match(s, pattern)),
            RecordFilter::IsNull(field) => value_of(record, field).is_null(),
            RecordFilter::In(field, values) => values.contains(value_of(record, field)),
            RecordFilter::And(filters) => filters.iter().all(|f| f.matches(record)),
            RecordFilter::Or(filters) => filters.iter().any(|f| f.matches(record)),
            RecordFilter::Not(filter) => !filter.matches(record),
        }
    }
}

fn value_of<'r>(record: &'r SourceRecord, field: &str) -> &'r Value {
    record.get(field).unwrap_or(&NULL)
}

/// Match a string against a SQL LIKE pattern.
///
/// `%` matches any run of characters, `_` exactly one. Matching is case
/// sensitive.
pub fn like_match(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // matched[j]: value[..i] matches pattern[..j]
    let mut matched = vec![false; pattern.len() + 1];
    matched[0] = true;
    for j in 1..=pattern.len() {
        matched[j] = matched[j - 1] && pattern[j - 1] == '%';
    }

    for c in &value {
        let mut next = vec![false; pattern.len() + 1];
        for j in 1..=pattern.len() {
            next[j] = match pattern[j - 1] {
                '%' => next[j - 1] || matched[j],
                '_' => matched[j - 1],
                p => matched[j - 1] && p == *c,
            };
        }
        matched = next;
    }

    matched[pattern.len()]
}
