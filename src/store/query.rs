//! Row filters shared by both backends
//!
//! A [`Query`] renders to PostgREST query parameters for Supabase and is
//! evaluated directly against JSON rows by the in-memory store, so both
//! backends agree on which rows a conditional write touches.

use serde_json::Value;

/// Column holding the report timestamp, used for newest-first ordering
pub const REPORTED_DATE: &str = "reportedDate";

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(&'static str, Value),
}

impl Condition {
    fn column(&self) -> &'static str {
        match self {
            Condition::Eq(column, _) => column,
        }
    }

    fn to_param(&self) -> String {
        match self {
            Condition::Eq(_, value) => format!("eq.{}", render(value)),
        }
    }

    fn matches(&self, row: &Value) -> bool {
        match self {
            Condition::Eq(column, value) => row.get(*column) == Some(value),
        }
    }
}

/// Equality conditions plus optional ordering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: Vec<Condition>,
    newest_first: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column == value`
    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(column, value.into()));
        self
    }

    /// Order by report date, most recent first
    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    pub fn is_newest_first(&self) -> bool {
        self.newest_first
    }

    /// PostgREST query parameters
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .conditions
            .iter()
            .map(|c| (c.column().to_string(), c.to_param()))
            .collect();

        if self.newest_first {
            params.push(("order".to_string(), format!("{}.desc", REPORTED_DATE)));
        }

        params
    }

    /// Evaluate the conditions against a stored row
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
