//! Query optimizer - advisory performance hints for a SOQL string

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::{find_field, FieldMetadata, ObjectMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Performance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
}

/// A single optimizer hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    pub fix: String,
}

impl Suggestion {
    fn performance(severity: Severity, message: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            category: Category::Performance,
            severity,
            message: message.into(),
            fix: fix.into(),
        }
    }
}

lazy_static! {
    static ref SELECT_STAR_RE: Regex = Regex::new(r"(?i)SELECT\s+\*").unwrap();
    static ref WHERE_RE: Regex = Regex::new(r"(?i)\bWHERE\b").unwrap();
    static ref LIMIT_RE: Regex = Regex::new(r"(?i)\bLIMIT\b").unwrap();
    static ref ORDER_BY_RE: Regex = Regex::new(r"(?i)\bORDER\s+BY\b").unwrap();
    // Body of the WHERE clause up to ORDER BY, LIMIT or the end of the text
    static ref WHERE_CLAUSE_RE: Regex =
        Regex::new(r"(?is)\bWHERE\s+(.+?)(?:\s+ORDER\s+BY|\s+LIMIT|$)").unwrap();
    static ref FIELD_TOKEN_RE: Regex = Regex::new(r"\b[A-Za-z_]\w*(?:\.\w+)?\b").unwrap();
}

/// Extract the WHERE clause body, if any
pub fn where_clause(query: &str) -> Option<&str> {
    WHERE_CLAUSE_RE
        .captures(query)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// Inspect a query and return performance hints in a fixed order
///
/// Each check runs independently; several may fire for the same query.
pub fn analyze_query(
    query: &str,
    _objects: &[ObjectMetadata],
    fields: &[FieldMetadata],
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    if SELECT_STAR_RE.is_match(query) {
        suggestions.push(Suggestion::performance(
            Severity::Warning,
            "Avoid using SELECT *",
            "List only the fields you need in the SELECT clause",
        ));
    }

    let has_where = WHERE_RE.is_match(query);
    let has_limit = LIMIT_RE.is_match(query);

    if !has_where && !has_limit {
        suggestions.push(Suggestion::performance(
            Severity::Warning,
            "Query has no WHERE clause or LIMIT and may return a very large number of records",
            "Add a WHERE clause to filter records or a LIMIT to cap the result size",
        ));
    }

    if let Some(clause) = where_clause(query) {
        // One hint per occurrence, repeats included
        for token in FIELD_TOKEN_RE.find_iter(clause).map(|m| m.as_str()) {
            if let Some(field) = find_field(fields, token) {
                if !field.indexed {
                    suggestions.push(Suggestion::performance(
                        Severity::Info,
                        format!("Field '{}' in WHERE clause is not indexed", field.name),
                        "Filter on indexed fields (Id, Name, external IDs, lookups) where possible",
                    ));
                }
            }
        }
    }

    if ORDER_BY_RE.is_match(query) && !has_limit {
        suggestions.push(Suggestion::performance(
            Severity::Info,
            "ORDER BY without LIMIT sorts the entire result set",
            "Add a LIMIT clause when ordering results",
        ));
    }

    suggestions
}
