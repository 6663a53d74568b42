//! Query validator - structural errors and autocomplete for SOQL text

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::optimizer::where_clause;
use crate::schema::{find_field, FieldMetadata, ObjectMetadata};

lazy_static! {
    static ref FROM_OBJECT_RE: Regex = Regex::new(r"FROM\s+(\w+)").unwrap();
    static ref SELECT_LIST_RE: Regex = Regex::new(r"(?s)SELECT\s+(.+?)\s+FROM").unwrap();
    static ref PARTIAL_OBJECT_RE: Regex = Regex::new(r"(?i)FROM\s+(\w*)$").unwrap();
    static ref TRAILING_SELECT_RE: Regex = Regex::new(r"(?i)SELECT\s*$").unwrap();
}

/// Check a query against object and field metadata
///
/// An empty result means the query is structurally valid. Keywords are matched
/// case-sensitively here, unlike the optimizer.
pub fn validate_query(
    query: &str,
    objects: &[ObjectMetadata],
    fields: &[FieldMetadata],
) -> Vec<String> {
    let mut errors = Vec::new();

    if !query.contains("SELECT") || !query.contains("FROM") {
        errors.push("Query must contain SELECT and FROM clauses".to_string());
        return errors;
    }

    if let Some(object) = object_name(query) {
        if !objects.iter().any(|o| o.name == object) {
            errors.push(format!("Object not found: {}", object));
        }
    }

    for field in selected_fields(query) {
        if field == "*" {
            errors.push("SELECT * is not supported in SOQL; list fields explicitly".to_string());
        } else if field != "Id" && find_field(fields, &field).is_none() {
            errors.push(format!("Field not found: {}", field));
        }
    }

    if let Some(clause) = where_clause(query) {
        let open = clause.matches('(').count();
        let close = clause.matches(')').count();
        if open != close {
            errors.push(format!(
                "Unmatched parentheses in WHERE clause ({} opening, {} closing)",
                open, close
            ));
        }
    }

    errors
}

/// Object name following FROM, if any
pub fn object_name(query: &str) -> Option<&str> {
    FROM_OBJECT_RE
        .captures(query)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// Trimmed entries of the SELECT list
pub fn selected_fields(query: &str) -> Vec<String> {
    SELECT_LIST_RE
        .captures(query)
        .map(|cap| {
            cap[1]
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Object,
    Field,
}

/// Autocomplete entry for a partially typed query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySuggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub text: String,
    pub description: String,
}

/// Suggest completions for the text typed so far
///
/// Object names are offered after `FROM`, every known field after a trailing `SELECT`.
pub fn suggest_query(
    partial: &str,
    objects: &[ObjectMetadata],
    fields: &[FieldMetadata],
) -> Vec<QuerySuggestion> {
    let mut suggestions = Vec::new();
    let lower = partial.to_lowercase();

    if lower.contains("from") && !lower.contains("where") {
        if let Some(cap) = PARTIAL_OBJECT_RE.captures(partial) {
            let prefix = cap[1].to_lowercase();
            suggestions.extend(
                objects
                    .iter()
                    .filter(|o| o.name.to_lowercase().starts_with(&prefix))
                    .map(|o| QuerySuggestion {
                        kind: SuggestionKind::Object,
                        text: o.name.clone(),
                        description: o.label.clone(),
                    }),
            );
        }
    }

    // No prefix filtering here: the whole field list is offered
    if TRAILING_SELECT_RE.is_match(partial) && !fields.is_empty() {
        suggestions.extend(fields.iter().map(|f| QuerySuggestion {
            kind: SuggestionKind::Field,
            text: f.name.clone(),
            description: f.label.clone(),
        }));
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn objects() -> Vec<ObjectMetadata> {
        vec![
            ObjectMetadata::new("Account", "Account"),
            ObjectMetadata::new("AccountContactRelation", "Account Contact Relationship"),
            ObjectMetadata::new("Contact", "Contact"),
        ]
    }

    fn fields() -> Vec<FieldMetadata> {
        vec![
            FieldMetadata::new("Name", "Account Name", FieldType::String, true),
            FieldMetadata::new("Industry", "Industry", FieldType::Picklist, false),
        ]
    }

    #[test]
    fn test_valid_query() {
        let errors = validate_query(
            "SELECT Id, Name, Industry FROM Account WHERE (Name = 'a' OR Industry = 'b')",
            &objects(),
            &fields(),
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_missing_select_or_from_fails_fast() {
        let errors = validate_query("select Foo from Bar", &objects(), &fields());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("SELECT and FROM"));
    }

    #[test]
    fn test_unknown_object_then_unknown_field() {
        let errors = validate_query("SELECT Foo FROM Unknown", &objects(), &[]);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "Object not found: Unknown");
        assert_eq!(errors[1], "Field not found: Foo");
    }

    #[test]
    fn test_wildcard_is_error_and_id_always_accepted() {
        let errors = validate_query("SELECT *, Id FROM Account", &objects(), &[]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("SELECT *"));
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let errors = validate_query(
            "SELECT Id FROM Account WHERE (Name = 'a' AND (Industry = 'b')",
            &objects(),
            &fields(),
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Unmatched parentheses"));

        let errors = validate_query("SELECT Id FROM Account WHERE (A = 1", &objects(), &[]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_extract_object_and_fields() {
        let query = "SELECT Id,  Name ,Owner.Name FROM Account WHERE Name != null";
        assert_eq!(object_name(query), Some("Account"));
        assert_eq!(selected_fields(query), vec!["Id", "Name", "Owner.Name"]);
        assert_eq!(object_name("SELECT Id"), None);
        assert!(selected_fields("SELECT Id").is_empty());
    }

    #[test]
    fn test_suggest_objects_after_from() {
        let suggestions = suggest_query("SELECT Id FROM acc", &objects(), &fields());
        let names: Vec<_> = suggestions.iter().map(|s| s.text.as_str()).collect();

        assert_eq!(names, vec!["Account", "AccountContactRelation"]);
        assert_eq!(suggestions[1].description, "Account Contact Relationship");
        assert!(suggestions.iter().all(|s| s.kind == SuggestionKind::Object));
    }

    #[test]
    fn test_no_object_suggestions_after_where() {
        let suggestions = suggest_query("SELECT Id FROM Account WHERE Acc", &objects(), &fields());
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_suggest_all_fields_after_select() {
        let suggestions = suggest_query("SELECT ", &objects(), &fields());
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].kind, SuggestionKind::Field);
        assert_eq!(suggestions[0].text, "Name");

        assert!(suggest_query("SELECT ", &objects(), &[]).is_empty());
    }
}
