//! Query builder - renders builder state into a SOQL string

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Condition;
use crate::schema::FieldType;

/// Group key for conditions without an explicit group id
pub const DEFAULT_GROUP: &str = "default";

/// Boolean operator joining conditions, used both inside and across groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOperator {
    #[default]
    And,
    Or,
}

impl GroupOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupOperator::And => "AND",
            GroupOperator::Or => "OR",
        }
    }
}

impl fmt::Display for GroupOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ORDER BY key; direction is passed through as written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,

    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_direction() -> String {
    "ASC".to_string()
}

impl OrderBy {
    pub fn new(field: &str, direction: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: direction.to_string(),
        }
    }
}

/// Everything the user has picked so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryBuilderState {
    pub selected_object: Option<String>,

    /// Insertion ordered, no duplicates
    pub selected_fields: Vec<String>,

    pub conditions: Vec<Condition>,

    pub group_operator: GroupOperator,

    pub order_by: Vec<OrderBy>,

    /// `Some(0)` renders no LIMIT clause
    pub limit: Option<u32>,
}

impl QueryBuilderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the rendered query has a FROM clause and can be sent to the API
    pub fn is_runnable(&self) -> bool {
        self.selected_object.is_some()
    }

    /// Select an object; switching to a different object resets everything object-specific
    pub fn set_object(&mut self, object: &str) {
        if self.selected_object.as_deref() == Some(object) {
            return;
        }

        self.selected_object = Some(object.to_string());
        self.selected_fields.clear();
        self.conditions.clear();
        self.order_by.clear();
    }

    /// Add the field if missing, remove it otherwise. Returns whether it is now selected.
    pub fn toggle_field(&mut self, field: &str) -> bool {
        if let Some(pos) = self.selected_fields.iter().position(|f| f == field) {
            self.selected_fields.remove(pos);
            false
        } else {
            self.selected_fields.push(field.to_string());
            true
        }
    }

    pub fn select_field(&mut self, field: &str) {
        if !self.selected_fields.iter().any(|f| f == field) {
            self.selected_fields.push(field.to_string());
        }
    }

    /// Append a condition and return its id
    pub fn add_condition(&mut self, condition: Condition) -> String {
        let id = condition.id.clone();
        self.conditions.push(condition);
        id
    }

    /// Replace the condition with the same id. Returns false if no such condition exists.
    pub fn update_condition(&mut self, condition: Condition) -> bool {
        match self.conditions.iter_mut().find(|c| c.id == condition.id) {
            Some(existing) => {
                *existing = condition;
                true
            }
            None => false,
        }
    }

    pub fn remove_condition(&mut self, id: &str) -> bool {
        let before = self.conditions.len();
        self.conditions.retain(|c| c.id != id);
        self.conditions.len() != before
    }

    pub fn set_group_operator(&mut self, op: GroupOperator) {
        self.group_operator = op;
    }

    pub fn add_order_by(&mut self, field: &str, direction: &str) {
        self.order_by.push(OrderBy::new(field, direction));
    }

    pub fn remove_order_by(&mut self, field: &str) {
        self.order_by.retain(|o| o.field != field);
    }

    pub fn set_limit(&mut self, limit: Option<u32>) {
        self.limit = limit;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Render the builder state as SOQL
///
/// Without a selected object the result has no FROM clause.
pub fn build_query(state: &QueryBuilderState) -> String {
    let mut query = String::from("SELECT ");

    if state.selected_fields.is_empty() {
        query.push_str("Id");
    } else {
        query.push_str(&state.selected_fields.join(", "));
    }

    if let Some(object) = &state.selected_object {
        query.push_str(" FROM ");
        query.push_str(object);
    }

    if !state.conditions.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&build_where_clause(&state.conditions, state.group_operator));
    }

    if !state.order_by.is_empty() {
        let keys: Vec<String> = state
            .order_by
            .iter()
            .map(|o| format!("{} {}", o.field, o.direction))
            .collect();
        query.push_str(" ORDER BY ");
        query.push_str(&keys.join(", "));
    }

    if let Some(limit) = state.limit.filter(|l| *l > 0) {
        query.push_str(&format!(" LIMIT {}", limit));
    }

    query
}

fn build_where_clause(conditions: &[Condition], op: GroupOperator) -> String {
    // Groups keep the order in which their first condition appears
    let mut groups: Vec<(&str, Vec<String>)> = Vec::new();

    for condition in conditions {
        let key = condition.group_id.as_deref().unwrap_or(DEFAULT_GROUP);
        let rendered = format!(
            "{} {} {}",
            condition.field,
            condition.operator,
            format_value(&condition.value, &condition.field_type)
        );

        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(rendered),
            None => groups.push((key, vec![rendered])),
        }
    }

    let separator = format!(" {} ", op);
    let rendered: Vec<String> = groups
        .into_iter()
        .map(|(_, members)| {
            if members.len() > 1 {
                format!("({})", members.join(&separator))
            } else {
                members.join(&separator)
            }
        })
        .collect();

    rendered.join(&separator)
}

/// Format a literal according to the declared field type
pub fn format_value(value: &str, field_type: &FieldType) -> String {
    match field_type {
        t if t.is_string_like() => quote(value),
        FieldType::Boolean => value.to_string(),
        t if t.is_numeric() => value.to_string(),
        FieldType::Date => {
            if value.starts_with('\'') {
                value.to_string()
            } else {
                format!("'{}'", value)
            }
        }
        FieldType::Datetime => value.to_string(),
        _ => quote(value),
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "\\'"))
}
