//! Filter conditions for the WHERE clause

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use crate::schema::{find_field, FieldMetadata, FieldType};

/// Comparison operators offered by the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "INCLUDES")]
    Includes,
    #[serde(rename = "EXCLUDES")]
    Excludes,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Gt,
        Operator::Le,
        Operator::Ge,
        Operator::Like,
        Operator::In,
        Operator::NotIn,
        Operator::Includes,
        Operator::Excludes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Includes => "INCLUDES",
            Operator::Excludes => "EXCLUDES",
        }
    }

    /// Check that this operator can be applied to a field of the given type
    pub fn check_compatible(&self, field_type: &FieldType) -> Result<()> {
        match (self, field_type) {
            (Operator::Eq | Operator::Ne, _) => Ok(()),

            (_, FieldType::Boolean) => bail!("Operator {} cannot be used on boolean fields", self),

            (Operator::Includes | Operator::Excludes, FieldType::Multipicklist) => Ok(()),
            (Operator::Includes | Operator::Excludes, _) => {
                bail!("Operator {} is only valid on multi-select picklists", self)
            }

            (Operator::Like, t) if t.is_numeric() || matches!(t, FieldType::Date | FieldType::Datetime) => {
                bail!("Operator LIKE cannot be used on {} fields", t)
            }
            (Operator::Like, FieldType::Multipicklist) => {
                bail!("Operator LIKE cannot be used on multipicklist fields")
            }

            _ => Ok(()),
        }
    }

    /// Operators that may be applied to a field of the given type
    pub fn for_type(field_type: &FieldType) -> Vec<Operator> {
        Self::ALL
            .into_iter()
            .filter(|op| op.check_compatible(field_type).is_ok())
            .collect()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| anyhow::anyhow!("Unknown operator '{}'", s))
    }
}

/// A single filter predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default = "new_condition_id")]
    pub id: String,

    pub field: String,

    pub operator: Operator,

    #[serde(default)]
    pub value: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Conditions sharing a group id are rendered inside one pair of parentheses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

fn new_condition_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Condition {
    pub fn new(field: &str, operator: Operator, value: &str, field_type: FieldType) -> Self {
        Self {
            id: new_condition_id(),
            field: field.to_string(),
            operator,
            value: value.to_string(),
            field_type,
            group_id: None,
        }
    }

    /// Create a condition for a described field, picking up its type
    pub fn for_field(field: &FieldMetadata, operator: Operator, value: &str) -> Self {
        Self::new(&field.name, operator, value, field.field_type.clone())
    }

    pub fn in_group(mut self, group_id: &str) -> Self {
        self.group_id = Some(group_id.to_string());
        self
    }

    /// Parse `Field<op>value` as given on the command line, e.g. `Name=Acme` or `Amount>=100`
    pub fn parse(expr: &str, fields: &[FieldMetadata]) -> Result<Self> {
        let (field, operator, value) = split_expression(expr)?;
        let field_type = find_field(fields, field)
            .map(|f| f.field_type.clone())
            .unwrap_or_default();

        Ok(Self::new(field, operator, value, field_type))
    }

    /// Check the condition against field metadata
    pub fn check(&self, fields: &[FieldMetadata]) -> Vec<String> {
        let mut errors = Vec::new();

        if find_field(fields, &self.field).is_none() {
            errors.push(format!("Field not found: {}", self.field));
        }

        if let Err(e) = self.operator.check_compatible(&self.field_type) {
            errors.push(format!("Field '{}': {}", self.field, e));
        }

        errors
    }
}

const WORD_OPERATORS: [&str; 5] = [" NOT IN ", " IN ", " LIKE ", " INCLUDES ", " EXCLUDES "];
const SYMBOL_OPERATORS: [&str; 6] = ["!=", "<=", ">=", "=", "<", ">"];

/// Split at the leftmost operator; at the same position the longer one wins (`>=` over `>`)
///
/// Word operators need surrounding spaces: `Name LIKE 'Ac%'`.
fn split_expression(expr: &str) -> Result<(&str, Operator, &str)> {
    let upper = expr.to_ascii_uppercase();

    let (pos, token) = WORD_OPERATORS
        .iter()
        .chain(SYMBOL_OPERATORS.iter())
        .filter_map(|op| upper.find(op).map(|pos| (pos, *op)))
        .min_by_key(|(pos, op)| (*pos, Reverse(op.len())))
        .with_context(|| format!("Condition '{}' has no operator", expr))?;

    let field = expr[..pos].trim();
    let value = expr[pos + token.len()..].trim();
    if field.is_empty() {
        bail!("Missing field name in condition '{}'", expr);
    }

    Ok((field, token.trim().parse()?, value))
}
