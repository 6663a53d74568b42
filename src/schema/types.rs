//! Object and field metadata as returned by the describe endpoints

use serde::{Deserialize, Serialize};
use std::fmt;

/// An sObject entry from `GET /sobjects/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub name: String,

    #[serde(default)]
    pub label: String,
}

impl ObjectMetadata {
    pub fn new(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
        }
    }
}

/// A field entry from `GET /sobjects/{object}/describe`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    pub name: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Whether the field is backed by a database index
    #[serde(default)]
    pub indexed: bool,

    /// For reference fields: the target object names
    #[serde(default)]
    pub reference_to: Vec<String>,

    /// For reference fields: the relationship used in dotted paths (`Owner.Name`)
    #[serde(default)]
    pub relationship_name: Option<String>,
}

impl FieldMetadata {
    pub fn new(name: &str, label: &str, field_type: FieldType, indexed: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            field_type,
            indexed,
            reference_to: Vec::new(),
            relationship_name: None,
        }
    }
}

/// Find a field by exact API name
pub fn find_field<'a>(fields: &'a [FieldMetadata], name: &str) -> Option<&'a FieldMetadata> {
    fields.iter().find(|f| f.name == name)
}

/// Salesforce field type tags
///
/// Unknown tags survive a round trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    #[default]
    String,
    Textarea,
    Url,
    Email,
    Phone,
    Boolean,
    Number,
    Double,
    Int,
    Currency,
    Percent,
    Date,
    Datetime,
    Picklist,
    Multipicklist,
    Reference,
    Id,
    Other(String),
}

impl FieldType {
    /// Types rendered as quoted, escaped literals
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::Textarea | FieldType::Url | FieldType::Email | FieldType::Phone
        )
    }

    /// Types rendered verbatim
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Number | FieldType::Double | FieldType::Int | FieldType::Currency | FieldType::Percent
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::String => "string",
            FieldType::Textarea => "textarea",
            FieldType::Url => "url",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Boolean => "boolean",
            FieldType::Number => "number",
            FieldType::Double => "double",
            FieldType::Int => "int",
            FieldType::Currency => "currency",
            FieldType::Percent => "percent",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Picklist => "picklist",
            FieldType::Multipicklist => "multipicklist",
            FieldType::Reference => "reference",
            FieldType::Id => "id",
            FieldType::Other(s) => s,
        }
    }
}

impl From<&str> for FieldType {
    fn from(s: &str) -> Self {
        match s {
            "string" => FieldType::String,
            "textarea" => FieldType::Textarea,
            "url" => FieldType::Url,
            "email" => FieldType::Email,
            "phone" => FieldType::Phone,
            "boolean" => FieldType::Boolean,
            "number" => FieldType::Number,
            "double" => FieldType::Double,
            "int" => FieldType::Int,
            "currency" => FieldType::Currency,
            "percent" => FieldType::Percent,
            "date" => FieldType::Date,
            "datetime" => FieldType::Datetime,
            "picklist" => FieldType::Picklist,
            "multipicklist" => FieldType::Multipicklist,
            "reference" => FieldType::Reference,
            "id" => FieldType::Id,
            other => FieldType::Other(other.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        FieldType::from(s.as_str())
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_describe_field() {
        let json = r#"{
            "name": "OwnerId",
            "label": "Owner ID",
            "type": "reference",
            "indexed": true,
            "referenceTo": ["User"],
            "relationshipName": "Owner",
            "length": 18
        }"#;

        let field: FieldMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(field.field_type, FieldType::Reference);
        assert!(field.indexed);
        assert_eq!(field.reference_to, vec!["User"]);
        assert_eq!(field.relationship_name.as_deref(), Some("Owner"));
    }

    #[test]
    fn test_indexed_defaults_to_false() {
        let field: FieldMetadata =
            serde_json::from_str(r#"{"name": "Industry", "type": "picklist"}"#).unwrap();
        assert!(!field.indexed);
        assert_eq!(field.field_type, FieldType::Picklist);
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        let t = FieldType::from("encryptedstring");
        assert_eq!(t, FieldType::Other("encryptedstring".to_string()));
        assert_eq!(String::from(t), "encryptedstring");
    }
}
