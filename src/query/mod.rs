//! Query module - builds SOQL from builder state and inspects SOQL text

mod builder;
mod condition;
pub mod optimizer;
pub mod validator;

pub use builder::{build_query, format_value, GroupOperator, OrderBy, QueryBuilderState, DEFAULT_GROUP};
pub use condition::{Condition, Operator};
pub use optimizer::{analyze_query, Severity, Suggestion};
pub use validator::{object_name, selected_fields, suggest_query, validate_query, QuerySuggestion};
