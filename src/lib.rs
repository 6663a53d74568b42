//! SOQL Workbench - compose, check and run Salesforce SOQL queries
//!
//! The query core lives in [`query`]: [`query::build_query`] renders builder
//! state, [`query::analyze_query`] and [`query::validate_query`] inspect SOQL
//! text. The remaining modules are the collaborators around it: metadata,
//! storage, the REST client, export and the undo/redo session.

pub mod cli;
pub mod config;
pub mod export;
pub mod logging;
pub mod query;
pub mod rest;
pub mod schema;
pub mod session;
pub mod store;
