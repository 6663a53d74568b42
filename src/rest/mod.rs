//! REST module - Salesforce Object, Query and Describe endpoints

mod batch;
mod client;
mod error;

pub use batch::{batch_delete, batch_update};
pub use client::{QueryResult, Record, SalesforceApi, SalesforceClient};
pub use error::ApiError;
