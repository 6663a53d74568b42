//! Salesforce REST API client

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::error::{error_message, ApiError};
use crate::schema::{FieldMetadata, ObjectMetadata};

pub type Record = Map<String, Value>;

/// First page of a SOQL query result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub total_size: u64,

    #[serde(default = "default_done")]
    pub done: bool,

    #[serde(default)]
    pub records: Vec<Record>,
}

fn default_done() -> bool {
    true
}

/// Calls against the Object, Query and Describe endpoints
pub trait SalesforceApi: Sync {
    fn list_objects(&self) -> Result<Vec<ObjectMetadata>, ApiError>;
    fn describe(&self, object: &str) -> Result<Vec<FieldMetadata>, ApiError>;
    fn query(&self, soql: &str) -> Result<QueryResult, ApiError>;
    fn update_record(&self, object: &str, id: &str, fields: &Record) -> Result<(), ApiError>;
    fn delete_record(&self, object: &str, id: &str) -> Result<(), ApiError>;
}

#[derive(Deserialize)]
struct SObjectList {
    sobjects: Vec<ObjectMetadata>,
}

#[derive(Deserialize)]
struct DescribeResult {
    fields: Vec<FieldMetadata>,
}

pub struct SalesforceClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl SalesforceClient {
    pub fn new(
        instance_url: &str,
        access_token: &str,
        api_version: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        if instance_url.is_empty() {
            return Err(ApiError::NotConfigured("instance_url is not set".to_string()));
        }
        if access_token.is_empty() {
            return Err(ApiError::NotConfigured("access_token is not set".to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/services/data/v{}",
                instance_url.trim_end_matches('/'),
                api_version.trim_start_matches('v')
            ),
            access_token: access_token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("soql-workbench/", env!("CARGO_PKG_VERSION")))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorized(request).send()?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

impl SalesforceApi for SalesforceClient {
    fn list_objects(&self) -> Result<Vec<ObjectMetadata>, ApiError> {
        debug!("Listing sObjects");
        let list: SObjectList = self.send(self.client.get(self.url("/sobjects/")))?.json()?;
        Ok(list.sobjects)
    }

    fn describe(&self, object: &str) -> Result<Vec<FieldMetadata>, ApiError> {
        debug!(object, "Describing sObject");
        let path = format!("/sobjects/{}/describe", object);
        let describe: DescribeResult = self.send(self.client.get(self.url(&path)))?.json()?;
        Ok(describe.fields)
    }

    fn query(&self, soql: &str) -> Result<QueryResult, ApiError> {
        info!(soql, "Executing query");
        let request = self.client.get(self.url("/query/")).query(&[("q", soql)]);
        let result: QueryResult = self.send(request)?.json()?;
        debug!(total = result.total_size, done = result.done, "Query finished");
        Ok(result)
    }

    fn update_record(&self, object: &str, id: &str, fields: &Record) -> Result<(), ApiError> {
        debug!(object, id, "Updating record");
        let path = format!("/sobjects/{}/{}", object, id);
        self.send(self.client.patch(self.url(&path)).json(fields))?;
        Ok(())
    }

    fn delete_record(&self, object: &str, id: &str) -> Result<(), ApiError> {
        debug!(object, id, "Deleting record");
        let path = format!("/sobjects/{}/{}", object, id);
        self.send(self.client.delete(self.url(&path)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_credentials() {
        let err = SalesforceClient::new("", "token", "59.0", Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::NotConfigured(_)));

        let err = SalesforceClient::new("https://x.my.salesforce.com", "", "59.0", Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::NotConfigured(_)));
    }

    #[test]
    fn test_base_url() {
        let client = SalesforceClient::new(
            "https://acme.my.salesforce.com/",
            "token",
            "v59.0",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.url("/sobjects/"),
            "https://acme.my.salesforce.com/services/data/v59.0/sobjects/"
        );
    }

    #[test]
    fn test_query_result_shape() {
        let json = r#"{
            "totalSize": 1,
            "done": true,
            "records": [
                {"attributes": {"type": "Account"}, "Id": "001xx", "Name": "Acme"}
            ]
        }"#;
        let result: QueryResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.total_size, 1);
        assert_eq!(result.records[0]["Name"], "Acme");
    }
}
