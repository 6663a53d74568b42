//! Batch update/delete across selected records

use std::thread;
use tracing::{info, warn};

use super::client::{Record, SalesforceApi};
use super::error::ApiError;

/// Apply the same field values to every record id
///
/// Requests run concurrently. Completed requests are not rolled back when
/// another one fails; the first failure in id order is returned.
pub fn batch_update(
    api: &dyn SalesforceApi,
    object: &str,
    ids: &[String],
    fields: &Record,
) -> Result<usize, ApiError> {
    info!(object, count = ids.len(), "Batch update");
    run_all(ids, |id| api.update_record(object, id, fields))
}

/// Delete every record id
pub fn batch_delete(api: &dyn SalesforceApi, object: &str, ids: &[String]) -> Result<usize, ApiError> {
    info!(object, count = ids.len(), "Batch delete");
    run_all(ids, |id| api.delete_record(object, id))
}

/// Upper bound on requests in flight at once
pub const MAX_CONCURRENT_REQUESTS: usize = 8;

fn run_all<F>(ids: &[String], op: F) -> Result<usize, ApiError>
where
    F: Fn(&str) -> Result<(), ApiError> + Sync,
{
    let mut results: Vec<Result<(), ApiError>> = Vec::with_capacity(ids.len());

    // Every chunk runs even after a failure; no request is retried or undone
    for chunk in ids.chunks(MAX_CONCURRENT_REQUESTS) {
        thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|id| {
                    let op = &op;
                    scope.spawn(move || op(id))
                })
                .collect();

            results.extend(handles.into_iter().map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(ApiError::Network("request thread panicked".to_string())))
            }));
        });
    }

    for (id, result) in ids.iter().zip(&results) {
        if let Err(e) = result {
            warn!(id = id.as_str(), error = %e, "Batch request failed");
        }
    }

    let count = results.len();
    results.into_iter().collect::<Result<Vec<_>, _>>()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::QueryResult;
    use crate::schema::{FieldMetadata, ObjectMetadata};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeApi {
        fail_on: Vec<String>,
        updated: Mutex<Vec<String>>,
        deleted: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SalesforceApi for FakeApi {
        fn list_objects(&self) -> Result<Vec<ObjectMetadata>, ApiError> {
            Ok(vec![])
        }

        fn describe(&self, _object: &str) -> Result<Vec<FieldMetadata>, ApiError> {
            Ok(vec![])
        }

        fn query(&self, _soql: &str) -> Result<QueryResult, ApiError> {
            Ok(QueryResult::default())
        }

        fn update_record(&self, _object: &str, id: &str, _fields: &Record) -> Result<(), ApiError> {
            if self.fail_on.iter().any(|f| f == id) {
                return Err(ApiError::Status {
                    status: 400,
                    message: format!("cannot update {}", id),
                });
            }
            self.updated.lock().unwrap().push(id.to_string());
            Ok(())
        }

        fn delete_record(&self, _object: &str, id: &str) -> Result<(), ApiError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(2));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on.iter().any(|f| f == id) {
                return Err(ApiError::Status {
                    status: 404,
                    message: format!("{} not found", id),
                });
            }
            self.deleted.lock().unwrap().push(id.to_string());
            Ok(())
        }
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("001{:03}", i)).collect()
    }

    #[test]
    fn test_batch_delete_all() {
        let api = FakeApi::default();
        let count = batch_delete(&api, "Account", &ids(5)).unwrap();

        assert_eq!(count, 5);
        let mut deleted = api.deleted.lock().unwrap().clone();
        deleted.sort();
        assert_eq!(deleted, ids(5));
    }

    #[test]
    fn test_batch_update_reports_failure_without_rollback() {
        let api = FakeApi {
            fail_on: vec!["001002".to_string()],
            ..Default::default()
        };
        let mut fields = Record::new();
        fields.insert("Rating".to_string(), "Hot".into());

        let err = batch_update(&api, "Account", &ids(4), &fields).unwrap_err();
        assert!(err.to_string().contains("cannot update 001002"));
        assert_eq!(api.updated.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_large_batch_is_capped_and_reports_first_failure() {
        let api = FakeApi {
            fail_on: vec!["001030".to_string(), "001005".to_string()],
            ..Default::default()
        };
        let all = ids(MAX_CONCURRENT_REQUESTS * 5 + 3);

        let err = batch_delete(&api, "Account", &all).unwrap_err();

        assert!(err.to_string().contains("001005 not found"));
        assert_eq!(api.deleted.lock().unwrap().len(), all.len() - 2);
        assert!(api.peak.load(Ordering::SeqCst) <= MAX_CONCURRENT_REQUESTS);
    }

    #[test]
    fn test_empty_batch() {
        let api = FakeApi::default();
        assert_eq!(batch_delete(&api, "Account", &[]).unwrap(), 0);
    }
}
