//! CLI command implementations

use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::export::{export, infer_fields, ExportFormat};
use crate::query::{
    analyze_query, object_name, selected_fields, suggest_query, validate_query, Condition,
    GroupOperator, Severity,
};
use crate::rest::{batch_delete, batch_update, Record, SalesforceApi, SalesforceClient};
use crate::schema::{load_metadata, save_metadata, MetadataCache};
use crate::session::Session;
use crate::store::{Database, QueryHistory, SavedQueries};

lazy_static! {
    // Plain decimal literals only; "007", "1e3" and "nan" stay strings
    static ref NUMBER_RE: Regex = Regex::new(r"^-?(?:0|[1-9]\d*)(\.\d+)?$").unwrap();
}

/// Options for `sfq build`
#[derive(Debug, Default)]
pub struct BuildArgs {
    pub state: Option<PathBuf>,
    pub object: Option<String>,
    pub fields: Vec<String>,
    pub conditions: Vec<String>,
    pub or: bool,
    pub order_by: Vec<String>,
    pub limit: Option<u32>,
    pub check: bool,
}

/// Options for `sfq run`
#[derive(Debug, Default)]
pub struct RunArgs {
    pub query: Option<String>,
    pub saved: Option<String>,
    pub force: bool,
    pub export: Option<ExportFormat>,
    pub output: Option<PathBuf>,
}

fn connect(config: &Config) -> Result<SalesforceClient> {
    let client = SalesforceClient::new(
        config.instance_url.as_deref().unwrap_or_default(),
        config.access_token.as_deref().unwrap_or_default(),
        &config.api_version,
        config.timeout(),
    )
    .context("Cannot connect to Salesforce (set instance_url and access_token, or SF_INSTANCE_URL and SF_ACCESS_TOKEN)")?;
    Ok(client)
}

/// Make sure the cache knows the object list and, if given and known, the object's fields
fn ensure_metadata(api: &dyn SalesforceApi, cache: &mut MetadataCache, object: Option<&str>) -> Result<bool> {
    let mut changed = false;

    if cache.objects.is_empty() {
        cache.objects = api.list_objects()?;
        changed = true;
    }

    // Unknown objects are left for the validator to report
    if let Some(object) = object {
        let known = cache.objects.iter().any(|o| o.name == object);
        if known && !cache.fields.contains_key(object) {
            cache.set_fields(object, api.describe(object)?);
            changed = true;
        }
    }

    Ok(changed)
}

/// Write a default config file
pub fn init(config_path: Option<&Path>) -> Result<()> {
    let path = Config::create_default(config_path)?;
    println!("✓ Config: {}", path.display());
    println!("\nSet instance_url and access_token, then run `sfq objects --refresh`.");
    Ok(())
}

/// List sObjects, from the cache unless a refresh is requested
pub fn objects(config: &Config, prefix: Option<&str>, refresh: bool) -> Result<()> {
    let data_dir = config.data_dir();
    let mut cache = load_metadata(&data_dir)?;

    if refresh || cache.objects.is_empty() {
        let api = connect(config)?;
        cache.objects = api.list_objects()?;
        save_metadata(&data_dir, &cache)?;
        info!(count = cache.objects.len(), "Refreshed object list");
    }

    let prefix = prefix.map(str::to_lowercase).unwrap_or_default();
    for object in cache
        .objects
        .iter()
        .filter(|o| o.name.to_lowercase().starts_with(&prefix))
    {
        println!("{:<40} {}", object.name, object.label);
    }

    Ok(())
}

/// Describe an object and refresh its cached fields
pub fn describe(config: &Config, object: &str) -> Result<()> {
    let data_dir = config.data_dir();
    let mut cache = load_metadata(&data_dir)?;
    let api = connect(config)?;

    let fields = api.describe(object)?;
    cache.set_fields(object, fields);
    save_metadata(&data_dir, &cache)?;

    println!("{} fields\n", object);
    for field in cache.fields_for(object) {
        let indexed = if field.indexed { "indexed" } else { "" };
        let target = if field.reference_to.is_empty() {
            String::new()
        } else {
            format!("-> {}", field.reference_to.join(", "))
        };
        println!(
            "  {:<32} {:<14} {:<8} {} {}",
            field.name, field.field_type, indexed, field.label, target
        );
    }

    Ok(())
}

/// Compose a query from a state file and/or flags
pub fn build(config: &Config, args: BuildArgs) -> Result<()> {
    let cache = load_metadata(&config.data_dir())?;

    let mut session = match &args.state {
        Some(path) => Session::load(path)?,
        None => Session::default(),
    };

    if let Some(object) = &args.object {
        session.apply(|s| s.set_object(object));
    }

    let object = session.state().selected_object.clone();
    let fields = object.as_deref().map(|o| cache.fields_for(o)).unwrap_or(&[]);

    for field in &args.fields {
        session.apply(|s| s.select_field(field));
    }

    for expr in &args.conditions {
        let (group, expr) = split_group(expr);
        let mut condition = Condition::parse(expr, fields)?;
        if let Some(group) = group {
            condition = condition.in_group(group);
        }
        session.apply(|s| s.add_condition(condition));
    }

    if args.or {
        session.apply(|s| s.set_group_operator(GroupOperator::Or));
    }

    for key in &args.order_by {
        let mut parts = key.split_whitespace();
        let field = parts.next().unwrap_or_default();
        let direction = parts.next().unwrap_or("ASC");
        session.apply(|s| s.add_order_by(field, direction));
    }

    if args.limit.is_some() {
        session.apply(|s| s.set_limit(args.limit));
    }

    if !session.state().is_runnable() {
        warn!("No object selected; the query has no FROM clause");
    }

    let query = session.query();
    println!("{}", query);

    if args.check {
        for condition in &session.state().conditions {
            for err in condition.check(fields) {
                println!("ERROR: {}", err);
            }
        }
        report(&query, &cache, object.as_deref());
    }

    Ok(())
}

/// `[group] Field = value` -> (Some("group"), "Field = value")
fn split_group(expr: &str) -> (Option<&str>, &str) {
    let trimmed = expr.trim_start();
    if let Some(rest) = trimmed.strip_prefix('[') {
        if let Some((group, tail)) = rest.split_once(']') {
            return (Some(group.trim()), tail.trim());
        }
    }
    (None, expr)
}

fn print_suggestions(query: &str, cache: &MetadataCache, object: Option<&str>) -> usize {
    let fields = object.map(|o| cache.fields_for(o)).unwrap_or(&[]);
    let suggestions = analyze_query(query, &cache.objects, fields);

    for s in &suggestions {
        let level = match s.severity {
            Severity::Warning => "WARN:",
            Severity::Info => "INFO:",
        };
        println!("{} {}\n      fix: {}", level, s.message, s.fix);
    }

    suggestions.len()
}

fn print_errors(query: &str, cache: &MetadataCache, object: Option<&str>) -> usize {
    let fields = object.map(|o| cache.fields_for(o)).unwrap_or(&[]);
    let errors = validate_query(query, &cache.objects, fields);

    for err in &errors {
        println!("ERROR: {}", err);
    }

    errors.len()
}

fn report(query: &str, cache: &MetadataCache, object: Option<&str>) {
    let errors = print_errors(query, cache, object);
    let hints = print_suggestions(query, cache, object);

    if errors == 0 && hints == 0 {
        println!("✓ No issues found.");
    }
}

/// Print optimizer hints for a query
pub fn analyze(config: &Config, query: &str) -> Result<()> {
    let cache = load_metadata(&config.data_dir())?;
    if print_suggestions(query, &cache, object_name(query)) == 0 {
        println!("✓ No suggestions.");
    }
    Ok(())
}

/// Validate a query against the cached metadata; exits non-zero on errors
pub fn validate(config: &Config, query: &str) -> Result<()> {
    let cache = load_metadata(&config.data_dir())?;
    if cache.objects.is_empty() {
        warn!("Metadata cache is empty; run `sfq objects --refresh` first");
    }

    let errors = print_errors(query, &cache, object_name(query));
    if errors > 0 {
        std::process::exit(1);
    }

    println!("✓ Query is valid.");
    Ok(())
}

/// Autocomplete a partial query
pub fn suggest(config: &Config, partial: &str) -> Result<()> {
    let cache = load_metadata(&config.data_dir())?;
    let fields = object_name(partial)
        .map(|o| cache.fields_for(o))
        .unwrap_or(&[]);

    for s in suggest_query(partial, &cache.objects, fields) {
        println!("{:<40} {}", s.text, s.description);
    }

    Ok(())
}

/// Execute a query, record it in history and print or export the records
pub fn run(config: &Config, args: RunArgs) -> Result<()> {
    let data_dir = config.data_dir();
    let mut db = Database::open(&data_dir)?;

    let query = match (&args.query, &args.saved) {
        (Some(q), _) => q.clone(),
        (None, Some(name)) => SavedQueries::new(&mut db)
            .get(name)?
            .map(|q| q.query)
            .with_context(|| format!("No saved query named '{}'", name))?,
        (None, None) => bail!("Give a query or --saved <name>"),
    };

    let object = object_name(&query).map(str::to_string);
    let api = connect(config)?;

    if !args.force {
        let mut cache = load_metadata(&data_dir)?;
        if ensure_metadata(&api, &mut cache, object.as_deref())? {
            save_metadata(&data_dir, &cache)?;
        }

        let fields = object.as_deref().map(|o| cache.fields_for(o)).unwrap_or(&[]);
        let errors = validate_query(&query, &cache.objects, fields);
        if !errors.is_empty() {
            for err in &errors {
                println!("ERROR: {}", err);
            }
            bail!("Query has {} error(s); use --force to run it anyway", errors.len());
        }
    }

    let result = api.query(&query)?;

    QueryHistory::new(&mut db, config.history_limit).add(
        &query,
        object.as_deref(),
        Some(result.total_size),
    )?;

    let mut fields = selected_fields(&query);
    if fields.is_empty() || fields.iter().any(|f| f == "*") {
        fields = infer_fields(&result.records);
    }

    let format = args
        .export
        .or_else(|| args.output.as_deref().and_then(ExportFormat::from_path))
        .unwrap_or(ExportFormat::Excel);
    let rendered = export(format, &fields, &result.records)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✓ Wrote {} records to {}", result.records.len(), path.display());
        }
        None => {
            println!("{}", rendered);
            println!();
            println!("{} of {} record(s)", result.records.len(), result.total_size);
        }
    }

    if !result.done {
        println!("(more records available; add a LIMIT or narrow the WHERE clause)");
    }

    Ok(())
}

/// List saved queries
pub fn saved_list(config: &Config) -> Result<()> {
    let mut db = Database::open(&config.data_dir())?;
    let all = SavedQueries::new(&mut db).list()?;

    if all.is_empty() {
        println!("No saved queries.");
        return Ok(());
    }

    for q in all {
        println!("{}  {}  {}", q.id, q.created_at.format("%Y-%m-%d %H:%M"), q.name);
        println!("    {}", q.query);
    }

    Ok(())
}

pub fn saved_save(config: &Config, name: &str, query: &str) -> Result<()> {
    let mut db = Database::open(&config.data_dir())?;
    let entry = SavedQueries::new(&mut db).save(name, query, object_name(query))?;
    println!("✓ Saved '{}' ({})", entry.name, entry.id);
    Ok(())
}

pub fn saved_show(config: &Config, id_or_name: &str) -> Result<()> {
    let mut db = Database::open(&config.data_dir())?;
    match SavedQueries::new(&mut db).get(id_or_name)? {
        Some(q) => println!("{}", q.query),
        None => bail!("No saved query '{}'", id_or_name),
    }
    Ok(())
}

pub fn saved_delete(config: &Config, id_or_name: &str) -> Result<()> {
    let mut db = Database::open(&config.data_dir())?;
    let mut saved = SavedQueries::new(&mut db);

    let entry = saved
        .get(id_or_name)?
        .with_context(|| format!("No saved query '{}'", id_or_name))?;
    saved.delete(&entry.id)?;

    println!("✓ Deleted '{}'", entry.name);
    Ok(())
}

/// Show recent queries, newest first
pub fn history_list(config: &Config, limit: Option<usize>) -> Result<()> {
    let mut db = Database::open(&config.data_dir())?;
    let entries = QueryHistory::new(&mut db, config.history_limit).list()?;

    if entries.is_empty() {
        println!("No history.");
        return Ok(());
    }

    for entry in entries.iter().take(limit.unwrap_or(usize::MAX)) {
        let count = entry
            .record_count
            .map(|c| format!("{} rows", c))
            .unwrap_or_default();
        println!(
            "{}  {:>10}  {}",
            entry.executed_at.format("%Y-%m-%d %H:%M"),
            count,
            entry.query
        );
    }

    Ok(())
}

pub fn history_clear(config: &Config) -> Result<()> {
    let mut db = Database::open(&config.data_dir())?;
    QueryHistory::new(&mut db, config.history_limit).clear()?;
    println!("✓ History cleared");
    Ok(())
}

/// Parse `Field=value` assignments into a PATCH body
fn parse_assignments(assignments: &[String]) -> Result<Record> {
    let mut body = Record::new();

    for assignment in assignments {
        let (field, value) = assignment
            .split_once('=')
            .with_context(|| format!("Expected Field=value, got '{}'", assignment))?;

        let value = match value.trim() {
            "" | "null" => Value::Null,
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            other => literal_value(other),
        };

        body.insert(field.trim().to_string(), value);
    }

    if body.is_empty() {
        bail!("Nothing to update; pass at least one --set Field=value");
    }

    Ok(body)
}

/// Numbers for plain numeric literals, strings for everything else
fn literal_value(text: &str) -> Value {
    let number = NUMBER_RE.captures(text).and_then(|cap| {
        if cap.get(1).is_some() {
            text.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
        } else {
            text.parse::<i64>().ok().map(serde_json::Number::from)
        }
    });

    match number {
        Some(n) => Value::Number(n),
        None => Value::String(text.to_string()),
    }
}

/// Update the same fields on every selected record
pub fn update(config: &Config, object: &str, ids: &[String], assignments: &[String]) -> Result<()> {
    let body = parse_assignments(assignments)?;
    let api = connect(config)?;

    let count = batch_update(&api, object, ids, &body)?;
    println!("✓ Updated {} {} record(s)", count, object);
    Ok(())
}

/// Delete every selected record
pub fn delete(config: &Config, object: &str, ids: &[String]) -> Result<()> {
    let api = connect(config)?;

    let count = batch_delete(&api, object, ids)?;
    println!("✓ Deleted {} {} record(s)", count, object);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::{ApiError, QueryResult};
    use crate::schema::{FieldMetadata, FieldType, ObjectMetadata};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        described: Mutex<Vec<String>>,
    }

    impl SalesforceApi for FakeApi {
        fn list_objects(&self) -> Result<Vec<ObjectMetadata>, ApiError> {
            Ok(vec![ObjectMetadata::new("Account", "Account")])
        }

        fn describe(&self, object: &str) -> Result<Vec<FieldMetadata>, ApiError> {
            self.described.lock().unwrap().push(object.to_string());
            if object != "Account" {
                return Err(ApiError::Status {
                    status: 404,
                    message: "NOT_FOUND: The requested resource does not exist".to_string(),
                });
            }
            Ok(vec![FieldMetadata::new("Name", "Account Name", FieldType::String, true)])
        }

        fn query(&self, _soql: &str) -> Result<QueryResult, ApiError> {
            Ok(QueryResult::default())
        }

        fn update_record(&self, _object: &str, _id: &str, _fields: &Record) -> Result<(), ApiError> {
            Ok(())
        }

        fn delete_record(&self, _object: &str, _id: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[test]
    fn test_ensure_metadata_describes_known_object() {
        let api = FakeApi::default();
        let mut cache = MetadataCache::default();

        assert!(ensure_metadata(&api, &mut cache, Some("Account")).unwrap());
        assert_eq!(cache.fields_for("Account").len(), 1);

        // Already cached: nothing fetched again
        assert!(!ensure_metadata(&api, &mut cache, Some("Account")).unwrap());
        assert_eq!(api.described.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_object_reaches_validator() {
        let api = FakeApi::default();
        let mut cache = MetadataCache::default();

        assert!(ensure_metadata(&api, &mut cache, Some("Unknwn")).unwrap());
        assert!(api.described.lock().unwrap().is_empty());

        let errors = validate_query("SELECT Id FROM Unknwn", &cache.objects, cache.fields_for("Unknwn"));
        assert_eq!(errors, vec!["Object not found: Unknwn".to_string()]);
    }

    #[test]
    fn test_split_group() {
        assert_eq!(split_group("[g1] Name = x"), (Some("g1"), "Name = x"));
        assert_eq!(split_group("Name = x"), (None, "Name = x"));
        assert_eq!(split_group("[broken Name = x"), (None, "[broken Name = x"));
    }

    #[test]
    fn test_parse_assignments() {
        let body = parse_assignments(&[
            "Rating=Hot".to_string(),
            "NumberOfEmployees=50".to_string(),
            "AnnualRevenue=1.5".to_string(),
            "IsActive__c=true".to_string(),
            "Description=".to_string(),
        ])
        .unwrap();

        assert_eq!(body["Rating"], "Hot");
        assert_eq!(body["NumberOfEmployees"], 50);
        assert_eq!(body["AnnualRevenue"], 1.5);
        assert_eq!(body["IsActive__c"], true);
        assert!(body["Description"].is_null());

        assert!(parse_assignments(&["NoEquals".to_string()]).is_err());
        assert!(parse_assignments(&[]).is_err());
    }

    #[test]
    fn test_assignments_keep_non_numeric_text() {
        let body = parse_assignments(&[
            "Name=nan".to_string(),
            "Code__c=inf".to_string(),
            "AccountNumber=007".to_string(),
            "Sku__c=1e3".to_string(),
            "Big__c=99999999999999999999".to_string(),
            "Delta__c=-4".to_string(),
            "Ratio__c=0.25".to_string(),
        ])
        .unwrap();

        assert_eq!(body["Name"], "nan");
        assert_eq!(body["Code__c"], "inf");
        assert_eq!(body["AccountNumber"], "007");
        assert_eq!(body["Sku__c"], "1e3");
        assert_eq!(body["Big__c"], "99999999999999999999");
        assert_eq!(body["Delta__c"], -4);
        assert_eq!(body["Ratio__c"], 0.25);
    }
}
