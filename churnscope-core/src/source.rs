//! Record sources
//!
//! A source turns a billing export into resolved [`CustomerFeatureRecord`]s.
//! Exports are JSON documents in one of three shapes:
//! 1. an array of customer objects
//! 2. an object with a `customers` array
//! 3. JSON Lines, one customer object per line
//!
//! Global invariants enforced:
//! - Records come back in export order
//! - Customer ids are unique within one fetch

use crate::error::{SourceError, SourceResult};
use crate::record::{CustomerFeatureRecord, RawCustomerRecord};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Default number of customers fetched when no limit is given
pub const DEFAULT_LIMIT: usize = 100;

/// Which records a fetch should return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Only this customer; an unknown id is an error
    pub customer_id: Option<String>,
    /// Maximum number of records, in export order
    pub limit: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            customer_id: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Anything that can produce customer feature records
pub trait RecordSource {
    /// Human-readable origin for logs and errors
    fn describe(&self) -> String;

    fn fetch(&self, options: &FetchOptions) -> SourceResult<Vec<CustomerFeatureRecord>>;
}

/// A billing export on disk, or stdin when the path is `-`
#[derive(Debug, Clone)]
pub struct JsonExportSource {
    path: Option<PathBuf>,
}

impl JsonExportSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.as_os_str() == "-" {
            return Self::stdin();
        }
        JsonExportSource { path: Some(path) }
    }

    pub fn stdin() -> Self {
        JsonExportSource { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> SourceResult<String> {
        let origin = self.describe();
        let result = match &self.path {
            Some(path) => std::fs::read_to_string(path),
            None => {
                let mut content = String::new();
                std::io::stdin()
                    .read_to_string(&mut content)
                    .map(|_| content)
            }
        };
        result.map_err(|source| SourceError::Io { origin, source })
    }
}

impl RecordSource for JsonExportSource {
    fn describe(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "stdin".to_string(),
        }
    }

    fn fetch(&self, options: &FetchOptions) -> SourceResult<Vec<CustomerFeatureRecord>> {
        let origin = self.describe();
        let content = self.read()?;
        let raw = parse_export(&origin, &content)?;
        log::debug!("read {} raw records from {}", raw.len(), origin);

        let records = resolve_all(&origin, raw)?;
        select(records, options)
    }
}

/// Records that were already materialized
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<CustomerFeatureRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<CustomerFeatureRecord>) -> Self {
        InMemorySource { records }
    }
}

impl RecordSource for InMemorySource {
    fn describe(&self) -> String {
        format!("memory ({} records)", self.records.len())
    }

    fn fetch(&self, options: &FetchOptions) -> SourceResult<Vec<CustomerFeatureRecord>> {
        check_unique(&self.records)?;
        select(self.records.clone(), options)
    }
}

#[derive(Deserialize)]
struct Envelope {
    customers: Vec<RawCustomerRecord>,
}

fn parse_error(origin: &str, line: usize, source: serde_json::Error) -> SourceError {
    SourceError::Parse {
        origin: origin.to_string(),
        line,
        source,
    }
}

/// Parse an export in any of the accepted shapes
///
/// An empty or whitespace-only export is a successful fetch of zero records.
pub fn parse_export(origin: &str, content: &str) -> SourceResult<Vec<RawCustomerRecord>> {
    match content.trim_start().chars().next() {
        None => Ok(Vec::new()),
        Some('[') => serde_json::from_str(content).map_err(|e| parse_error(origin, e.line(), e)),
        Some(_) => match serde_json::from_str::<serde_json::Value>(content) {
            Ok(value) => parse_document(origin, value),
            // Not a single document; read it as JSON Lines
            Err(_) => parse_lines(origin, content),
        },
    }
}

fn parse_document(origin: &str, value: serde_json::Value) -> SourceResult<Vec<RawCustomerRecord>> {
    let is_envelope = value
        .as_object()
        .is_some_and(|map| map.contains_key("customers"));

    if is_envelope {
        let envelope: Envelope =
            serde_json::from_value(value).map_err(|e| parse_error(origin, 1, e))?;
        return Ok(envelope.customers);
    }

    let record: RawCustomerRecord =
        serde_json::from_value(value).map_err(|e| parse_error(origin, 1, e))?;
    Ok(vec![record])
}

fn parse_lines(origin: &str, content: &str) -> SourceResult<Vec<RawCustomerRecord>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| parse_error(origin, index + 1, e))
        })
        .collect()
}

/// Resolve raw rows, rejecting rows without an id and duplicate ids
fn resolve_all(origin: &str, raw: Vec<RawCustomerRecord>) -> SourceResult<Vec<CustomerFeatureRecord>> {
    let records = raw
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            row.resolve().ok_or_else(|| SourceError::MissingCustomerId {
                origin: origin.to_string(),
                index,
            })
        })
        .collect::<SourceResult<Vec<_>>>()?;

    check_unique(&records)?;
    Ok(records)
}

fn check_unique(records: &[CustomerFeatureRecord]) -> SourceResult<()> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.customer_id.as_str()) {
            return Err(SourceError::DuplicateCustomerId {
                id: record.customer_id.clone(),
            });
        }
    }
    Ok(())
}

/// Apply customer selection and limit, preserving export order
pub fn select(
    records: Vec<CustomerFeatureRecord>,
    options: &FetchOptions,
) -> SourceResult<Vec<CustomerFeatureRecord>> {
    if let Some(id) = &options.customer_id {
        return records
            .into_iter()
            .find(|record| &record.customer_id == id)
            .map(|record| vec![record])
            .ok_or_else(|| SourceError::CustomerNotFound { id: id.clone() });
    }

    Ok(records.into_iter().take(options.limit).collect())
}
