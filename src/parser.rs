use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::errors::{AppError, AppResult};

const UNNAMED_TEST: &str = "Unnamed test";
const MISSING_ERROR: &str = "No error message recorded";

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid ANSI escape pattern"));

/// One failed test extracted from a log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub test_name: String,
    pub error_message: String,
    pub source_file: String,
}

/// Raw contents of a failure log and its path relative to the workdir
#[derive(Debug, Clone)]
pub struct LogDocument {
    pub path: String,
    pub contents: Vec<u8>,
}

/// What to do with a log file that is not a valid failure report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedLogPolicy {
    #[default]
    Fatal,
    Skip,
}

/// Entry shape written by cypress-failed-log
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FailedTestEntry {
    spec_name: Option<String>,
    title: Option<String>,
    test_name: Option<String>,
    test_error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FailureReport {
    Many(Vec<FailedTestEntry>),
    Single(FailedTestEntry),
}

impl FailureReport {
    fn into_entries(self) -> Vec<FailedTestEntry> {
        match self {
            FailureReport::Many(entries) => entries,
            FailureReport::Single(entry) => vec![entry],
        }
    }
}

/// Parse every document and aggregate the failures in input order
pub fn parse_fail_logs(
    documents: &[LogDocument],
    policy: MalformedLogPolicy,
) -> AppResult<Vec<FailureRecord>> {
    let mut failures = Vec::new();

    for document in documents {
        match parse_document(document) {
            Ok(records) => {
                log::debug!(
                    "Parsed {} failure(s) from {}",
                    records.len(),
                    document.path
                );
                failures.extend(records);
            }
            Err(e) if policy == MalformedLogPolicy::Skip => {
                log::warn!("Skipping malformed failure log {}: {}", document.path, e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(failures)
}

fn parse_document(document: &LogDocument) -> AppResult<Vec<FailureRecord>> {
    let report: FailureReport = serde_json::from_slice(&document.contents)
        .map_err(|e| AppError::malformed_log(&document.path, e))?;

    Ok(report
        .into_entries()
        .into_iter()
        .map(|entry| to_record(entry, &document.path))
        .collect())
}

fn to_record(entry: FailedTestEntry, log_path: &str) -> FailureRecord {
    let test_name = present(entry.test_name)
        .or_else(|| present(entry.title))
        .unwrap_or_else(|| UNNAMED_TEST.to_string());

    let error_message = present(entry.test_error.map(|e| strip_ansi(&e)))
        .unwrap_or_else(|| MISSING_ERROR.to_string());

    let source_file = present(entry.spec_name).unwrap_or_else(|| log_path.to_string());

    FailureRecord {
        test_name,
        error_message,
        source_file,
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}
