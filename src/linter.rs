//! Schema linting - static analysis of CRF schema files.
//!
//! Validates schema files for:
//! - JSON syntax errors
//! - Dangling internal $ref anchors
//! - Invalid crf:* annotation values and types
//! - Unparseable `pattern` regexes

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::loader::load_schema;
use crate::types::{
    json_type_name, ANN_HIDDEN, ANN_LISTTYPE, ANN_REQUIRED, ANN_SUBSCHEMA_STYLE, ANN_TEXTAREA,
    ANN_VISIBLE_WHEN, VALID_LISTTYPES, VALID_SUBSCHEMA_STYLES,
};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/properties/site/crf:ui:listtype")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_schema_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        total_errors += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        total_warnings += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single schema file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();

    // Try to load the file (checks syntax)
    let schema = match load_schema(file) {
        Ok(s) => s,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E001".to_string(),
                file: file.to_path_buf(),
                path: "/".to_string(),
                message: format!("syntax error: {}", e),
            });
            return FileResult {
                file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
                status: FileStatus::Error,
                diagnostics,
            };
        }
    };

    check_refs(&schema, file, "", &schema, &mut diagnostics);
    check_node(&schema, file, "", &mut diagnostics);

    if schema.get("$id").is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            code: "W001".to_string(),
            file: file.to_path_buf(),
            path: "/".to_string(),
            message: "schema missing $id field".to_string(),
        });
    }

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

/// Recursively check $ref values. Only internal `#/...` anchors count as
/// schema structure; anything else cannot be resolved by the engine.
fn check_refs(
    value: &Value,
    file: &Path,
    path: &str,
    root: &Value,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_val)) = map.get("$ref") {
                check_single_ref(ref_val, file, path, root, diagnostics);
            }
            for (key, val) in map {
                let child_path = format!("{}/{}", path, key);
                check_refs(val, file, &child_path, root, diagnostics);
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                let child_path = format!("{}/{}", path, i);
                check_refs(item, file, &child_path, root, diagnostics);
            }
        }
        _ => {}
    }
}

fn check_single_ref(
    ref_val: &str,
    file: &Path,
    path: &str,
    root: &Value,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(pointer) = ref_val.strip_prefix('#') {
        if root.get("$defs").is_none() {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                code: "W002".to_string(),
                file: file.to_path_buf(),
                path: path.to_string(),
                message: format!("$ref {} used but document has no $defs", ref_val),
            });
        }
        if !pointer.is_empty() && root.pointer(pointer).is_none() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E002".to_string(),
                file: file.to_path_buf(),
                path: path.to_string(),
                message: format!("anchor not found: {}", ref_val),
            });
        }
    } else {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            code: "E002".to_string(),
            file: file.to_path_buf(),
            path: path.to_string(),
            message: format!("unresolvable $ref (only internal #/ anchors supported): {}", ref_val),
        });
    }
}

/// Recursively check crf:* annotations and regex patterns.
fn check_node(value: &Value, file: &Path, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    match value {
        Value::Object(map) => {
            check_annotations(map, file, path, diagnostics);

            if let Some(Value::String(pattern)) = map.get("pattern") {
                if Regex::new(pattern).is_err() {
                    diagnostics.push(Diagnostic {
                        severity: Severity::Error,
                        code: "E005".to_string(),
                        file: file.to_path_buf(),
                        path: format!("{}/pattern", path),
                        message: format!("invalid regex pattern: {}", pattern),
                    });
                }
            }

            for (key, val) in map {
                let child_path = format!("{}/{}", path, key);
                check_node(val, file, &child_path, diagnostics);
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                let child_path = format!("{}/{}", path, i);
                check_node(item, file, &child_path, diagnostics);
            }
        }
        _ => {}
    }
}

fn check_annotations(
    map: &serde_json::Map<String, Value>,
    file: &Path,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(listtype) = map.get(ANN_LISTTYPE) {
        check_keyword(
            listtype,
            ANN_LISTTYPE,
            VALID_LISTTYPES,
            file,
            path,
            diagnostics,
        );
    }
    if let Some(style) = map.get(ANN_SUBSCHEMA_STYLE) {
        check_keyword(
            style,
            ANN_SUBSCHEMA_STYLE,
            VALID_SUBSCHEMA_STYLES,
            file,
            path,
            diagnostics,
        );
    }

    if let Some(textarea) = map.get(ANN_TEXTAREA) {
        let ok = matches!(textarea, Value::Bool(_))
            || textarea.as_u64().map(|n| n >= 1).unwrap_or(false);
        if !ok {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E004".to_string(),
                file: file.to_path_buf(),
                path: format!("{}/{}", path, ANN_TEXTAREA),
                message: format!(
                    "invalid {} value: expected boolean or positive integer, got {}",
                    ANN_TEXTAREA,
                    json_type_name(textarea)
                ),
            });
        }
    }

    if let Some(markers) = map.get(ANN_REQUIRED) {
        let ok = markers
            .as_array()
            .map(|arr| arr.iter().all(Value::is_string))
            .unwrap_or(false);
        if !ok {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E004".to_string(),
                file: file.to_path_buf(),
                path: format!("{}/{}", path, ANN_REQUIRED),
                message: format!(
                    "invalid {} value: expected array of strings, got {}",
                    ANN_REQUIRED,
                    json_type_name(markers)
                ),
            });
        }
    }

    if let Some(hidden) = map.get(ANN_HIDDEN) {
        if !hidden.is_boolean() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E004".to_string(),
                file: file.to_path_buf(),
                path: format!("{}/{}", path, ANN_HIDDEN),
                message: format!(
                    "invalid {} value: expected boolean, got {}",
                    ANN_HIDDEN,
                    json_type_name(hidden)
                ),
            });
        }
    }

    if let Some(visible_when) = map.get(ANN_VISIBLE_WHEN) {
        if !visible_when.is_object() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E004".to_string(),
                file: file.to_path_buf(),
                path: format!("{}/{}", path, ANN_VISIBLE_WHEN),
                message: format!(
                    "invalid {} value: expected object, got {}",
                    ANN_VISIBLE_WHEN,
                    json_type_name(visible_when)
                ),
            });
        }
    }
}

fn check_keyword(
    value: &Value,
    key: &str,
    allowed: &[&str],
    file: &Path,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        Value::String(s) if allowed.contains(&s.as_str()) => {}
        Value::String(s) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            code: "E003".to_string(),
            file: file.to_path_buf(),
            path: format!("{}/{}", path, key),
            message: format!(
                "invalid {} value \"{}\": expected {}",
                key,
                s,
                allowed.join(", ")
            ),
        }),
        other => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            code: "E004".to_string(),
            file: file.to_path_buf(),
            path: format!("{}/{}", path, key),
            message: format!(
                "invalid {} value type: expected string, got {}",
                key,
                json_type_name(other)
            ),
        }),
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}
