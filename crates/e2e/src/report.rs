//! Report attachments: screenshots, verify tables, session summary

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::compare::{filter_to_expected, DictComparisonResult};
use crate::context::SessionSummary;
use crate::error::E2eResult;
use crate::op::{render, CompareOp};

/// Sink for report attachments
pub trait Reporter {
    fn attach_text(&self, test_id: &str, name: &str, body: &str) -> E2eResult<()>;
    fn attach_png(&self, test_id: &str, name: &str, png: &[u8]) -> E2eResult<()>;
}

/// Writes attachments under `<output_dir>/attachments/<test_id>/`
pub struct ArtifactReporter {
    output_dir: PathBuf,
}

impl ArtifactReporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> E2eResult<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(output_dir.join("attachments"))?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn test_dir(&self, test_id: &str) -> E2eResult<PathBuf> {
        let dir = self.output_dir.join("attachments").join(sanitize(test_id));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Write the session summary as JSON
    pub fn write_summary(&self, summary: &SessionSummary) -> E2eResult<PathBuf> {
        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Reporter for ArtifactReporter {
    fn attach_text(&self, test_id: &str, name: &str, body: &str) -> E2eResult<()> {
        let path = self.test_dir(test_id)?.join(format!("{}.txt", sanitize(name)));
        std::fs::write(&path, body)?;
        debug!("Attached {}", path.display());
        Ok(())
    }

    fn attach_png(&self, test_id: &str, name: &str, png: &[u8]) -> E2eResult<()> {
        // identical screens from repeated failures share one file
        let hash = hex::encode(Sha256::digest(png));
        let path = self
            .test_dir(test_id)?
            .join(format!("{}-{}.png", sanitize(name), &hash[..12]));
        if !path.exists() {
            std::fs::write(&path, png)?;
        }
        debug!("Attached {}", path.display());
        Ok(())
    }
}

/// In-memory attachments, for tests of the framework itself
#[derive(Debug, Default)]
pub struct MemoryReporter {
    texts: Mutex<Vec<(String, String, String)>>,
    images: Mutex<Vec<(String, String, usize)>>,
}

impl MemoryReporter {
    /// `(test_id, name, body)` of every text attachment
    pub fn texts(&self) -> Vec<(String, String, String)> {
        self.texts.lock().clone()
    }

    /// `(test_id, name, byte length)` of every image attachment
    pub fn images(&self) -> Vec<(String, String, usize)> {
        self.images.lock().clone()
    }
}

impl Reporter for MemoryReporter {
    fn attach_text(&self, test_id: &str, name: &str, body: &str) -> E2eResult<()> {
        self.texts
            .lock()
            .push((test_id.to_string(), name.to_string(), body.to_string()));
        Ok(())
    }

    fn attach_png(&self, test_id: &str, name: &str, png: &[u8]) -> E2eResult<()> {
        self.images
            .lock()
            .push((test_id.to_string(), name.to_string(), png.len()));
        Ok(())
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Render the per-field verify table for a dictionary comparison.
///
/// Rows follow expected's key order, then keys only actual has. Under
/// [`CompareOp::Contains`] actual is narrowed to expected's keys first.
pub fn verify_table(
    actual: &Map<String, Value>,
    expected: &Map<String, Value>,
    op: CompareOp,
    result: &DictComparisonResult,
    tolerance_percent: Option<f64>,
) -> String {
    let narrowed;
    let actual = if op == CompareOp::Contains {
        narrowed = filter_to_expected(actual, expected);
        &narrowed
    } else {
        actual
    };

    let with_tolerance = result.tolerance_info.is_some();
    let mut header = vec!["Field", "Actual", "Expected", "Result"];
    if with_tolerance {
        header.extend(["Diff %", "Tolerance"]);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);

    let cell = |map: &Map<String, Value>, key: &str| map.get(key).map(render).unwrap_or_default();

    let keys = expected
        .keys()
        .chain(actual.keys().filter(|k| !expected.contains_key(*k)));

    for key in keys {
        let outcome = if result.missing_keys.contains(key) {
            "MISSING"
        } else if result.redundant_keys.contains(key) {
            "REDUNDANT"
        } else if result.diff_keys.contains(key) {
            "FAILED"
        } else {
            "PASSED"
        };

        let mut row = vec![key.clone(), cell(actual, key), cell(expected, key), outcome.to_string()];
        if let Some(info) = &result.tolerance_info {
            match info.get(key) {
                Some(t) => row.extend([t.percent_diff.clone(), t.tolerance_description.clone()]),
                None => row.extend([String::new(), String::new()]),
            }
        }
        table.add_row(row);
    }

    match tolerance_percent {
        Some(p) => format!("Tolerance: {p}%\n{table}"),
        None => table.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare_dict;
    use crate::context::Session;
    use crate::tolerance::ToleranceSpec;
    use serde_json::json;
    use std::sync::Arc;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_verify_table_rows() {
        let actual = obj(json!({"price": 101.0, "side": "BUY", "extra": 1}));
        let expected = obj(json!({"price": 100.0, "side": "BUY", "sl": 95.0}));
        let tolerance = ToleranceSpec::global(0.5, ["price"]);
        let result = compare_dict(&actual, &expected, &tolerance, CompareOp::Equal);

        let table = verify_table(&actual, &expected, CompareOp::Equal, &result, Some(0.5));
        assert!(table.starts_with("Tolerance: 0.5%"));
        assert!(table.contains("FAILED"));
        assert!(table.contains("MISSING"));
        assert!(table.contains("REDUNDANT"));
        assert!(table.contains("Diff %"));
        assert!(table.contains("±0.50 (0.50%)"));
    }

    #[test]
    fn test_verify_table_contains_mode_hides_extra_keys() {
        let actual = obj(json!({"side": "BUY", "internal_id": 99}));
        let expected = obj(json!({"side": "BUY"}));
        let result = compare_dict(&actual, &expected, &ToleranceSpec::none(), CompareOp::Contains);
        let table = verify_table(&actual, &expected, CompareOp::Contains, &result, None);
        assert!(!table.contains("internal_id"));
        assert!(!table.contains("Diff %"));
    }

    #[test]
    fn test_artifact_reporter_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = ArtifactReporter::new(dir.path()).unwrap();

        reporter.attach_text("test one", "Verify Table", "body").unwrap();
        reporter.attach_png("test one", "failed", b"\x89PNG").unwrap();
        reporter.attach_png("test one", "failed", b"\x89PNG").unwrap();

        let test_dir = dir.path().join("attachments").join("test_one");
        let files: Vec<_> = std::fs::read_dir(&test_dir).unwrap().collect();
        assert_eq!(files.len(), 2);
        assert_eq!(
            std::fs::read_to_string(test_dir.join("Verify_Table.txt")).unwrap(),
            "body"
        );
    }

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = Arc::new(ArtifactReporter::new(dir.path()).unwrap());
        let mut session = Session::new(reporter.clone());
        let ctx = session.start_test("t1");
        session.finish_test(ctx).unwrap();

        let path = reporter.write_summary(&session.summary()).unwrap();
        let json: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["results"][0]["test_id"], "t1");
    }
}
