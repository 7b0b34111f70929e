//! Offline comparison of two JSON documents

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use tradecheck_e2e::{AssertOutcome, CompareOp, MemoryReporter, TestContext, ToleranceSpec};

use crate::output::{print_error, print_success, OutputFormat};

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// JSON file with the observed values
    #[arg(long)]
    pub actual: PathBuf,

    /// JSON file with the expected values
    #[arg(long)]
    pub expected: PathBuf,

    /// Allowed deviation in percent
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Fields the tolerance applies to (default: every expected field)
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Per-field tolerance, e.g. `price=0.5` (repeatable)
    #[arg(long = "field-tolerance", value_parser = parse_field_tolerance)]
    pub field_tolerance: Vec<(String, f64)>,

    /// Only compare what the expected side mentions
    #[arg(long)]
    pub contains: bool,
}

/// Outcome of one comparison
#[derive(Debug, Serialize)]
pub struct CompareReport {
    pub passed: bool,
    pub result: AssertOutcome,
    pub failures: Vec<String>,
    #[serde(skip)]
    pub table: Option<String>,
}

fn parse_field_tolerance(s: &str) -> Result<(String, f64), String> {
    let (field, percent) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=PERCENT, got '{s}'"))?;
    let percent: f64 = percent
        .trim()
        .parse()
        .map_err(|e| format!("invalid percent '{percent}': {e}"))?;
    if field.trim().is_empty() {
        return Err(format!("missing field name in '{s}'"));
    }
    Ok((field.trim().to_string(), percent))
}

fn load_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn tolerance_spec(args: &CompareArgs, expected: &Value) -> ToleranceSpec {
    let mut spec = match args.tolerance {
        Some(percent) if args.fields.is_empty() => {
            let fields: Vec<String> = expected
                .as_object()
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default();
            ToleranceSpec::global(percent, fields)
        }
        Some(percent) => ToleranceSpec::global(percent, args.fields.iter().cloned()),
        None => ToleranceSpec::none(),
    };
    for (field, percent) in &args.field_tolerance {
        spec = spec.with_field(field.clone(), *percent);
    }
    spec
}

/// Compare the two documents through the soft-assertion engine.
pub fn run(args: &CompareArgs) -> Result<CompareReport> {
    let actual = load_json(&args.actual)?;
    let expected = load_json(&args.expected)?;
    let tolerance = tolerance_spec(args, &expected);
    debug!(
        "Comparing {} against {} ({:?})",
        args.actual.display(),
        args.expected.display(),
        tolerance
    );
    let op = if args.contains {
        CompareOp::Contains
    } else {
        CompareOp::Equal
    };

    let reporter = Arc::new(MemoryReporter::default());
    let mut ctx = TestContext::new("compare", reporter.clone());
    let result = ctx.soft_assert(&actual, &expected, op, "", &tolerance);

    Ok(CompareReport {
        passed: result.passed(),
        failures: ctx
            .checks()
            .failures()
            .iter()
            .map(|f| f.message.trim().to_string())
            .collect(),
        table: reporter.texts().pop().map(|(_, _, body)| body),
        result,
    })
}

/// Returns whether the documents matched.
pub fn execute(args: CompareArgs, format: OutputFormat) -> Result<bool> {
    let report = run(&args)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Table | OutputFormat::Plain => {
            if let (OutputFormat::Table, Some(table)) = (format, &report.table) {
                println!("{table}");
            }
            for failure in &report.failures {
                println!("{failure}");
            }
            if report.passed {
                print_success("Comparison passed");
            } else {
                print_error("Comparison failed");
            }
        }
    }

    Ok(report.passed)
}
