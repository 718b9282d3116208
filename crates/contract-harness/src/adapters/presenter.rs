#![expect(clippy::print_stdout, reason = "CLI output is emitted here")]
#![expect(clippy::print_stderr, reason = "CLI output is emitted here")]

//! CLI output presenter.

use clap::ValueEnum;
use harness_infra::common::Colors;
use harness_infra::usecases::{CaseReport, HarnessError, SuiteReport, TestCase};
use serde::Serialize;

/// Output format for CLI commands
#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const PROGRAM_NAME: &str = "contract-harness";

pub trait Presenter {
    fn present_suite(&self, report: &SuiteReport);

    fn present_case_list(&self, cases: &[&TestCase]);

    fn present_error(&self, error: &ErrorView);
}

/// A setup failure that stops the command before any case runs.
#[derive(Clone, Debug)]
pub struct ErrorView {
    pub message: String,
    pub suggestion: Option<String>,
}

pub struct TextPresenter;

impl TextPresenter {
    fn case_line(case: &CaseReport) -> String {
        let status = if case.passed() {
            Colors::success("ok")
        } else {
            Colors::error("FAILED")
        };
        format!(
            "case {} ... {} {}",
            Colors::case_name(&case.name),
            status,
            Colors::dim(&format!("({}ms)", case.elapsed_ms))
        )
    }

    fn failure_block(case: &CaseReport, err: &HarnessError) -> Vec<String> {
        let mut lines = vec![
            format!("---- {} ----", case.name),
            format!("[{}] {}", err.kind(), err),
        ];
        if let HarnessError::Compile { diagnostics, .. } = err {
            lines.extend(diagnostics.iter().map(|diagnostic| format!("  {}", diagnostic)));
        }
        if let Some(actual) = case.actual.as_deref() {
            lines.push(format!("{} {}", Colors::dim("actual:"), actual));
        }
        lines.push(format!("{} {}", Colors::dim("Suggestion:"), err.suggestion()));
        lines
    }
}

impl Presenter for TextPresenter {
    fn present_suite(&self, report: &SuiteReport) {
        let count = report.cases.len();
        println!(
            "running {} case{}",
            count,
            if count == 1 { "" } else { "s" }
        );
        for case in &report.cases {
            println!("{}", Self::case_line(case));
        }

        let failures: Vec<_> = report
            .cases
            .iter()
            .filter_map(|case| case.error().map(|err| (case, err)))
            .collect();
        if !failures.is_empty() {
            println!();
            println!("failures:");
            for (case, err) in failures {
                println!();
                for line in Self::failure_block(case, err) {
                    println!("{}", line);
                }
            }
        }

        let summary = report.summary();
        let verdict = if report.all_passed() {
            Colors::success("ok")
        } else {
            Colors::error("FAILED")
        };
        println!();
        println!(
            "test result: {}. {} passed; {} failed; {} filtered out; finished in {}ms",
            verdict, summary.passed, summary.failed, summary.skipped, summary.elapsed_ms
        );
    }

    fn present_case_list(&self, cases: &[&TestCase]) {
        if cases.is_empty() {
            println!("{}", Colors::dim("No cases selected"));
            return;
        }
        for case in cases {
            println!(
                "{} {}",
                Colors::case_name(&case.name),
                Colors::dim(&format!("({} -> {})", case.artifact, case.accessor))
            );
        }
    }

    fn present_error(&self, error: &ErrorView) {
        eprintln!("{}: {} {}", PROGRAM_NAME, Colors::error("Error:"), error.message);
        if let Some(suggestion) = error.suggestion.as_deref() {
            eprintln!("{} {}", Colors::dim("Suggestion:"), suggestion);
        }
    }
}

pub struct JsonPresenter;

#[derive(Serialize)]
struct ErrorJson {
    kind: &'static str,
    code: i32,
    category: &'static str,
    message: String,
    suggestion: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<String>,
}

impl ErrorJson {
    fn from_error(err: &HarnessError) -> Self {
        let diagnostics = match err {
            HarnessError::Compile { diagnostics, .. } => {
                diagnostics.iter().map(ToString::to_string).collect()
            }
            _ => Vec::new(),
        };
        Self {
            kind: err.kind().as_str(),
            code: err.code(),
            category: err.category().as_str(),
            message: err.to_string(),
            suggestion: err.suggestion(),
            diagnostics,
        }
    }
}

#[derive(Serialize)]
struct CaseJson<'a> {
    name: &'a str,
    passed: bool,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
}

impl<'a> CaseJson<'a> {
    fn from_report(case: &'a CaseReport) -> Self {
        Self {
            name: &case.name,
            passed: case.passed(),
            elapsed_ms: case.elapsed_ms,
            actual: case.actual.as_deref(),
            error: case.error().map(ErrorJson::from_error),
        }
    }
}

pub(crate) fn suite_json(report: &SuiteReport) -> serde_json::Value {
    let cases: Vec<_> = report.cases.iter().map(CaseJson::from_report).collect();
    serde_json::json!({
        "success": report.all_passed(),
        "summary": report.summary(),
        "cases": cases,
    })
}

impl Presenter for JsonPresenter {
    fn present_suite(&self, report: &SuiteReport) {
        println!(
            "{}",
            serde_json::to_string_pretty(&suite_json(report)).unwrap_or_default()
        );
    }

    fn present_case_list(&self, cases: &[&TestCase]) {
        let items: Vec<_> = cases
            .iter()
            .map(|case| {
                serde_json::json!({
                    "name": case.name,
                    "artifact": case.artifact.to_string(),
                    "accessor": case.accessor,
                })
            })
            .collect();
        let output = serde_json::json!({ "cases": items });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    }

    fn present_error(&self, error: &ErrorView) {
        let mut output = serde_json::json!({
            "success": false,
            "error": error.message,
        });
        if let Some(suggestion) = error.suggestion.as_ref() {
            output["suggestion"] = serde_json::json!(suggestion);
        }
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    }
}

pub fn create_presenter(format: &OutputFormat) -> Box<dyn Presenter> {
    match format {
        OutputFormat::Json => Box::new(JsonPresenter),
        OutputFormat::Text => Box::new(TextPresenter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness_infra::usecases::CaseOutcome;

    fn report() -> SuiteReport {
        SuiteReport {
            cases: vec![
                CaseReport {
                    name: "test_greeting".to_string(),
                    outcome: CaseOutcome::Passed,
                    elapsed_ms: 3,
                    actual: Some("('God bless Ezen-wata',)".to_string()),
                },
                CaseReport {
                    name: "get_unknown".to_string(),
                    outcome: CaseOutcome::Failed(HarnessError::NoSuchFunction {
                        function: "get_unknown".to_string(),
                    }),
                    elapsed_ms: 1,
                    actual: None,
                },
            ],
            skipped: 2,
            elapsed_ms: 5,
        }
    }

    #[test]
    fn test_suite_json_shape() {
        let json = suite_json(&report());

        assert_eq!(json["success"], false);
        assert_eq!(json["summary"]["total"], 2);
        assert_eq!(json["summary"]["passed"], 1);
        assert_eq!(json["summary"]["skipped"], 2);
        assert_eq!(json["cases"][0]["passed"], true);
        assert_eq!(json["cases"][0]["actual"], "('God bless Ezen-wata',)");
        assert!(json["cases"][0].get("error").is_none());
        assert_eq!(json["cases"][1]["error"]["kind"], "no_such_function");
        assert_eq!(json["cases"][1]["error"]["category"], "not_found");
        assert!(json["cases"][1].get("actual").is_none());
    }

    #[test]
    fn test_failure_block_lists_diagnostics() {
        let case = CaseReport {
            name: "broken".to_string(),
            outcome: CaseOutcome::Passed,
            elapsed_ms: 0,
            actual: None,
        };
        let err = HarnessError::Compile {
            artifact: "bad.cairo".to_string(),
            diagnostics: vec![
                harness_infra::usecases::ports::CompileDiagnostic::new(5, 5, "expected ':'"),
            ],
        };

        let lines = TextPresenter::failure_block(&case, &err);

        assert_eq!(lines[0], "---- broken ----");
        assert!(lines[1].starts_with("[compile] "));
        assert_eq!(lines[2], "  5:5: expected ':'");
    }
}
