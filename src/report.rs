//! Run summaries in text and JSON form

use std::path::PathBuf;

use serde::Serialize;

use crate::driver::{ConversionStats, FileReport};
use crate::error::Result;

/// A file that could not be converted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

/// Aggregate result of a run over one or more files
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub stats: ConversionStats,
    pub files: Vec<FileReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FileError>,
}

impl RunSummary {
    pub fn add_file(&mut self, report: FileReport) {
        self.stats.merge(&report.stats);
        self.files.push(report);
    }

    /// The three counter lines
    pub fn to_text(&self) -> String {
        format!(
            "{} converted\n{} potentially conflicting\n{} change(s) rejected\n",
            self.stats.converted, self.stats.conflicting, self.stats.rejected
        )
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RejectReason;
    use crate::driver::{LoopOutcome, LoopReport};

    fn summary() -> RunSummary {
        let mut stats = ConversionStats::default();
        let loops = vec![
            LoopReport {
                line: 3,
                header: None,
                outcome: LoopOutcome::Converted {
                    name: "elem".to_string(),
                    container: "arr".to_string(),
                },
            },
            LoopReport {
                line: 7,
                header: None,
                outcome: LoopOutcome::Rejected {
                    reason: RejectReason::BoundMismatch,
                },
            },
        ];
        for report in &loops {
            stats.record(&report.outcome);
        }

        let mut summary = RunSummary::default();
        summary.add_file(FileReport {
            path: PathBuf::from("a.cpp"),
            stats,
            loops,
            output: Some("ignored".to_string()),
        });
        summary
    }

    #[test]
    fn test_text_format() {
        assert_eq!(
            summary().to_text(),
            "1 converted\n0 potentially conflicting\n1 change(s) rejected\n"
        );
    }

    #[test]
    fn test_json_format() {
        let json: serde_json::Value = serde_json::from_str(&summary().to_json().unwrap()).unwrap();
        assert_eq!(json["stats"]["converted"], 1);
        assert_eq!(json["stats"]["reasons"]["bound_mismatch"], 1);
        assert_eq!(json["files"][0]["path"], "a.cpp");
        assert_eq!(json["files"][0]["loops"][0]["status"], "converted");
        assert_eq!(json["files"][0]["loops"][0]["name"], "elem");
        assert_eq!(json["files"][0]["loops"][1]["reason"], "bound_mismatch");
        assert!(json["files"][0].get("output").is_none());
        assert!(json.get("errors").is_none());
    }
}
