//! Plain-text run log
//!
//! The log is the record of a run kept next to the output layers: start
//! time and every parameter, one line per segment, notices for recovered
//! conditions and a closing summary.

use crate::batch::SegmentOutcome;
use crate::config::RunConfig;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::Path;
use std::time::{Duration, Instant};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug)]
pub struct RunLog {
    started: DateTime<Local>,
    clock: Instant,
    text: String,
    completed: usize,
    failed: usize,
}

impl RunLog {
    /// Open a log with the run header
    pub fn new(config: &RunConfig, inputs: &[(&str, &Path)]) -> Self {
        let started = Local::now();
        let mut text = String::new();
        let _ = writeln!(text, "Valley bottom classification run");
        let _ = writeln!(text, "Started: {}", started.format(TIME_FORMAT));
        if let Some(analyst) = &config.analyst {
            let _ = writeln!(text, "Analyst: {analyst}");
        }
        text.push('\n');

        let _ = writeln!(text, "Inputs");
        for (name, path) in inputs {
            let _ = writeln!(text, "  {name:<16} {}", path.display());
        }
        text.push('\n');

        let _ = writeln!(text, "Parameters");
        if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(config) {
            for (key, value) in fields {
                let _ = writeln!(text, "  {key:<20} {value}");
            }
        }
        text.push('\n');

        Self {
            started,
            clock: Instant::now(),
            text,
            completed: 0,
            failed: 0,
        }
    }

    pub fn started(&self) -> DateTime<Local> {
        self.started
    }

    /// Record one segment's status line and notices
    pub fn record(&mut self, outcome: &SegmentOutcome) {
        match outcome {
            SegmentOutcome::Complete(result) => {
                self.completed += 1;
                let t = result.classification.valley_type;
                let _ = writeln!(
                    self.text,
                    "SEGMENT {:05} COMPLETE class={} ({})",
                    result.id,
                    t.code(),
                    t.abbreviation()
                );
                for notice in &result.notices {
                    let _ = writeln!(self.text, "    NOTICE: {notice}");
                }
            }
            SegmentOutcome::Failed { id, error, .. } => {
                self.failed += 1;
                let _ = writeln!(self.text, "SEGMENT {id:05} FAILED: {error}");
            }
        }
    }

    /// Free-form line, e.g. an output file written
    pub fn note(&mut self, line: &str) {
        let _ = writeln!(self.text, "{line}");
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Log text with the closing summary
    pub fn finish(&self) -> String {
        let mut text = self.text.clone();
        let elapsed = self.elapsed().as_secs_f64();
        let processed = self.completed + self.failed;
        text.push('\n');
        let _ = writeln!(text, "Finished: {}", Local::now().format(TIME_FORMAT));
        let _ = writeln!(
            text,
            "Segments: {processed} processed, {} complete, {} failed",
            self.completed, self.failed
        );
        let _ = writeln!(text, "Elapsed: {elapsed:.1} s");
        if processed > 0 {
            let _ = writeln!(text, "Average: {:.2} s per segment", elapsed / processed as f64);
        }
        text
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.finish())
    }
}
