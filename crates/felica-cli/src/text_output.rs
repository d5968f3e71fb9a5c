//! Plain-text export of session reports.

use crate::formatters::{
    format_key_info, format_key_list, format_key_version, performance_label, rating, seconds,
    with_thousands,
};
use chrono::{DateTime, Local};
use felica_core::{AuthStatus, ServiceResult};
use felica_reader::SystemReport;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const MAX_EXTRA_LINES: usize = 5;
const MAX_ERROR_LINES: usize = 3;

/// Collects report text and writes it to one file.
#[derive(Debug)]
pub struct TextOutput {
    path: PathBuf,
    keys_file: String,
    started: DateTime<Local>,
    lines: Vec<String>,
}

impl TextOutput {
    pub fn new(path: impl Into<PathBuf>, keys_file: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            keys_file: keys_file.into(),
            started: Local::now(),
            lines: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one system. The file header is written before the first.
    pub fn add_system(&mut self, report: &SystemReport) {
        if self.lines.is_empty() {
            self.add_header();
        }
        self.add_overview(report);
        self.add_areas(report);
        self.add_results(&report.results);
        self.add_summary(report);
        self.lines.extend(["=".repeat(80), String::new()]);
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    /// Write everything collected so far, creating parent directories.
    pub fn save(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, self.render())
    }

    fn add_header(&mut self) {
        self.lines.extend([
            "FeliCa Dumper Results".to_string(),
            "=".repeat(50),
            format!("Date: {}", self.started.format("%Y-%m-%d %H:%M:%S")),
            format!("Keys file: {}", self.keys_file),
            String::new(),
        ]);
    }

    fn add_overview(&mut self, report: &SystemReport) {
        let plan = &report.plan;
        self.lines.extend([
            format!("System {} Overview", plan.system_code),
            "=".repeat(30),
            format!("IDm: {}", plan.polling.idm_hex()),
            format!("PMm: {}", plan.polling.pmm_hex()),
            format!("Available Keys: {}", plan.key_count),
            format!("Discovered Areas: {}", plan.structure.areas.len()),
            format!("Found Services: {}", plan.structure.services.len()),
            String::new(),
        ]);
    }

    fn add_areas(&mut self, report: &SystemReport) {
        let plan = &report.plan;
        if plan.structure.areas.is_empty() {
            return;
        }

        self.lines.extend(["Areas".to_string(), "=".repeat(20)]);
        for (i, area) in plan.structure.areas.iter().enumerate() {
            let key_info = plan
                .key_versions
                .areas
                .get(area)
                .map(format_key_version)
                .unwrap_or_else(|| "Not available".to_string());
            self.lines
                .push(format!("Area {}: {} - {}", i + 1, area, key_info));
        }
        self.lines.push(String::new());
    }

    fn add_results(&mut self, results: &[ServiceResult]) {
        self.lines
            .extend(["Service Results".to_string(), "=".repeat(30)]);
        if results.is_empty() {
            self.lines
                .extend(["No service results to display".to_string(), String::new()]);
            return;
        }

        for result in results {
            self.add_result(result);
        }
    }

    fn add_result(&mut self, result: &ServiceResult) {
        let (status, speed) = if result.success {
            ("Success", performance_label(result.processing_time))
        } else {
            ("Failed", "")
        };
        self.lines.extend([
            format!(
                "Service {} | {} | {} blocks | {}{}",
                result.service_codes,
                status,
                result.block_count(),
                seconds(result.processing_time),
                speed
            ),
            "-".repeat(60),
        ]);

        let keys = &result.used_keys;
        self.lines
            .push(format!("Authentication: {}", keys.status()));
        if keys.status() == AuthStatus::Successful {
            if let Some(system) = keys.system_key() {
                self.lines
                    .push(format!("  System Key: {}", format_key_info(system)));
            }
            if !keys.area_keys().is_empty() {
                self.lines
                    .push(format!("  Area Keys: {}", format_key_list(keys.area_keys())));
            }
            if !keys.service_keys().is_empty() {
                self.lines.push(format!(
                    "  Service Keys: {}",
                    format_key_list(keys.service_keys())
                ));
            }
        }

        if result.success {
            if !result.blocks.is_empty() {
                self.lines.push("Block Data:".to_string());
                self.lines
                    .extend(result.blocks.iter().map(|block| format!("  {block}")));
            }

            let extra: Vec<&String> = result
                .messages
                .iter()
                .filter(|line| !line.trim().is_empty())
                .collect();
            if !extra.is_empty() {
                self.lines.push("Additional Info:".to_string());
                self.push_limited(&extra, MAX_EXTRA_LINES, "more lines");
            }
        } else {
            let details = result.output_lines();
            if !details.is_empty() {
                let details: Vec<&String> = details.iter().collect();
                self.lines.push("Error Details:".to_string());
                self.push_limited(&details, MAX_ERROR_LINES, "more error lines");
            }
        }

        self.lines.push(String::new());
    }

    fn push_limited(&mut self, lines: &[&String], limit: usize, rest: &str) {
        self.lines
            .extend(lines.iter().take(limit).map(|line| format!("  {line}")));
        if lines.len() > limit {
            self.lines
                .push(format!("  ... {} {}", lines.len() - limit, rest));
        }
    }

    fn add_summary(&mut self, report: &SystemReport) {
        let total = report.results.len();
        let success_rate = report.success_rate();
        let processing = report.processing_time();
        let average = if total == 0 {
            Default::default()
        } else {
            processing / u32::try_from(total).unwrap_or(u32::MAX)
        };

        self.lines.extend([
            "Final Summary".to_string(),
            "=".repeat(30),
            format!("Processing Complete - {} Results", rating(success_rate)),
            String::new(),
            format!("Successful Services: {}", report.successful()),
            format!("Failed Services: {}", report.failed()),
            format!("Success Rate: {success_rate:.1}%"),
            format!(
                "Total Blocks Read: {}",
                with_thousands(report.total_blocks())
            ),
            format!("Service Processing Time: {}", seconds(processing)),
            format!("Total Session Time: {}", seconds(report.elapsed)),
            format!("Average per Service: {}", seconds(average)),
            String::new(),
        ]);
    }
}
