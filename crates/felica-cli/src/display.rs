//! Console rendering of a running session.

use crate::formatters::{
    auth_label, format_key_info, format_key_list, format_key_version, seconds,
};
use felica_core::{KeyVersions, ServiceGroup, ServiceResult, SystemCode};
use felica_hardware::PollingResponse;
use felica_reader::{ProcessingOrder, ReportSink, SystemPlan, SystemReport};
use std::io::Write;
use tracing::warn;

/// Prints session progress to a writer, stdout in practice.
pub struct ConsoleSink<W> {
    out: W,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn header(&mut self, product: &str) {
        self.emit(vec![
            "=== FeliCa Card Reader ===".to_string(),
            format!("Connected: {product}"),
        ]);
    }

    fn emit(&mut self, lines: Vec<String>) {
        for line in lines {
            if let Err(e) = writeln!(self.out, "{line}") {
                warn!("Failed to write console output: {}", e);
                return;
            }
        }
    }
}

fn group_line(group: &ServiceGroup, versions: &KeyVersions) -> String {
    let present = |code| versions.services.get(&code);

    if group.len() == 1 {
        let code = group.first();
        let key_info = present(code)
            .map(|v| format!(" - {}", format_key_version(v)))
            .unwrap_or_default();
        return format!("Service {} ({}){}", code, auth_label(code), key_info);
    }

    let modes: Vec<&str> = group
        .iter()
        .map(|code| {
            if code.requires_authentication() {
                "auth"
            } else {
                "open"
            }
        })
        .collect();
    let key_parts: Vec<String> = group
        .iter()
        .filter_map(|&code| present(code).map(|v| format!("{}: {}", code, format_key_version(v))))
        .collect();
    let key_info = if key_parts.is_empty() {
        String::new()
    } else {
        format!(" - {}", key_parts.join(", "))
    };

    format!(
        "Service Group: {} (Overlapped: {}){}",
        group,
        modes.join(" "),
        key_info
    )
}

/// Service tree: areas nested by containment, groups under their area.
pub fn service_tree(plan: &SystemPlan) -> Vec<String> {
    let mut lines = vec!["Services & Areas".to_string()];

    for (depth, node) in plan.hierarchy.walk() {
        let indent = "  ".repeat(depth + 1);
        lines.push(format!("{indent}Area {}", node.area));
        for group in &node.groups {
            lines.push(format!("{indent}  {}", group_line(group, &plan.key_versions)));
        }
    }
    for group in plan.hierarchy.unassigned() {
        lines.push(format!("  {}", group_line(group, &plan.key_versions)));
    }

    lines
}

fn overview(plan: &SystemPlan) -> Vec<String> {
    let mut lines = vec![
        "System Information".to_string(),
        format!("  Keys Loaded: {}", plan.key_count),
        format!("  Areas Found: {}", plan.structure.areas.len()),
        format!("  Services Found: {}", plan.structure.services.len()),
    ];

    if let Some(version) = plan.key_versions.system.get(&plan.system_code) {
        lines.push(format!("System Key Version: {}", format_key_version(version)));
    }

    if !plan.structure.areas.is_empty() {
        lines.push("Areas".to_string());
        for (i, area) in plan.structure.areas.iter().enumerate() {
            let key_info = plan
                .key_versions
                .areas
                .get(area)
                .map(format_key_version)
                .unwrap_or_else(|| "Not available".to_string());
            lines.push(format!("  Area {:<3} {}  {}", i + 1, area, key_info));
        }
    }

    lines
}

/// Panel for one group result.
pub fn result_panel(result: &ServiceResult) -> Vec<String> {
    let mut lines = vec![format!(
        "Service: {} | {} | Blocks: {} | Time: {}",
        result.service_codes,
        if result.success { "Success" } else { "Failed" },
        result.block_count(),
        seconds(result.processing_time)
    )];

    let keys = &result.used_keys;
    if keys.authentication_required() {
        let mut sections = Vec::new();
        if let Some(system) = keys.system_key() {
            sections.push(format!("    System: {}", format_key_info(system)));
        }
        if !keys.area_keys().is_empty() {
            sections.push(format!("    Area: {}", format_key_list(keys.area_keys())));
        }
        if !keys.service_keys().is_empty() {
            sections.push(format!("    Service: {}", format_key_list(keys.service_keys())));
        }
        if !sections.is_empty() {
            lines.push("  Authentication Keys:".to_string());
            lines.extend(sections);
        }
    } else {
        lines.push("  Authentication: Not authenticated".to_string());
    }

    if result.success && !result.blocks.is_empty() {
        lines.push("  Block Data:".to_string());
        lines.extend(result.blocks.iter().map(|block| format!("    {block}")));
    } else if !result.success {
        let details = result.output_lines();
        if !details.is_empty() {
            lines.push("  Error Details:".to_string());
            lines.extend(details.iter().map(|line| format!("    {line}")));
        }
    }

    lines.push(String::new());
    lines
}

fn summary(report: &SystemReport) -> Vec<String> {
    vec![
        "=== Final Summary ===".to_string(),
        format!("  Successful: {}", report.successful()),
        format!("  Failed: {}", report.failed()),
        format!("  Success Rate: {:.1}%", report.success_rate()),
        format!("  Total Blocks: {}", report.total_blocks()),
        format!("  Total Time: {}", seconds(report.processing_time())),
    ]
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn system_started(&mut self, system_code: SystemCode, polling: &PollingResponse) {
        self.emit(vec![
            String::new(),
            format!("=== System {system_code} ==="),
            format!("IDm: {}  PMm: {}", polling.idm_hex(), polling.pmm_hex()),
        ]);
    }

    fn structure_discovered(&mut self, plan: &SystemPlan) {
        let mut lines = overview(plan);
        lines.extend(service_tree(plan));
        self.emit(lines);
    }

    fn processing_order(&mut self, order: &ProcessingOrder) {
        self.emit(vec![
            String::new(),
            format!(
                "Processing order: {} non-auth groups first, then {} auth groups",
                order.no_auth.len(),
                order.auth.len()
            ),
        ]);
    }

    fn system_finished(&mut self, report: &SystemReport) {
        let mut lines = vec![
            String::new(),
            "=== Service Processing Results ===".to_string(),
        ];
        for result in &report.results {
            lines.extend(result_panel(result));
        }
        lines.extend(summary(report));
        self.emit(lines);
    }
}
