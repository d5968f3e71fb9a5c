//! Formatters shared by the console and the text export

use felica_core::{KeyRecord, KeyVersion, ServiceCode};
use std::time::Duration;

fn version_part(label: &str, version: Option<u16>) -> String {
    match version {
        Some(tag) => format!("{label}:0x{tag:04X}"),
        None => format!("{label}:No key"),
    }
}

/// Format a node's key version.
///
/// Legacy answers only carry a DES tag; v2 answers show both.
pub fn format_key_version(version: &KeyVersion) -> String {
    match version {
        KeyVersion::None => "Failed to retrieve".to_string(),
        KeyVersion::Legacy(_) => version_part("DES", version.des()),
        KeyVersion::Dual { .. } => format!(
            "{}/{}",
            version_part("AES", version.aes()),
            version_part("DES", version.des())
        ),
    }
}

/// Key reference with its version, e.g. `0xFFFF(v1)`
pub fn format_key_info(key: &KeyRecord) -> String {
    format!("0x{:04X}(v{})", key.node_id, key.version)
}

pub fn format_key_list(keys: &[KeyRecord]) -> String {
    keys.iter()
        .map(format_key_info)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn auth_label(code: ServiceCode) -> &'static str {
    if code.requires_authentication() {
        "Auth required"
    } else {
        "No auth needed"
    }
}

/// Speed tag appended to successful results
pub fn performance_label(elapsed: Duration) -> &'static str {
    match elapsed.as_secs_f64() {
        t if t < 1.0 => " (Fast)",
        t if t < 3.0 => " (Normal)",
        _ => " (Slow)",
    }
}

/// Overall rating for a success rate in percent
pub fn rating(success_rate: f64) -> &'static str {
    if success_rate >= 90.0 {
        "Excellent"
    } else if success_rate >= 75.0 {
        "Good"
    } else if success_rate >= 50.0 {
        "Partial"
    } else {
        "Poor"
    }
}

/// Integer with `,` thousands separators
pub fn with_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn seconds(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}
