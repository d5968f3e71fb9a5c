//! Data exchanged with the transceiver and crypto capabilities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the card directory returned by Search Service Code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryEntry {
    /// A single service code.
    Service(u16),

    /// An area covering `[start, end]`.
    Area { start: u16, end: u16 },
}

/// IDm and PMm returned by polling a system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingResponse {
    pub idm: [u8; 8],
    pub pmm: [u8; 8],
}

impl PollingResponse {
    pub fn idm_hex(&self) -> String {
        hex::encode_upper(self.idm)
    }

    pub fn pmm_hex(&self) -> String {
        hex::encode_upper(self.pmm)
    }
}

/// Group and user service keys derived for one authentication.
///
/// # Security
/// `Debug` does not print the key bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub group_key: Vec<u8>,
    pub user_key: Vec<u8>,
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field(
                "group_key",
                &format_args!("<{} bytes>", self.group_key.len()),
            )
            .field("user_key", &format_args!("<{} bytes>", self.user_key.len()))
            .finish()
    }
}

/// Issue ID and issue parameter returned by mutual authentication.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthIdentity {
    pub idi: Vec<u8>,
    pub pmi: Vec<u8>,
}

impl fmt::Display for AuthIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IDi={} PMi={}",
            hex::encode_upper(&self.idi),
            hex::encode_upper(&self.pmi)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_entry_json() {
        let service: DirectoryEntry = serde_json::from_str(r#"{"service": 4104}"#).unwrap();
        assert_eq!(service, DirectoryEntry::Service(0x1008));

        let area: DirectoryEntry =
            serde_json::from_str(r#"{"area": {"start": 0, "end": 65534}}"#).unwrap();
        assert_eq!(
            area,
            DirectoryEntry::Area {
                start: 0,
                end: 0xFFFE
            }
        );
    }

    #[test]
    fn test_polling_response_hex() {
        let response = PollingResponse {
            idm: [0x01, 0x2E, 0x4C, 0xD3, 0x00, 0x00, 0x00, 0x01],
            pmm: [0; 8],
        };
        assert_eq!(response.idm_hex(), "012E4CD300000001");
        assert_eq!(response.pmm_hex(), "0000000000000000");
    }

    #[test]
    fn test_session_keys_debug_is_redacted() {
        let keys = SessionKeys {
            group_key: vec![0xAA; 16],
            user_key: vec![0xBB; 16],
        };
        let debug = format!("{keys:?}");
        assert!(debug.contains("<16 bytes>"));
        assert!(!debug.to_lowercase().contains("aa"));
    }
}
