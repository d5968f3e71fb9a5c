//! Serializable description of a card, replayed by [`MockTag`](super::MockTag).

use crate::{
    error::{Result, TagError},
    types::{DirectoryEntry, PollingResponse},
};
use felica_core::constants::{BLOCK_SIZE, NO_KEY_VALUE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

fn default_product() -> String {
    "FeliCa Standard (card image)".to_string()
}

fn default_true() -> bool {
    true
}

/// A whole card: one entry per system code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardImage {
    #[serde(default = "default_product")]
    pub product: String,

    pub systems: Vec<SystemImage>,
}

/// Key versions reported for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeVersion {
    #[serde(default = "NodeVersion::no_key")]
    pub aes: u16,

    #[serde(default)]
    pub des: Option<u16>,
}

impl NodeVersion {
    fn no_key() -> u16 {
        NO_KEY_VALUE
    }

    /// Version reported by a node that does not exist.
    pub fn absent() -> Self {
        Self {
            aes: NO_KEY_VALUE,
            des: None,
        }
    }

    /// Single tag returned by the legacy query.
    pub fn legacy(&self) -> u16 {
        self.des.unwrap_or(NO_KEY_VALUE)
    }
}

/// One system of the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemImage {
    pub system_code: u16,

    /// Hex-encoded 8-byte IDm.
    pub idm: String,

    /// Hex-encoded 8-byte PMm.
    pub pmm: String,

    /// Directory in the card's native enumeration order.
    #[serde(default)]
    pub directory: Vec<DirectoryEntry>,

    /// Key versions by node code (area start, service code or 0xFFFF).
    #[serde(default)]
    pub key_versions: BTreeMap<u16, NodeVersion>,

    /// Hex-encoded 16-byte blocks by service code.
    #[serde(default)]
    pub blocks: BTreeMap<u16, Vec<String>>,

    /// Services whose mutual authentication is refused.
    #[serde(default)]
    pub rejected_services: Vec<u16>,

    /// Whether Request Service v2 is implemented.
    #[serde(default = "default_true")]
    pub supports_v2: bool,
}

fn decode_id(label: &str, value: &str) -> Result<[u8; 8]> {
    let bytes =
        hex::decode(value).map_err(|e| TagError::invalid_image(format!("{label} {value}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| TagError::invalid_image(format!("{label} {value}: expected 8 bytes")))
}

impl SystemImage {
    /// Decode IDm and PMm.
    pub fn polling_response(&self) -> Result<PollingResponse> {
        Ok(PollingResponse {
            idm: decode_id("IDm", &self.idm)?,
            pmm: decode_id("PMm", &self.pmm)?,
        })
    }

    pub fn node_version(&self, node: u16) -> NodeVersion {
        self.key_versions
            .get(&node)
            .copied()
            .unwrap_or_else(NodeVersion::absent)
    }

    /// Decoded block `block` of `service`, if present.
    pub fn block(&self, service: u16, block: u16) -> Result<Option<Vec<u8>>> {
        let Some(encoded) = self
            .blocks
            .get(&service)
            .and_then(|blocks| blocks.get(usize::from(block)))
        else {
            return Ok(None);
        };

        hex::decode(encoded)
            .map(Some)
            .map_err(|e| TagError::invalid_image(format!("block {service:04X}/{block}: {e}")))
    }

    fn validate(&self) -> Result<()> {
        self.polling_response()?;

        for (service, blocks) in &self.blocks {
            for (index, encoded) in blocks.iter().enumerate() {
                let bytes = hex::decode(encoded).map_err(|e| {
                    TagError::invalid_image(format!("block {service:04X}/{index}: {e}"))
                })?;
                if bytes.len() != BLOCK_SIZE {
                    return Err(TagError::invalid_image(format!(
                        "block {service:04X}/{index}: expected {BLOCK_SIZE} bytes, got {}",
                        bytes.len()
                    )));
                }
            }
        }

        Ok(())
    }
}

impl CardImage {
    /// Parse and validate a card image.
    ///
    /// # Errors
    /// Returns `TagError::InvalidImage` if the JSON is malformed or an
    /// identifier or block has the wrong size.
    pub fn from_json(json: &str) -> Result<Self> {
        let image: Self =
            serde_json::from_str(json).map_err(|e| TagError::invalid_image(e.to_string()))?;
        image.validate()?;
        Ok(image)
    }

    /// Load a card image from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| TagError::invalid_image(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.systems.iter().try_for_each(SystemImage::validate)
    }

    pub fn system(&self, system_code: u16) -> Option<&SystemImage> {
        self.systems.iter().find(|s| s.system_code == system_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const IMAGE: &str = r#"{
        "product": "FeliCa Standard (RC-S962)",
        "systems": [{
            "system_code": 3,
            "idm": "012E4CD300000001",
            "pmm": "100B4B428485D0FF",
            "directory": [
                {"area": {"start": 0, "end": 65534}},
                {"service": 4107}
            ],
            "key_versions": {"4107": {"aes": 1, "des": 2}},
            "blocks": {"4107": ["00112233445566778899aabbccddeeff"]}
        }]
    }"#;

    #[test]
    fn test_parse_image() {
        let image = CardImage::from_json(IMAGE).unwrap();
        let system = image.system(3).unwrap();

        assert_eq!(image.product, "FeliCa Standard (RC-S962)");
        assert_eq!(system.directory.len(), 2);
        assert!(system.supports_v2);
        assert_eq!(system.node_version(0x100B).aes, 1);
        assert_eq!(system.node_version(0x100B).legacy(), 2);
        assert_eq!(system.node_version(0x2000), NodeVersion::absent());
        assert_eq!(system.block(0x100B, 0).unwrap().unwrap().len(), 16);
        assert_eq!(system.block(0x100B, 1).unwrap(), None);
    }

    #[test]
    fn test_rejects_short_idm() {
        let json = IMAGE.replace("012E4CD300000001", "012E4C");
        let err = CardImage::from_json(&json).unwrap_err();
        assert!(matches!(err, TagError::InvalidImage { .. }));
    }

    #[test]
    fn test_rejects_short_block() {
        let json = IMAGE.replace("00112233445566778899aabbccddeeff", "0011");
        assert!(CardImage::from_json(&json).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(IMAGE.as_bytes()).unwrap();

        let image = CardImage::from_file(file.path()).unwrap();
        assert_eq!(image.systems.len(), 1);

        let missing = CardImage::from_file("/nonexistent/card.json");
        assert!(matches!(missing, Err(TagError::Io(_))));
    }

    #[test]
    fn test_pretty_json_reloads() {
        let image = CardImage::from_json(IMAGE).unwrap();
        let json = image.to_json_pretty().unwrap();
        assert_eq!(CardImage::from_json(&json).unwrap(), image);
    }
}
