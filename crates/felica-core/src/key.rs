//! Key records loaded from the key table.

use crate::{
    Result,
    constants::{AREA_KEY_THRESHOLD, ROOT_AREA_KEY_NODE_ID, SYSTEM_KEY_NODE_ID},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Role of a key in the authentication chain, derived from its node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    System,
    Area,
    Service,
}

impl KeyType {
    /// Classify a node id.
    ///
    /// # Examples
    ///
    /// ```
    /// use felica_core::KeyType;
    ///
    /// assert_eq!(KeyType::from_node_id(0xFFFF), KeyType::System);
    /// assert_eq!(KeyType::from_node_id(0x0000), KeyType::Area);
    /// assert_eq!(KeyType::from_node_id(0x0FC0), KeyType::Area);
    /// assert_eq!(KeyType::from_node_id(0x1008), KeyType::Service);
    /// ```
    #[must_use]
    pub fn from_node_id(node_id: u16) -> Self {
        if node_id == SYSTEM_KEY_NODE_ID {
            Self::System
        } else if node_id == ROOT_AREA_KEY_NODE_ID || node_id < AREA_KEY_THRESHOLD {
            Self::Area
        } else {
            Self::Service
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::System => write!(f, "System"),
            Self::Area => write!(f, "Area"),
            Self::Service => write!(f, "Service"),
        }
    }
}

/// Raw key bytes.
///
/// # Security
/// Equality is constant-time and `Debug` never prints the bytes.
#[derive(Clone, Eq)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decode hex-encoded key bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidHex` if the string is not valid hex.
    pub fn from_hex(value: &str) -> Result<Self> {
        hex::decode(value.trim())
            .map(Self)
            .map_err(|e| Error::InvalidHex(format!("{value}: {e}")))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice().ct_eq(other.0.as_slice()).into()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "KeyMaterial(<{} bytes>)", self.0.len())
    }
}

/// One key from the key table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub node_id: u16,
    pub version: u32,
    pub key: KeyMaterial,
    pub key_type: KeyType,
}

impl KeyRecord {
    /// Build a record, classifying the key by its node id.
    #[must_use]
    pub fn new(node_id: u16, version: u32, key: KeyMaterial) -> Self {
        Self {
            node_id,
            version,
            key,
            key_type: KeyType::from_node_id(node_id),
        }
    }
}

impl fmt::Display for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} Key 0x{:04X} (v{})",
            self.key_type, self.node_id, self.version
        )
    }
}
