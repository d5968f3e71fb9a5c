//! Results produced by the read engine.
//!
//! These types are the hand-off point to the presentation layer: one
//! [`ServiceResult`] per service group, the keys that were consumed while
//! authenticating it, and the key versions reported by the card.

use crate::{
    constants::{BLOCK_SIZE, NO_KEY_VALUE},
    key::KeyRecord,
    types::{Area, ServiceCode, ServiceGroup, SystemCode},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Outcome of the authentication step of one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// No authentication was needed.
    #[default]
    None,

    /// Mutual authentication succeeded.
    Successful,

    /// A required key (or the containing area) was not available.
    FailedMissingKeys,

    /// Key derivation or the handshake itself failed.
    FailedError,
}

impl AuthStatus {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FailedMissingKeys | Self::FailedError)
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::None => write!(f, "No authentication required"),
            Self::Successful => write!(f, "Successful"),
            Self::FailedMissingKeys => write!(f, "Failed - Missing required keys"),
            Self::FailedError => write!(f, "Failed - Authentication error"),
        }
    }
}

/// Keys consumed while processing one group.
///
/// Built once through [`UsedKeysBuilder`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsedKeys {
    system_key: Option<KeyRecord>,
    area_keys: Vec<KeyRecord>,
    service_keys: Vec<KeyRecord>,
    authentication_required: bool,
    status: AuthStatus,
}

impl UsedKeys {
    #[must_use]
    pub fn builder() -> UsedKeysBuilder {
        UsedKeysBuilder::default()
    }

    /// Keys for a read that needed no authentication.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn system_key(&self) -> Option<&KeyRecord> {
        self.system_key.as_ref()
    }

    /// Area keys, outermost first.
    #[must_use]
    pub fn area_keys(&self) -> &[KeyRecord] {
        &self.area_keys
    }

    #[must_use]
    pub fn service_keys(&self) -> &[KeyRecord] {
        &self.service_keys
    }

    #[must_use]
    pub fn authentication_required(&self) -> bool {
        self.authentication_required
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        self.status
    }

    /// System key, then area keys, then service keys.
    pub fn all_keys(&self) -> impl Iterator<Item = &KeyRecord> {
        self.system_key
            .iter()
            .chain(self.area_keys.iter())
            .chain(self.service_keys.iter())
    }
}

/// Builder for [`UsedKeys`].
///
/// # Examples
///
/// ```
/// use felica_core::{AuthStatus, KeyMaterial, KeyRecord, UsedKeys};
///
/// let used = UsedKeys::builder()
///     .authentication_required(true)
///     .system_key(KeyRecord::new(0xFFFF, 1, KeyMaterial::new(vec![0; 8])))
///     .service_key(KeyRecord::new(0x1008, 1, KeyMaterial::new(vec![1; 8])))
///     .status(AuthStatus::Successful)
///     .build();
///
/// assert_eq!(used.all_keys().count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct UsedKeysBuilder {
    inner: UsedKeys,
}

impl UsedKeysBuilder {
    pub fn system_key(mut self, key: KeyRecord) -> Self {
        self.inner.system_key = Some(key);
        self
    }

    pub fn area_key(mut self, key: KeyRecord) -> Self {
        self.inner.area_keys.push(key);
        self
    }

    pub fn service_key(mut self, key: KeyRecord) -> Self {
        self.inner.service_keys.push(key);
        self
    }

    pub fn authentication_required(mut self, required: bool) -> Self {
        self.inner.authentication_required = required;
        self
    }

    pub fn status(mut self, status: AuthStatus) -> Self {
        self.inner.status = status;
        self
    }

    #[must_use]
    pub fn build(self) -> UsedKeys {
        self.inner
    }
}

/// One 16-byte block read from a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub number: u16,
    pub data: [u8; BLOCK_SIZE],
}

impl Block {
    /// Take the first block of a response.
    ///
    /// Returns `None` if `bytes` is shorter than one block.
    #[must_use]
    pub fn from_response(number: u16, bytes: &[u8]) -> Option<Self> {
        let data: [u8; BLOCK_SIZE] = bytes.get(..BLOCK_SIZE)?.try_into().ok()?;
        Some(Self { number, data })
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Block {:04X}: {}", self.number, hex::encode(self.data))
    }
}

/// Result of processing one service group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResult {
    pub service_codes: ServiceGroup,
    pub blocks: Vec<Block>,
    pub messages: Vec<String>,
    pub success: bool,
    pub processing_time: Duration,
    pub used_keys: UsedKeys,
}

impl ServiceResult {
    /// Lowest service code of the group; results are sorted by this.
    #[must_use]
    pub fn primary_service_code(&self) -> ServiceCode {
        self.service_codes.primary()
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Block lines followed by the message trail.
    #[must_use]
    pub fn output_lines(&self) -> Vec<String> {
        self.blocks
            .iter()
            .map(ToString::to_string)
            .chain(self.messages.iter().cloned())
            .collect()
    }
}

/// Key version reported by the card for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyVersion {
    /// The query failed or the node was never queried.
    #[default]
    None,

    /// Single tag from the legacy Request Service command.
    Legacy(u16),

    /// AES and DES tags from Request Service v2.
    Dual { aes: u16, des: Option<u16> },
}

impl KeyVersion {
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// AES key version, if the card reported one.
    #[must_use]
    pub fn aes(&self) -> Option<u16> {
        match self {
            Self::Dual { aes, .. } if *aes != NO_KEY_VALUE => Some(*aes),
            _ => None,
        }
    }

    /// DES key version, if the card reported one.
    #[must_use]
    pub fn des(&self) -> Option<u16> {
        match self {
            Self::Legacy(tag) if *tag != NO_KEY_VALUE => Some(*tag),
            Self::Dual { des: Some(tag), .. } if *tag != NO_KEY_VALUE => Some(*tag),
            _ => None,
        }
    }
}

/// Key versions for the system, its areas and its services.
///
/// Nodes whose query failed are absent; lookups then return
/// [`KeyVersion::None`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyVersions {
    pub system: BTreeMap<SystemCode, KeyVersion>,
    pub areas: BTreeMap<Area, KeyVersion>,
    pub services: BTreeMap<ServiceCode, KeyVersion>,
}

impl KeyVersions {
    #[must_use]
    pub fn system_version(&self, system_code: SystemCode) -> KeyVersion {
        self.system.get(&system_code).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn area_version(&self, area: &Area) -> KeyVersion {
        self.areas.get(area).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn service_version(&self, code: ServiceCode) -> KeyVersion {
        self.services.get(&code).copied().unwrap_or_default()
    }
}
