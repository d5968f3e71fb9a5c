//! Deterministic stand-in for the session-key primitive.

use crate::{
    KeyDeriver,
    error::{Result, TagError},
    types::SessionKeys,
};

/// Key deriver that XOR-folds the key chain.
///
/// The group key is the system key folded with every area key; the user
/// key is the group key folded with every service key. This has none of the
/// properties of the real derivation and exists only so the read engine can
/// be driven without the cipher.
#[derive(Debug, Clone, Default)]
pub struct MockKeyDeriver {
    failure: Option<String>,
}

impl MockKeyDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A deriver whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
        }
    }
}

fn fold(base: &[u8], keys: &[&[u8]]) -> Vec<u8> {
    let mut folded = base.to_vec();
    for key in keys {
        for (i, byte) in key.iter().enumerate() {
            folded[i % base.len()] ^= byte;
        }
    }
    folded
}

impl KeyDeriver for MockKeyDeriver {
    fn generate_service_keys(
        &self,
        system_key: &[u8],
        area_keys: &[&[u8]],
        service_keys: &[&[u8]],
    ) -> Result<SessionKeys> {
        if let Some(message) = &self.failure {
            return Err(TagError::key_derivation(message.clone()));
        }
        if system_key.is_empty() {
            return Err(TagError::key_derivation("system key is empty"));
        }

        let group_key = fold(system_key, area_keys);
        let user_key = fold(&group_key, service_keys);

        Ok(SessionKeys {
            group_key,
            user_key,
        })
    }
}
