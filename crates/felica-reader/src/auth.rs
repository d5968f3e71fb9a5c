//! Mutual authentication for one service.
//!
//! The key chain for a service is the system key, the keys of every area
//! containing the service (outermost first) and the service key itself.
//! System and service keys are mandatory; a missing area key only produces
//! a warning and the area is left out of the derivation.

use felica_core::{Area, AuthStatus, ServiceCode, UsedKeys};
use felica_hardware::{AuthIdentity, FelicaTag, KeyDeriver};
use felica_keys::KeyMap;
use tracing::{debug, warn};

/// Result of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub status: AuthStatus,
    pub messages: Vec<String>,
    pub used_keys: UsedKeys,
    pub identity: Option<AuthIdentity>,
}

impl AuthOutcome {
    pub fn is_success(&self) -> bool {
        self.status == AuthStatus::Successful
    }

    fn failed(status: AuthStatus, messages: Vec<String>, used_keys: UsedKeys) -> Self {
        Self {
            status,
            messages,
            used_keys,
            identity: None,
        }
    }
}

/// True iff reading `code` needs authentication (LSB clear).
pub fn requires_authentication(code: ServiceCode) -> bool {
    code.requires_authentication()
}

/// Areas containing `code`, outermost first.
pub fn containing_areas(code: ServiceCode, areas: &[Area]) -> Vec<Area> {
    let mut containing: Vec<Area> = areas
        .iter()
        .copied()
        .filter(|area| area.contains_code(code.as_u16()))
        .collect();
    containing.sort_by_key(|area| area.start);
    containing
}

/// Builds key chains and runs mutual authentication against a tag.
pub struct Authenticator<'a, D: ?Sized> {
    deriver: &'a D,
    keys: &'a KeyMap,
}

impl<'a, D: KeyDeriver + ?Sized> Authenticator<'a, D> {
    pub fn new(deriver: &'a D, keys: &'a KeyMap) -> Self {
        Self { deriver, keys }
    }

    /// Authenticate `code` inside `areas`.
    ///
    /// Never fails: every problem is classified into the outcome's status
    /// and described in its messages.
    pub fn authenticate<T: FelicaTag + ?Sized>(
        &self,
        tag: &mut T,
        code: ServiceCode,
        areas: &[Area],
    ) -> AuthOutcome {
        let mut messages = Vec::new();
        let mut used = UsedKeys::builder().authentication_required(true);

        let chain = containing_areas(code, areas);
        if chain.is_empty() {
            messages.push("Service not found in any area".to_string());
            return AuthOutcome::failed(
                AuthStatus::FailedMissingKeys,
                messages,
                used.status(AuthStatus::FailedMissingKeys).build(),
            );
        }

        let Some(system_key) = self.keys.system_key() else {
            messages.push(format!(
                "System key (0x{:04X}) not found",
                felica_core::constants::SYSTEM_KEY_NODE_ID
            ));
            return AuthOutcome::failed(
                AuthStatus::FailedMissingKeys,
                messages,
                used.status(AuthStatus::FailedMissingKeys).build(),
            );
        };
        let Some(service_key) = self.keys.service_key(code) else {
            messages.push(format!("Service key ({code}) not found"));
            return AuthOutcome::failed(
                AuthStatus::FailedMissingKeys,
                messages,
                used.status(AuthStatus::FailedMissingKeys).build(),
            );
        };

        used = used
            .system_key(system_key.clone())
            .service_key(service_key.clone());

        let area_keys = self.keys.area_keys_for_service(code, &chain);
        for area in &chain {
            if self.keys.area_key(area).is_none() {
                warn!("No key for area 0x{:04X}", area.start);
                messages.push(format!("No key for area 0x{:04X}", area.start));
            }
        }
        for key in &area_keys {
            used = used.area_key((*key).clone());
        }

        let area_bytes: Vec<&[u8]> = area_keys.iter().map(|k| k.key.as_bytes()).collect();
        let area_codes: Vec<u16> = chain.iter().map(|area| area.start).collect();

        let result = self
            .deriver
            .generate_service_keys(
                system_key.key.as_bytes(),
                &area_bytes,
                &[service_key.key.as_bytes()],
            )
            .and_then(|session| {
                tag.mutual_authentication(&area_codes, &[code.as_u16()], &session)
            });

        match result {
            Ok(identity) => {
                debug!("Authenticated {}: {}", code, identity);
                AuthOutcome {
                    status: AuthStatus::Successful,
                    messages,
                    used_keys: used.status(AuthStatus::Successful).build(),
                    identity: Some(identity),
                }
            }
            Err(e) => {
                messages.push(format!("Authentication failed: {e}"));
                AuthOutcome::failed(
                    AuthStatus::FailedError,
                    messages,
                    used.status(AuthStatus::FailedError).build(),
                )
            }
        }
    }
}
