//! Processing order: groups readable without authentication go first.

use felica_core::ServiceGroup;

/// Stable partition of service groups into the two processing buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingOrder {
    /// Groups with at least one member readable without authentication.
    pub no_auth: Vec<ServiceGroup>,

    /// Groups whose members all require authentication.
    pub auth: Vec<ServiceGroup>,
}

impl ProcessingOrder {
    /// Total number of groups.
    pub fn len(&self) -> usize {
        self.no_auth.len() + self.auth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.no_auth.is_empty() && self.auth.is_empty()
    }

    /// Groups in processing order: `no_auth`, then `auth`.
    pub fn iter(&self) -> impl Iterator<Item = &ServiceGroup> {
        self.no_auth.iter().chain(self.auth.iter())
    }
}

/// Split `groups` into [`ProcessingOrder`] buckets, keeping relative order.
pub fn optimize_processing_order(groups: &[ServiceGroup]) -> ProcessingOrder {
    let (no_auth, auth): (Vec<_>, Vec<_>) = groups
        .iter()
        .cloned()
        .partition(ServiceGroup::has_no_auth_member);

    ProcessingOrder { no_auth, auth }
}
