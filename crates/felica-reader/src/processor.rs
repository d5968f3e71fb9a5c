//! Processing of one service group.

use crate::auth::Authenticator;
use crate::blocks::{read_authenticated, read_without_encryption};
use felica_core::{Area, AuthStatus, ServiceCode, ServiceGroup, ServiceResult, UsedKeys};
use felica_hardware::{FelicaTag, KeyDeriver};
use felica_keys::KeyMap;
use std::time::Instant;
use tracing::debug;

/// Which member of a group is read, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPlan {
    Plain(ServiceCode),
    Authenticated(ServiceCode),
}

impl ReadPlan {
    /// Pick the member to read.
    ///
    /// The last member readable without authentication wins; if there is
    /// none, the first member is authenticated.
    ///
    /// # Examples
    ///
    /// ```
    /// use felica_core::{ServiceCode, ServiceGroup};
    /// use felica_reader::ReadPlan;
    ///
    /// let group = ServiceGroup::new(vec![
    ///     ServiceCode::new(0x1008),
    ///     ServiceCode::new(0x1009),
    ///     ServiceCode::new(0x100B),
    /// ]).unwrap();
    /// assert_eq!(ReadPlan::for_group(&group), ReadPlan::Plain(ServiceCode::new(0x100B)));
    /// ```
    pub fn for_group(group: &ServiceGroup) -> Self {
        let mut plain = group.iter().filter(|code| !code.requires_authentication());
        match plain.next_back() {
            Some(&code) => Self::Plain(code),
            None => Self::Authenticated(group.first()),
        }
    }

    pub fn service(&self) -> ServiceCode {
        match self {
            Self::Plain(code) | Self::Authenticated(code) => *code,
        }
    }
}

/// Reads service groups of one system.
pub struct GroupProcessor<'a, T: ?Sized, D: ?Sized> {
    tag: &'a mut T,
    authenticator: Authenticator<'a, D>,
    areas: &'a [Area],
}

impl<'a, T, D> GroupProcessor<'a, T, D>
where
    T: FelicaTag + ?Sized,
    D: KeyDeriver + ?Sized,
{
    pub fn new(tag: &'a mut T, deriver: &'a D, keys: &'a KeyMap, areas: &'a [Area]) -> Self {
        Self {
            tag,
            authenticator: Authenticator::new(deriver, keys),
            areas,
        }
    }

    /// Process one group. Always yields a result, timed from start to end.
    pub fn process(&mut self, group: &ServiceGroup) -> ServiceResult {
        let start = Instant::now();
        let plan = ReadPlan::for_group(group);
        debug!("Processing {} as {:?}", group, plan);

        let mut result = match plan {
            ReadPlan::Plain(code) => self.read_plain(group, code),
            ReadPlan::Authenticated(code) => self.read_with_authentication(group, code),
        };

        result.processing_time = start.elapsed();
        result
    }

    fn read_plain(&mut self, group: &ServiceGroup, code: ServiceCode) -> ServiceResult {
        let (blocks, messages, success) = match read_without_encryption(&mut *self.tag, code) {
            Ok(blocks) => (blocks, Vec::new(), true),
            Err(e) => (
                Vec::new(),
                vec![format!("Failed to read without authentication: {e}")],
                false,
            ),
        };

        ServiceResult {
            service_codes: group.clone(),
            blocks,
            messages,
            success,
            processing_time: Default::default(),
            used_keys: UsedKeys::unauthenticated(),
        }
    }

    fn read_with_authentication(
        &mut self,
        group: &ServiceGroup,
        code: ServiceCode,
    ) -> ServiceResult {
        let outcome = self
            .authenticator
            .authenticate(&mut *self.tag, code, self.areas);
        let mut messages = outcome.messages;

        if outcome.status != AuthStatus::Successful {
            return ServiceResult {
                service_codes: group.clone(),
                blocks: Vec::new(),
                messages,
                success: false,
                processing_time: Default::default(),
                used_keys: outcome.used_keys,
            };
        }

        let (blocks, success) = match read_authenticated(&mut *self.tag) {
            Ok(blocks) => (blocks, true),
            Err(e) => {
                messages.push(format!("Failed to read blocks: {e}"));
                (Vec::new(), false)
            }
        };

        ServiceResult {
            service_codes: group.clone(),
            blocks,
            messages,
            success,
            processing_time: Default::default(),
            used_keys: outcome.used_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use felica_core::{KeyMaterial, KeyRecord};
    use felica_hardware::mock::{CardImage, MockKeyDeriver, MockTag, TagCall};
    use rstest::rstest;

    fn group(values: &[u16]) -> ServiceGroup {
        ServiceGroup::new(values.iter().copied().map(ServiceCode::new).collect()).unwrap()
    }

    fn tag() -> MockTag {
        MockTag::new(
            CardImage::from_json(
                r#"{"systems": [{
                    "system_code": 3,
                    "idm": "0000000000000000",
                    "pmm": "0000000000000000",
                    "blocks": {
                        "4104": ["000102030405060708090a0b0c0d0e0f"],
                        "4107": ["000102030405060708090a0b0c0d0e0f"],
                        "4168": [
                            "000102030405060708090a0b0c0d0e0f",
                            "101112131415161718191a1b1c1d1e1f"
                        ]
                    }
                }]}"#,
            )
            .unwrap(),
        )
    }

    fn keys() -> KeyMap {
        KeyMap::from_records(
            [0xFFFF, 0x0000, 0x1048]
                .into_iter()
                .map(|node| KeyRecord::new(node, 1, KeyMaterial::new(vec![0x5A; 8]))),
        )
    }

    const AREAS: [Area; 1] = [Area::new(0x0000, 0xFFFE)];

    #[rstest]
    #[case(&[0x100B], ReadPlan::Plain(ServiceCode::new(0x100B)))]
    #[case(&[0x1008], ReadPlan::Authenticated(ServiceCode::new(0x1008)))]
    #[case(&[0x1009, 0x100B], ReadPlan::Plain(ServiceCode::new(0x100B)))]
    #[case(&[0x100B, 0x1008], ReadPlan::Plain(ServiceCode::new(0x100B)))]
    #[case(&[0x100B, 0x1009, 0x1008], ReadPlan::Plain(ServiceCode::new(0x1009)))]
    #[case(&[0x1048, 0x104A], ReadPlan::Authenticated(ServiceCode::new(0x1048)))]
    fn test_read_plan(#[case] members: &[u16], #[case] expected: ReadPlan) {
        assert_eq!(ReadPlan::for_group(&group(members)), expected);
    }

    #[test]
    fn test_plain_group() {
        let mut tag = tag();
        let keys = keys();
        let deriver = MockKeyDeriver::new();
        let mut processor = GroupProcessor::new(&mut tag, &deriver, &keys, &AREAS);

        let result = processor.process(&group(&[0x1008, 0x100B]));

        assert!(result.success);
        assert_eq!(result.block_count(), 1);
        assert_eq!(result.used_keys.status(), AuthStatus::None);
        assert!(!result.used_keys.authentication_required());
    }

    #[test]
    fn test_authenticated_group() {
        let mut tag = tag();
        let keys = keys();
        let deriver = MockKeyDeriver::new();
        let mut processor = GroupProcessor::new(&mut tag, &deriver, &keys, &AREAS);

        let result = processor.process(&group(&[0x1048, 0x104A]));

        assert!(result.success);
        assert_eq!(result.block_count(), 2);
        assert_eq!(result.used_keys.status(), AuthStatus::Successful);
        assert_eq!(result.used_keys.all_keys().count(), 3);
        assert!(tag.calls().contains(&TagCall::MutualAuthentication {
            areas: vec![0x0000],
            services: vec![0x1048]
        }));
    }

    #[test]
    fn test_missing_keys_group() {
        let mut tag = tag();
        let keys = KeyMap::default();
        let deriver = MockKeyDeriver::new();
        let mut processor = GroupProcessor::new(&mut tag, &deriver, &keys, &AREAS);

        let result = processor.process(&group(&[0x1008]));

        assert!(!result.success);
        assert_eq!(result.used_keys.status(), AuthStatus::FailedMissingKeys);
        assert_eq!(result.messages, vec!["System key (0xFFFF) not found"]);
    }

    #[test]
    fn test_plain_read_failure_is_recorded() {
        let mut tag = tag().with_failing_reads(0x100B);
        let keys = keys();
        let deriver = MockKeyDeriver::new();
        let mut processor = GroupProcessor::new(&mut tag, &deriver, &keys, &AREAS);

        let result = processor.process(&group(&[0x100B]));

        assert!(!result.success);
        assert_eq!(result.block_count(), 0);
        assert_eq!(
            result.messages,
            vec![
                "Failed to read without authentication: Communication error: RF field lost",
            ]
        );
    }

    #[test]
    fn test_authenticated_read_failure_keeps_auth_status() {
        let mut tag = tag().with_failing_reads(0x1048);
        let keys = keys();
        let deriver = MockKeyDeriver::new();
        let mut processor = GroupProcessor::new(&mut tag, &deriver, &keys, &AREAS);

        let result = processor.process(&group(&[0x1048]));

        assert!(!result.success);
        assert_eq!(result.used_keys.status(), AuthStatus::Successful);
        assert_eq!(
            result.messages.last().unwrap(),
            "Failed to read blocks: Communication error: RF field lost"
        );
    }
}
