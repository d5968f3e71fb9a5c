//! Card directory walk.

use crate::error::Result;
use felica_core::{Area, ServiceCode, constants::MAX_DISCOVERY_INDEX};
use felica_hardware::{DirectoryEntry, FelicaTag};
use tracing::debug;

/// Areas and services of one system, in the card's enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardStructure {
    pub areas: Vec<Area>,
    pub services: Vec<ServiceCode>,
}

/// Walk the directory with indices 0, 1, 2, ... until the card reports no
/// entry, or the index space is exhausted.
///
/// Order is preserved as returned: grouping depends on the card's native
/// order.
///
/// # Errors
/// A transceiver failure is returned as is; the walk is never retried.
pub fn discover<T: FelicaTag + ?Sized>(tag: &mut T) -> Result<CardStructure> {
    let mut structure = CardStructure::default();

    for index in (0..MAX_DISCOVERY_INDEX).filter_map(|i| u16::try_from(i).ok()) {
        match tag.search_service_code(index)? {
            None => break,
            Some(DirectoryEntry::Service(code)) => structure.services.push(ServiceCode::new(code)),
            Some(DirectoryEntry::Area { start, end }) => {
                structure.areas.push(Area::new(start, end))
            }
        }
    }

    debug!(
        "Discovered {} areas and {} services",
        structure.areas.len(),
        structure.services.len()
    );
    Ok(structure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use felica_hardware::mock::{CardImage, MockTag};
    use felica_hardware::{AuthIdentity, PollingResponse, SessionKeys, TagError};

    /// Tag whose directory never runs out of services.
    #[derive(Default)]
    struct EndlessDirectory {
        searches: usize,
    }

    impl FelicaTag for EndlessDirectory {
        fn product(&self) -> String {
            "endless directory".to_string()
        }

        fn request_system_code(&mut self) -> felica_hardware::Result<Vec<u16>> {
            Ok(vec![0x0003])
        }

        fn polling(&mut self, _system_code: u16) -> felica_hardware::Result<PollingResponse> {
            Err(TagError::unsupported("polling"))
        }

        fn search_service_code(
            &mut self,
            index: u16,
        ) -> felica_hardware::Result<Option<DirectoryEntry>> {
            self.searches += 1;
            Ok(Some(DirectoryEntry::Service(index)))
        }

        fn request_service(&mut self, _nodes: &[u16]) -> felica_hardware::Result<Vec<u16>> {
            Err(TagError::unsupported("request_service"))
        }

        fn request_service_v2(
            &mut self,
            _nodes: &[u16],
        ) -> felica_hardware::Result<Vec<(u16, Option<u16>)>> {
            Err(TagError::unsupported("request_service_v2"))
        }

        fn read_without_encryption(
            &mut self,
            _service: u16,
            _block: u16,
        ) -> felica_hardware::Result<Vec<u8>> {
            Err(TagError::unsupported("read_without_encryption"))
        }

        fn read_blocks(
            &mut self,
            _service_index: u8,
            _block: u16,
        ) -> felica_hardware::Result<Vec<u8>> {
            Err(TagError::unsupported("read_blocks"))
        }

        fn mutual_authentication(
            &mut self,
            _areas: &[u16],
            _services: &[u16],
            _keys: &SessionKeys,
        ) -> felica_hardware::Result<AuthIdentity> {
            Err(TagError::unsupported("mutual_authentication"))
        }

        fn reset_authentication(&mut self) -> felica_hardware::Result<()> {
            Ok(())
        }
    }

    fn tag(directory: &str) -> MockTag {
        let json = format!(
            r#"{{"systems": [{{
                "system_code": 3,
                "idm": "0000000000000000",
                "pmm": "0000000000000000",
                "directory": {directory}
            }}]}}"#
        );
        MockTag::new(CardImage::from_json(&json).unwrap())
    }

    #[test]
    fn test_discover_keeps_native_order() {
        let mut tag = tag(
            r#"[
                {"area": {"start": 0, "end": 65534}},
                {"service": 4363},
                {"area": {"start": 64, "end": 127}},
                {"service": 4104},
                {"service": 4107}
            ]"#,
        );

        let structure = discover(&mut tag).unwrap();
        assert_eq!(
            structure.areas,
            vec![Area::new(0x0000, 0xFFFE), Area::new(0x0040, 0x007F)]
        );
        assert_eq!(
            structure.services,
            vec![
                ServiceCode::new(0x110B),
                ServiceCode::new(0x1008),
                ServiceCode::new(0x100B)
            ]
        );
    }

    #[test]
    fn test_discover_empty_directory() {
        let mut tag = tag("[]");
        assert_eq!(discover(&mut tag).unwrap(), CardStructure::default());
    }

    #[test]
    fn test_discover_stops_at_index_space_end() {
        let mut tag = EndlessDirectory::default();

        let structure = discover(&mut tag).unwrap();
        assert_eq!(tag.searches, 65536);
        assert_eq!(structure.services.len(), 65536);
        assert_eq!(structure.services.last(), Some(&ServiceCode::new(0xFFFF)));
        assert!(structure.areas.is_empty());
    }
}
