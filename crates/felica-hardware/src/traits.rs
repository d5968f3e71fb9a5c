//! Capability traits for the transceiver and the session-key primitive.
//!
//! The read engine only ever sees a [`FelicaTag`]: negotiating the tag type
//! and protocol happens before a value implementing this trait exists, so
//! the engine never has to check what kind of tag it was handed.
//!
//! Every method takes `&mut self` because the RF channel is half-duplex;
//! one exchange must finish before the next starts.

use crate::error::Result;
use crate::types::{AuthIdentity, DirectoryEntry, PollingResponse, SessionKeys};

/// A FeliCa Standard tag.
///
/// # Examples
///
/// ```
/// use felica_hardware::mock::{CardImage, MockTag};
/// use felica_hardware::{DirectoryEntry, FelicaTag};
///
/// let image: CardImage = serde_json::from_str(r#"{
///     "systems": [{
///         "system_code": 3,
///         "idm": "012E4CD300000001",
///         "pmm": "0000000000000000",
///         "directory": [{"service": 4107}]
///     }]
/// }"#).unwrap();
///
/// let mut tag = MockTag::new(image);
/// let systems = tag.request_system_code().unwrap();
/// tag.polling(systems[0]).unwrap();
///
/// assert_eq!(
///     tag.search_service_code(0).unwrap(),
///     Some(DirectoryEntry::Service(0x100B))
/// );
/// assert_eq!(tag.search_service_code(1).unwrap(), None);
/// ```
pub trait FelicaTag {
    /// Product name reported by the reader.
    fn product(&self) -> String;

    /// System codes present on the card.
    fn request_system_code(&mut self) -> Result<Vec<u16>>;

    /// Select a system and return its IDm/PMm.
    fn polling(&mut self, system_code: u16) -> Result<PollingResponse>;

    /// Directory entry at `index`, or `None` past the end of the directory.
    fn search_service_code(&mut self, index: u16) -> Result<Option<DirectoryEntry>>;

    /// Legacy key versions, one per node.
    fn request_service(&mut self, nodes: &[u16]) -> Result<Vec<u16>>;

    /// AES and optional DES key versions, one pair per node.
    fn request_service_v2(&mut self, nodes: &[u16]) -> Result<Vec<(u16, Option<u16>)>>;

    /// Read one block of a service that allows unauthenticated reads.
    fn read_without_encryption(&mut self, service: u16, block: u16) -> Result<Vec<u8>>;

    /// Read one block of an authenticated service slot.
    fn read_blocks(&mut self, service_index: u8, block: u16) -> Result<Vec<u8>>;

    /// Mutually authenticate for `services` inside `areas`.
    fn mutual_authentication(
        &mut self,
        areas: &[u16],
        services: &[u16],
        keys: &SessionKeys,
    ) -> Result<AuthIdentity>;

    /// Drop any authenticated session.
    fn reset_authentication(&mut self) -> Result<()>;
}

/// Derives group and user service keys from a key chain.
pub trait KeyDeriver {
    /// Derive session keys from the system key, the area keys (outermost
    /// first) and the service keys.
    fn generate_service_keys(
        &self,
        system_key: &[u8],
        area_keys: &[&[u8]],
        service_keys: &[&[u8]],
    ) -> Result<SessionKeys>;
}
