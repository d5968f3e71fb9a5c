//! Transceiver abstraction for FeliCa Standard tags.
//!
//! This crate defines the two capabilities the read engine consumes but does
//! not implement:
//!
//! - [`FelicaTag`]: the command set of a FeliCa Standard tag (polling,
//!   directory search, key-version queries, plain and authenticated reads,
//!   mutual authentication).
//! - [`KeyDeriver`]: derivation of group and user service keys from a key
//!   chain.
//!
//! # Design Philosophy
//!
//! - **Blocking**: every call blocks until the exchange with the card
//!   completes. There is no async runtime.
//! - **Exclusive**: methods take `&mut self`, so only one exchange can be in
//!   flight per tag.
//! - **Error-aware**: every operation returns [`Result<T>`], and
//!   [`TagError::CommandError`] marks the card's "no more data" answer.
//!
//! # Example
//!
//! ```
//! use felica_hardware::mock::{CardImage, MockKeyDeriver, MockTag};
//! use felica_hardware::{FelicaTag, KeyDeriver};
//!
//! let image = CardImage::from_json(r#"{
//!     "systems": [{
//!         "system_code": 3,
//!         "idm": "012E4CD300000001",
//!         "pmm": "100B4B428485D0FF",
//!         "directory": [{"area": {"start": 0, "end": 65534}}, {"service": 4104}],
//!         "blocks": {"4104": ["000102030405060708090a0b0c0d0e0f"]}
//!     }]
//! }"#).unwrap();
//!
//! let mut tag = MockTag::new(image);
//! let keys = MockKeyDeriver::new()
//!     .generate_service_keys(&[0x11; 8], &[&[0x22; 8]], &[&[0x33; 8]])
//!     .unwrap();
//!
//! tag.mutual_authentication(&[0x0000], &[0x1008], &keys).unwrap();
//! assert_eq!(tag.read_blocks(0, 0).unwrap().len(), 16);
//! ```
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides [`MockTag`](mock::MockTag), which replays a
//! serializable [`CardImage`](mock::CardImage), and
//! [`MockKeyDeriver`](mock::MockKeyDeriver).

pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

pub use error::{Result, TagError};
pub use traits::{FelicaTag, KeyDeriver};
pub use types::{AuthIdentity, DirectoryEntry, PollingResponse, SessionKeys};
