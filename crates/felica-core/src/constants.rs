//! Core constants for the FeliCa card structure.
//!
//! This module defines the protocol-level and implementation-level constants
//! shared by the key table, the card walker and the read engine.
//!
//! # Service Code Layout
//!
//! A FeliCa service code is a 16-bit value:
//!
//! ```text
//!  15                 6 5          2 1 0
//! ┌────────────────────┬────────────┬─┬─┐
//! │   service number   │    type    │ │A│
//! └────────────────────┴────────────┴─┴─┘
//! ```
//!
//! - `A` (bit 0) set means the service can be read without authentication.
//! - Bits 2-5 select the service type (random, cyclic, purse).
//! - Everything from bit 4 upwards identifies the logical service used for
//!   overlap grouping.
//!
//! # Usage
//!
//! ```
//! use felica_core::constants::*;
//!
//! let code: u16 = 0x090F;
//! assert_eq!(code & SERVICE_NO_AUTH_BIT, 1);
//! assert_eq!((code >> SERVICE_TYPE_SHIFT) & SERVICE_TYPE_MASK, 0b0011);
//! ```

// ============================================================================
// Key Node Identifiers
// ============================================================================

/// Node identifier of the system key.
///
/// The system key sits at the root of every authentication chain and is
/// always stored under this node id in the key table. Key-version queries for
/// the system also use this sentinel.
pub const SYSTEM_KEY_NODE_ID: u16 = 0xFFFF;

/// Node identifier of the root area key.
pub const ROOT_AREA_KEY_NODE_ID: u16 = 0x0000;

/// Node ids below this threshold are classified as area keys.
///
/// # Examples
///
/// ```
/// use felica_core::constants::AREA_KEY_THRESHOLD;
///
/// assert!(0x0040 < AREA_KEY_THRESHOLD);
/// assert!(0x1008 >= AREA_KEY_THRESHOLD);
/// ```
pub const AREA_KEY_THRESHOLD: u16 = 0x1000;

// ============================================================================
// Batching and Bounds
// ============================================================================

/// Maximum number of node codes in one key-version request.
///
/// The card rejects Request Service commands carrying more than 32 nodes, so
/// key-version resolution splits its work into chunks of this size.
pub const MAX_BATCH_SIZE: usize = 32;

/// Upper bound on blocks read from a single service.
///
/// Block numbers are 16-bit, so this covers the whole block address space.
pub const MAX_BLOCKS: u32 = 0x10000;

/// Upper bound on directory indices visited during discovery.
pub const MAX_DISCOVERY_INDEX: u32 = 0x10000;

/// Size of a FeliCa memory block in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Service slot addressed by authenticated reads.
///
/// Only one service is authenticated per group, so it always occupies the
/// first slot of the authenticated service list.
pub const AUTHENTICATED_SERVICE_INDEX: u8 = 0;

// ============================================================================
// Service Code Bit Fields
// ============================================================================

/// Bit that marks a service as readable without authentication.
pub const SERVICE_NO_AUTH_BIT: u16 = 0x0001;

/// Shift applied before masking the service type bits.
pub const SERVICE_TYPE_SHIFT: u16 = 2;

/// Mask for the service type after shifting.
pub const SERVICE_TYPE_MASK: u16 = 0b1111;

/// Shift that yields the overlap identity of a service code.
pub const SERVICE_OVERLAP_SHIFT: u16 = 4;

/// Shift that yields the service number.
pub const SERVICE_NUMBER_SHIFT: u16 = 6;

/// Mask for the service attribute (low six bits).
pub const SERVICE_ATTRIBUTE_MASK: u16 = 0x3F;

/// Type bits of a purse service (the lowest type bit is an access flag).
pub const SERVICE_PURSE_TYPE: u16 = 0b0100;

/// Type bits of a random-access service.
pub const SERVICE_RANDOM_TYPE: u16 = 0b0010;

/// Type bits of a cyclic service.
pub const SERVICE_CYCLIC_TYPE: u16 = 0b0011;

// ============================================================================
// Access Type Labels
// ============================================================================

/// Access labels for random and cyclic services, indexed by `code & 3`.
pub const RANDOM_CYCLIC_ACCESS_TYPES: [&str; 4] = [
    "write with key",
    "write w/o key",
    "read with key",
    "read w/o key",
];

/// Access labels for purse services, indexed by `code & 7`.
pub const PURSE_ACCESS_TYPES: [&str; 8] = [
    "direct with key",
    "direct w/o key",
    "cashback with key",
    "cashback w/o key",
    "decrement with key",
    "decrement w/o key",
    "read with key",
    "read w/o key",
];

// ============================================================================
// Key Versions
// ============================================================================

/// Key-version tag the card reports for a node with no key of that kind.
pub const NO_KEY_VALUE: u16 = 0xFFFF;
