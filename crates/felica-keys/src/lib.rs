//! Key table for FeliCa card sessions.
//!
//! Raw key rows come from a [`KeySource`] (a CSV file in practice) and are
//! grouped per system code into a [`KeyMap`]. [`KeyTable`] reads the source
//! once per system code and hands out shared, immutable maps for the rest of
//! the session.
//!
//! Loading never fails hard: a missing file or a malformed row is logged as
//! a warning and the session continues with an empty map.

pub mod error;
pub mod source;
pub mod table;

pub use error::{KeyTableError, KeyTableResult};
pub use source::{CsvKeySource, KeyRow, KeySource, MemoryKeySource, parse_rows};
pub use table::{KeyMap, KeyTable};
