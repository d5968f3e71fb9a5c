//! Mock implementations for testing and card-image replay.
//!
//! Nothing here talks to a radio: [`MockTag`] answers from a [`CardImage`]
//! and [`MockKeyDeriver`] folds keys with XOR.

pub mod deriver;
pub mod image;
pub mod tag;

pub use deriver::MockKeyDeriver;
pub use image::{CardImage, NodeVersion, SystemImage};
pub use tag::{MockTag, TagCall};
