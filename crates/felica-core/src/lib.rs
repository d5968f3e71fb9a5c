pub mod constants;
pub mod error;
pub mod key;
pub mod result;
pub mod types;

pub use error::{Error, Result};
pub use key::{KeyMaterial, KeyRecord, KeyType};
pub use result::{
    AuthStatus, Block, KeyVersion, KeyVersions, ServiceResult, UsedKeys, UsedKeysBuilder,
};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
