pub mod auth;
pub mod blocks;
pub mod discovery;
pub mod error;
pub mod grouping;
pub mod hierarchy;
pub mod key_versions;
pub mod ordering;
pub mod processor;
pub mod session;
pub mod sink;

pub use auth::{AuthOutcome, Authenticator, containing_areas, requires_authentication};
pub use blocks::{read_authenticated, read_without_encryption};
pub use discovery::{CardStructure, discover};
pub use error::{ReaderError, Result};
pub use grouping::group_overlapped_services;
pub use hierarchy::{AreaHierarchy, AreaNode};
pub use key_versions::resolve_key_versions;
pub use ordering::{ProcessingOrder, optimize_processing_order};
pub use processor::{GroupProcessor, ReadPlan};
pub use session::{SessionAborted, SystemPlan, SystemReport, SystemSession};
pub use sink::{NullSink, ReportSink, TracingSink};
