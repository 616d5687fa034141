pub mod checks;
pub mod config;
pub mod error;
pub mod format;
pub mod header;
pub mod join;
pub mod names;
pub mod normalize;
pub mod params;
pub mod pipeline;
pub mod raw;
pub mod reduce;
pub mod reshape;
pub mod significance;
pub mod store;
pub mod table;

pub use error::{ArchiveError, Result};
