//! Result type alias for foldersync operations

use crate::Error;

/// Result type alias for foldersync operations
pub type Result<T> = std::result::Result<T, Error>;
