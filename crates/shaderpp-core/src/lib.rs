//! Recursive `#include` preprocessor for shader sources.
//!
//! [`Preprocessor`] flattens a root file into a single string, substituting
//! every `#include "path"` / `#include <path>` line with the expanded text of
//! the included file followed by a `#line` marker, so the shader compiler can
//! report diagnostics against original line numbers.

pub mod cache;
pub mod config;
pub mod directive;
pub mod errors;
pub mod fs;
pub mod preprocessor;
pub mod resolver;

pub use cache::{CacheEntry, IncludedFile, SourceCache};
pub use config::{ConfigOverrides, PreprocessorConfig};
pub use errors::{ConfigError, PreprocessError, Result};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use preprocessor::{Preprocessed, Preprocessor};
pub use resolver::IncludeResolver;
