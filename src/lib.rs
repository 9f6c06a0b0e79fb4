//! Path containment and JSON path sanitization.
//!
//! [`resolver`] proves a single untrusted path string stays inside a base
//! directory once every symlink is followed. [`sanitizer`] finds path-bearing
//! strings anywhere in a JSON document, runs each through the resolver and
//! writes the accepted ones back into a clone, reporting every decision.

pub mod config;
pub mod errors;
pub mod location;
pub mod logging;
pub mod resolver;
pub mod sanitizer;


pub use errors::{ErrorKind, Rejection, SanitizeError};
pub use location::{Location, Step};
pub use resolver::{BaseDir, ResolvedPath};
pub use sanitizer::report::{SanitizationReport, ValidationOutcome};
pub use sanitizer::{sanitize, OutputForm, SanitizeOptions, Sanitizer};
