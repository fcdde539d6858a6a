//! Class and package name helpers.
//!
//! Source-level names are dotted (`java.lang.String`). The host runtime's
//! internal form uses slashes (`java/lang/String`); descriptors wrap that
//! form as `Ljava/lang/String;`.

use std::fmt;
use std::path::Path;

use serde::Serialize;

/// A class name split into its package and simple name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedName {
    pub package: Option<String>,
    pub simple: String,
}

impl QualifiedName {
    /// Qualify `simple` with an optional package. An empty package is treated
    /// as the default (unnamed) package.
    pub fn new(package: Option<&str>, simple: impl Into<String>) -> Self {
        QualifiedName {
            package: package.filter(|p| !p.is_empty()).map(str::to_string),
            simple: simple.into(),
        }
    }

    /// Split a dotted name at its last dot.
    pub fn parse(dotted: &str) -> Self {
        match dotted.rsplit_once('.') {
            Some((package, simple)) => QualifiedName::new(Some(package), simple),
            None => QualifiedName::new(None, dotted),
        }
    }

    /// The internal (slash separated) form, e.g. `foo/bar/Baz`.
    pub fn internal_name(&self) -> String {
        to_internal(&self.to_string())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(f, "{}.{}", package, self.simple),
            None => write!(f, "{}", self.simple),
        }
    }
}

/// `java.lang.String` -> `java/lang/String`.
pub fn to_internal(dotted: &str) -> String {
    dotted.replace('.', "/")
}

/// `java/lang/String` -> `java.lang.String`.
pub fn to_dotted(internal: &str) -> String {
    internal.replace('/', ".")
}

/// Derive the implicit top-level class name from a source file name.
///
/// The directory and extension are dropped and each `_`/`-` separated segment
/// is capitalized: `foo/bar/some_class.mirah` -> `SomeClass`.
pub fn classname_from_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    stem.split(['_', '-'])
        .filter(|segment| !segment.is_empty())
        .map(capitalize)
        .collect()
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
