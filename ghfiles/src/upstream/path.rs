//! Repository paths for uploaded files.
//!
//! A file name always becomes exactly one path segment below the configured folder. Anything
//! that could address a different location (separators, dot segments, control characters) is
//! refused before a request is built.

use std::fmt;
use thiserror::Error;

/// Longest file name accepted, in bytes.
pub const MAX_NAME_BYTES: usize = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidFileName {
    #[error("name is empty")]
    Empty,
    #[error("name may not be '.' or '..'")]
    DotSegment,
    #[error("name may not contain '/' or '\\'")]
    Separator,
    #[error("name may not contain control characters")]
    ControlCharacter,
    #[error("name is longer than {MAX_NAME_BYTES} bytes")]
    TooLong,
}

/// Checks that `segment` can be used as a single path component.
pub fn validate_segment(segment: &str) -> Result<(), InvalidFileName> {
    if segment.is_empty() {
        return Err(InvalidFileName::Empty);
    }
    if segment == "." || segment == ".." {
        return Err(InvalidFileName::DotSegment);
    }
    if segment.contains(['/', '\\']) {
        return Err(InvalidFileName::Separator);
    }
    if segment.chars().any(char::is_control) {
        return Err(InvalidFileName::ControlCharacter);
    }
    if segment.len() > MAX_NAME_BYTES {
        return Err(InvalidFileName::TooLong);
    }
    Ok(())
}

/// A file location inside the repository: `folder/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPath {
    folder: String,
    name: String,
}

impl ContentPath {
    /// The folder is trusted (validated with the configuration); the name is not.
    pub fn new(folder: &str, name: &str) -> Result<Self, InvalidFileName> {
        validate_segment(name)?;
        Ok(Self {
            folder: folder.to_string(),
            name: name.to_string(),
        })
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unencoded segments, folder first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.folder.split('/').chain(std::iter::once(self.name.as_str()))
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.folder, self.name)
    }
}
