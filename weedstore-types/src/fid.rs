//! File identifiers.
//!
//! A file identifier (fid) addresses a single stored blob. Its wire form is
//! `<volumeId>,<key><cookie>`, for example `3,01637037d6`:
//!
//! - The **volume id** before the comma is a decimal number. It is the part the master uses to
//!   resolve replica locations.
//! - The **key and cookie** after the comma are opaque to clients.
//!
//! When a batch of several files is assigned at once, the master returns one fid and the
//! individual members are addressed as `<fid>_<index>`, see [`Fid::part`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Fid`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidFidError {
    /// The fid does not contain the `,` between volume id and key.
    #[error("file id {0:?} is missing the ',' separator")]
    MissingSeparator(String),

    /// The volume id is empty or not a decimal number.
    #[error("file id {0:?} has an invalid volume id")]
    InvalidVolume(String),

    /// Nothing follows the separator.
    #[error("file id {0:?} has an empty key")]
    EmptyKey(String),

    /// The key contains a character that cannot appear in a fid.
    #[error("invalid character {0:?} at byte position {1} in file id")]
    InvalidChar(char, usize),
}

/// A validated file identifier.
///
/// See the [module docs](self) for the format.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fid(String);

impl Fid {
    /// Parses and validates a fid in its wire form.
    pub fn parse(raw: &str) -> Result<Self, InvalidFidError> {
        let Some((volume, key)) = raw.split_once(',') else {
            return Err(InvalidFidError::MissingSeparator(raw.to_owned()));
        };

        if volume.is_empty() || !volume.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidFidError::InvalidVolume(raw.to_owned()));
        }
        if key.is_empty() {
            return Err(InvalidFidError::EmptyKey(raw.to_owned()));
        }

        let offset = volume.len() + 1;
        if let Some((pos, c)) = key
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        {
            return Err(InvalidFidError::InvalidChar(c, offset + pos));
        }

        Ok(Self(raw.to_owned()))
    }

    /// Returns the wire form of this fid.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the volume id, the part before the `,`.
    pub fn volume_id(&self) -> &str {
        self.split().0
    }

    /// Returns the key and cookie, the part after the `,`.
    pub fn file_key(&self) -> &str {
        self.split().1
    }

    /// Returns the fid of the batch member at `index`, `<fid>_<index>`.
    pub fn part(&self, index: usize) -> Fid {
        Self(format!("{}_{index}", self.0))
    }

    fn split(&self) -> (&str, &str) {
        // Validated on construction.
        self.0.split_once(',').unwrap_or((&self.0, ""))
    }
}

impl FromStr for Fid {
    type Err = InvalidFidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Fid {
    type Error = InvalidFidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Fid {
    type Error = InvalidFidError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Fid> for String {
    fn from(fid: Fid) -> Self {
        fid.0
    }
}

impl AsRef<str> for Fid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fid").field(&self.0).finish()
    }
}
