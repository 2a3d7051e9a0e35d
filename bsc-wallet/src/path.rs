//! BIP-32 derivation path parsing.
//!
//! Paths use the textual form `m/44'/60'/0'/0/0`: the leading `m` denotes the
//! master key, every later segment is a base-10 index, and a trailing `'`
//! marks a hardened segment.

use std::fmt;
use std::str::FromStr;

use bip32::ChildNumber;

use crate::error::{Error, Result};

/// Offset added to a hardened segment's index.
pub const HARDENED_OFFSET: u32 = 1 << 31;

/// The master marker that must open every path.
pub const MASTER_MARKER: &str = "m";

/// Marker suffix of a hardened segment.
pub const HARDENED_MARKER: char = '\'';

/// Default BIP-44 path for the first EVM account.
pub const DEFAULT_PATH: &str = "m/44'/60'/0'/0/0";

/// One step of a derivation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathSegment {
    /// Index within its range, always below [`HARDENED_OFFSET`].
    pub index: u32,
    /// Whether the step uses hardened derivation.
    pub hardened: bool,
}

impl PathSegment {
    /// A non-hardened segment.
    #[must_use]
    pub const fn normal(index: u32) -> Self {
        Self {
            index,
            hardened: false,
        }
    }

    /// A hardened segment.
    #[must_use]
    pub const fn hardened(index: u32) -> Self {
        Self {
            index,
            hardened: true,
        }
    }

    /// The raw BIP-32 child index, offset into the hardened range if needed.
    #[must_use]
    pub const fn raw_index(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }

    /// Convert into a [`bip32::ChildNumber`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPathSegment`] if the index does not fit below
    /// the hardened offset.
    pub fn child_number(&self) -> Result<ChildNumber> {
        ChildNumber::new(self.index, self.hardened)
            .map_err(|_| Error::invalid_segment(self.to_string()))
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)?;
        if self.hardened {
            write!(f, "{HARDENED_MARKER}")?;
        }
        Ok(())
    }
}

impl FromStr for PathSegment {
    type Err = Error;

    fn from_str(segment: &str) -> Result<Self> {
        let (digits, hardened) = segment
            .strip_suffix(HARDENED_MARKER)
            .map_or((segment, false), |rest| (rest, true));

        // `u32::from_str` accepts a leading '+', which is not a valid index.
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_segment(digits));
        }

        let index: u32 = digits
            .parse()
            .map_err(|_| Error::invalid_segment(digits))?;
        if index >= HARDENED_OFFSET {
            return Err(Error::invalid_segment(digits));
        }

        Ok(Self { index, hardened })
    }
}

/// An ordered list of derivation steps below the master key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    segments: Vec<PathSegment>,
}

impl DerivationPath {
    /// The path to the master key itself (`m`).
    #[must_use]
    pub const fn master() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Build a path from explicit segments.
    #[must_use]
    pub const fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// BIP-44 EVM path `m/44'/60'/{account}'/0/{index}`.
    #[must_use]
    pub fn bip44(account: u32, index: u32) -> Self {
        Self::from_segments(vec![
            PathSegment::hardened(44),
            PathSegment::hardened(60),
            PathSegment::hardened(account),
            PathSegment::normal(0),
            PathSegment::normal(index),
        ])
    }

    /// The segments in derivation order.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of derivation steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the bare master path.
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.segments.is_empty()
    }

    /// Alias for [`is_master`](Self::is_master).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_master()
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASTER_MARKER)?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(path: &str) -> Result<Self> {
        let mut parts = path.split('/');

        match parts.next() {
            Some(MASTER_MARKER) => {}
            Some(other) => return Err(Error::invalid_segment(other)),
            None => return Err(Error::invalid_segment(path)),
        }

        let segments = parts.map(str::parse).collect::<Result<Vec<_>>>()?;
        Ok(Self { segments })
    }
}
