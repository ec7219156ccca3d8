//! Protocol versions and version resolution.
//!
//! Version strings are dot-separated numbers. A two-digit minor is read as
//! two components, so `0.81` sits between `0.8` and `0.9` (`0.8.1`).

use std::cmp::Ordering;
use std::fmt;

use tracing::warn;

use crate::error::VersionError;

/// Versions this library knows how to talk to, oldest first.
pub const SUPPORTED_VERSIONS: &[&str] = &["0.64", "0.7", "0.8", "0.81", "0.9", "1.0"];

/// A parsed protocol version.
#[derive(Debug, Clone)]
pub struct ProtocolVersion {
    raw: String,
    parts: Vec<u32>,
}

impl ProtocolVersion {
    /// Parses a version string such as `0.81` or `1.0`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Unparseable`] unless the string is made of
    /// dot-separated numbers.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let trimmed = raw.trim();
        let unparseable = || VersionError::Unparseable(raw.to_string());

        let mut pieces: Vec<&str> = trimmed.split('.').collect();
        if pieces
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(unparseable());
        }

        // 0.81 → 0.8.1
        if pieces.len() == 2 && pieces[1].len() == 2 {
            let minor = pieces[1];
            pieces = vec![pieces[0], &minor[..1], &minor[1..]];
        }

        let parts = pieces
            .iter()
            .map(|p| p.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| unparseable())?;

        Ok(Self {
            raw: trimmed.to_string(),
            parts,
        })
    }

    /// The version as written, e.g. `0.81`.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric components after normalization, e.g. `[0, 8, 1]`.
    pub fn parts(&self) -> &[u32] {
        &self.parts
    }

    fn component(&self, i: usize) -> u32 {
        self.parts.get(i).copied().unwrap_or(0)
    }
}

impl PartialEq for ProtocolVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ProtocolVersion {}

impl PartialOrd for ProtocolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProtocolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The ordered set of supported versions.
#[derive(Debug, Clone)]
pub struct VersionSet {
    versions: Vec<ProtocolVersion>,
}

impl VersionSet {
    /// Builds a set from version strings; they are sorted on the way in.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Unparseable`] for any malformed entry.
    pub fn new<'a>(versions: impl IntoIterator<Item = &'a str>) -> Result<Self, VersionError> {
        let mut versions = versions
            .into_iter()
            .map(ProtocolVersion::parse)
            .collect::<Result<Vec<_>, _>>()?;
        versions.sort();
        versions.dedup();
        Ok(Self { versions })
    }

    /// The versions this library supports.
    pub fn supported() -> Self {
        let versions = SUPPORTED_VERSIONS
            .iter()
            .filter_map(|v| ProtocolVersion::parse(v).ok())
            .collect();
        Self { versions }
    }

    pub fn lowest(&self) -> Option<&ProtocolVersion> {
        self.versions.first()
    }

    pub fn highest(&self) -> Option<&ProtocolVersion> {
        self.versions.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProtocolVersion> {
        self.versions.iter()
    }

    pub fn contains(&self, version: &ProtocolVersion) -> bool {
        self.versions.contains(version)
    }

    /// Resolves a requested version to one this library speaks.
    ///
    /// Supported versions resolve to themselves. Versions newer than the
    /// newest supported one are clamped to it; versions between two
    /// supported ones use the older of the two. Both cases log a warning.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Unparseable`] for malformed input and
    /// [`VersionError::BelowMinimum`] for versions older than every
    /// supported one.
    pub fn resolve(&self, requested: &str) -> Result<ProtocolVersion, VersionError> {
        let wanted = ProtocolVersion::parse(requested)?;

        let below_minimum = || VersionError::BelowMinimum {
            requested: requested.trim().to_string(),
            supported: self.to_string(),
        };

        let nearest = self
            .versions
            .iter()
            .rev()
            .find(|v| **v <= wanted)
            .ok_or_else(below_minimum)?;

        if *nearest != wanted {
            let highest = self.highest().is_some_and(|h| h == nearest);
            if highest {
                warn!(
                    requested = %wanted,
                    using = %nearest,
                    "API version is newer than the newest supported one"
                );
            } else {
                warn!(
                    requested = %wanted,
                    using = %nearest,
                    "API version is not supported, using the nearest older one"
                );
            }
        }

        Ok(nearest.clone())
    }
}

impl fmt::Display for VersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.versions.iter().map(ProtocolVersion::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: &str) -> ProtocolVersion {
        ProtocolVersion::parse(raw).unwrap()
    }

    #[test]
    fn two_digit_minor_is_split() {
        assert_eq!(v("0.81").parts(), &[0, 8, 1]);
        assert_eq!(v("0.64").parts(), &[0, 6, 4]);
        assert_eq!(v("0.9").parts(), &[0, 9]);
        assert_eq!(v("0.9.1").parts(), &[0, 9, 1]);
    }

    #[test]
    fn ordering() {
        assert!(v("0.64") < v("0.7"));
        assert!(v("0.8") < v("0.81"));
        assert!(v("0.81") < v("0.9"));
        assert!(v("0.9") < v("1.0"));
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1.0").as_str(), "1.0");
    }

    #[test]
    fn rejects_garbage() {
        for raw in ["", "abc", "1..0", "v1.0", "1.0-beta", "."] {
            assert!(
                matches!(ProtocolVersion::parse(raw), Err(VersionError::Unparseable(_))),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn resolve_supported_versions() {
        let set = VersionSet::supported();
        for raw in SUPPORTED_VERSIONS {
            assert_eq!(set.resolve(raw).unwrap().as_str(), *raw);
        }
    }

    #[test]
    fn resolve_clamps_newer_versions() {
        let set = VersionSet::supported();
        assert_eq!(set.resolve("5.0").unwrap().as_str(), "1.0");
        assert_eq!(set.resolve("2.4").unwrap().as_str(), "1.0");
        assert_eq!(set.resolve("1.1").unwrap().as_str(), "1.0");
    }

    #[test]
    fn resolve_snaps_to_older_neighbour() {
        let set = VersionSet::supported();
        assert_eq!(set.resolve("0.85").unwrap().as_str(), "0.81");
        assert_eq!(set.resolve("0.75").unwrap().as_str(), "0.7");
    }

    #[test]
    fn resolve_rejects_old_versions() {
        let set = VersionSet::supported();
        let err = set.resolve("0.5").unwrap_err();
        assert_eq!(
            err,
            VersionError::BelowMinimum {
                requested: "0.5".into(),
                supported: "0.64, 0.7, 0.8, 0.81, 0.9, 1.0".into(),
            }
        );
        assert_eq!(
            err.to_string(),
            "invalid API version 0.5, supported versions: 0.64, 0.7, 0.8, 0.81, 0.9, 1.0"
        );
    }

    #[test]
    fn custom_set_is_sorted() {
        let set = VersionSet::new(["0.9", "0.7", "0.9"]).unwrap();
        assert_eq!(set.to_string(), "0.7, 0.9");
        assert_eq!(set.lowest().map(ProtocolVersion::as_str), Some("0.7"));
    }
}
