//! core::version
//!
//! Package versions and channel version math.
//!
//! # Design
//!
//! [`PackageVersion`] is the `major.minor.patch[-identifier]` shape every
//! managed manifest and configuration entry carries. Parsing is strict
//! (build metadata is rejected) and building is the exact inverse, so a
//! version read from disk is rewritten byte-for-byte.
//!
//! Channel transitions are pure functions on the version:
//!
//! - alpha publishes bump into the `alpha` pre-release family and use a
//!   transient `alpha.<YYYYMMDDhhmmss>` identifier for the publication
//!   itself
//! - beta publishes replace the identifier with `beta`, reusing an
//!   already-beta version unchanged
//! - production publishes clear the identifier, bumping the patch only when
//!   there is no identifier left to clear
//!
//! Branch validation for production lives with the channel hooks in
//! [`crate::release::channel`]; this module owns only the version math.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors from version parsing.
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("invalid version `{0}`: expected major.minor.patch[-identifier]")]
    InvalidVersion(String),
}

/// A package version: `major.minor.patch` with an optional pre-release
/// identifier.
///
/// # Invariants
///
/// - `PackageVersion::parse(s)?.build() == s` for every accepted `s`
/// - `pre_release` is never `Some("")`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release: Option<String>,
}

impl PackageVersion {
    /// Create a bare release version with no pre-release identifier.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
        }
    }

    /// Parse a version string.
    ///
    /// Accepts `major.minor.patch` optionally followed by `-identifier`.
    /// Build metadata (`+...`) is rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use convoy::core::version::PackageVersion;
    ///
    /// let v = PackageVersion::parse("1.2.3-alpha").unwrap();
    /// assert_eq!(v.patch, 3);
    /// assert_eq!(v.pre_release.as_deref(), Some("alpha"));
    /// assert_eq!(v.build(), "1.2.3-alpha");
    /// ```
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let parsed =
            semver::Version::parse(s).map_err(|_| VersionError::InvalidVersion(s.to_string()))?;
        if !parsed.build.is_empty() {
            return Err(VersionError::InvalidVersion(s.to_string()));
        }
        let pre_release = if parsed.pre.is_empty() {
            None
        } else {
            Some(parsed.pre.as_str().to_string())
        };
        Ok(Self {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre_release,
        })
    }

    /// Build the version string. Strict inverse of [`PackageVersion::parse`].
    pub fn build(&self) -> String {
        self.to_string()
    }

    /// The pre-release identifier, if any.
    pub fn pre_release(&self) -> Option<&str> {
        self.pre_release.as_deref()
    }

    /// Replace the pre-release identifier.
    pub fn with_pre_release(&self, identifier: impl Into<String>) -> Self {
        Self {
            pre_release: Some(identifier.into()),
            ..self.clone()
        }
    }

    /// Drop the pre-release identifier.
    pub fn without_pre_release(&self) -> Self {
        Self {
            pre_release: None,
            ..self.clone()
        }
    }

    /// True for the alpha family: `alpha` or `alpha.<digits>`.
    pub fn is_alpha(&self) -> bool {
        match self.pre_release.as_deref() {
            Some("alpha") => true,
            Some(pre) => pre
                .strip_prefix("alpha.")
                .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())),
            None => false,
        }
    }

    /// True for the `beta` identifier.
    pub fn is_beta(&self) -> bool {
        self.pre_release.as_deref() == Some("beta")
    }

    /// True for a bare release version (no identifier).
    pub fn is_release(&self) -> bool {
        self.pre_release.is_none()
    }

    // =========================================================================
    // Channel transitions
    // =========================================================================

    /// Next version for an alpha publish.
    ///
    /// Versions already in the alpha family stay on the same triple with the
    /// bare `alpha` identifier. Anything else bumps the patch and enters the
    /// family.
    pub fn next_alpha(&self) -> Self {
        if self.is_alpha() {
            self.with_pre_release("alpha")
        } else {
            Self {
                major: self.major,
                minor: self.minor,
                patch: self.patch + 1,
                pre_release: Some("alpha".to_string()),
            }
        }
    }

    /// The identifier used for the alpha publication itself:
    /// `alpha.<YYYYMMDDhhmmss>` in UTC.
    ///
    /// The stamped form exists only while publishing; the manifest is
    /// reverted to the bare `alpha` form afterwards so dependents track the
    /// floating dist-tag.
    pub fn alpha_stamped(&self, at: DateTime<Utc>) -> Self {
        self.with_pre_release(format!("alpha.{}", at.format("%Y%m%d%H%M%S")))
    }

    /// Next version for a beta publish.
    ///
    /// Already-beta versions are reused unchanged (a resumed publish keeps
    /// the version the interrupted run chose). Anything else keeps the
    /// triple and replaces the identifier with `beta`.
    pub fn next_beta(&self) -> Self {
        if self.is_beta() {
            self.clone()
        } else {
            self.with_pre_release("beta")
        }
    }

    /// Next version for a production publish.
    ///
    /// A pre-release version is promoted by clearing its identifier. A bare
    /// version bumps the patch, covering a repeat production publish with no
    /// intervening pre-release.
    pub fn next_production(&self) -> Self {
        if self.pre_release.is_some() {
            self.without_pre_release()
        } else {
            Self {
                major: self.major,
                minor: self.minor,
                patch: self.patch + 1,
                pre_release: None,
            }
        }
    }

    /// The `<major>.<minor>` release-branch name for this version.
    pub fn release_branch(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre_release {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl FromStr for PackageVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PackageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.build())
    }
}

impl<'de> Deserialize<'de> for PackageVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_bare_version() {
        let v = PackageVersion::parse("1.2.3").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
        assert!(v.pre_release.is_none());
    }

    #[test]
    fn parse_pre_release_version() {
        let v = PackageVersion::parse("0.14.2-alpha.20240102081500").unwrap();
        assert_eq!(v.pre_release.as_deref(), Some("alpha.20240102081500"));
    }

    #[test]
    fn parse_rejects_malformed_versions() {
        for s in ["", "1", "1.2", "1.2.3.4", "a.b.c", "1.2.3-", "-alpha", "1.2.x"] {
            assert!(
                PackageVersion::parse(s).is_err(),
                "`{}` should not parse",
                s
            );
        }
    }

    #[test]
    fn parse_rejects_build_metadata() {
        assert!(PackageVersion::parse("1.2.3+build.5").is_err());
        assert!(PackageVersion::parse("1.2.3-alpha+sha.abc").is_err());
    }

    #[test]
    fn build_is_exact_inverse() {
        for s in ["0.0.1", "1.2.3", "1.2.3-alpha", "1.2.3-beta", "10.20.30-alpha.20240102081500"] {
            assert_eq!(PackageVersion::parse(s).unwrap().build(), s);
        }
    }

    #[test]
    fn alpha_family_detection() {
        assert!(PackageVersion::parse("1.2.3-alpha").unwrap().is_alpha());
        assert!(PackageVersion::parse("1.2.3-alpha.20240102081500")
            .unwrap()
            .is_alpha());
        assert!(!PackageVersion::parse("1.2.3-alpha.").is_ok());
        assert!(!PackageVersion::parse("1.2.3-alphax").unwrap().is_alpha());
        assert!(!PackageVersion::parse("1.2.3-beta").unwrap().is_alpha());
        assert!(!PackageVersion::parse("1.2.3").unwrap().is_alpha());
    }

    #[test]
    fn next_alpha_bumps_patch_from_release() {
        let v = PackageVersion::parse("1.2.3").unwrap();
        assert_eq!(v.next_alpha().build(), "1.2.4-alpha");
    }

    #[test]
    fn next_alpha_bumps_patch_from_beta() {
        let v = PackageVersion::parse("1.2.3-beta").unwrap();
        assert_eq!(v.next_alpha().build(), "1.2.4-alpha");
    }

    #[test]
    fn next_alpha_reuses_alpha_version() {
        let v = PackageVersion::parse("1.2.4-alpha").unwrap();
        assert_eq!(v.next_alpha().build(), "1.2.4-alpha");
    }

    #[test]
    fn next_alpha_normalizes_stale_stamp() {
        let v = PackageVersion::parse("1.2.4-alpha.20240102081500").unwrap();
        assert_eq!(v.next_alpha().build(), "1.2.4-alpha");
    }

    #[test]
    fn alpha_stamp_is_utc_seconds() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 8, 15, 0).unwrap();
        let v = PackageVersion::parse("1.2.4-alpha").unwrap();
        assert_eq!(v.alpha_stamped(at).build(), "1.2.4-alpha.20240102081500");
    }

    #[test]
    fn next_beta_replaces_alpha_identifier() {
        let v = PackageVersion::parse("1.2.4-alpha").unwrap();
        assert_eq!(v.next_beta().build(), "1.2.4-beta");
    }

    #[test]
    fn next_beta_reuses_beta_version() {
        let v = PackageVersion::parse("1.2.4-beta").unwrap();
        assert_eq!(v.next_beta().build(), "1.2.4-beta");
    }

    #[test]
    fn next_production_clears_identifier() {
        let v = PackageVersion::parse("1.2.4-beta").unwrap();
        assert_eq!(v.next_production().build(), "1.2.4");
    }

    #[test]
    fn next_production_bumps_patch_from_release() {
        let v = PackageVersion::parse("1.2.4").unwrap();
        assert_eq!(v.next_production().build(), "1.2.5");
    }

    #[test]
    fn release_branch_name() {
        let v = PackageVersion::parse("1.2.4-beta").unwrap();
        assert_eq!(v.release_branch(), "1.2");
    }

    #[test]
    fn serde_round_trips_as_string() {
        let v = PackageVersion::parse("1.2.3-alpha").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1.2.3-alpha\"");
        let back: PackageVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn serde_rejects_malformed_strings() {
        let result: Result<PackageVersion, _> = serde_json::from_str("\"1.2\"");
        assert!(result.is_err());
    }
}
