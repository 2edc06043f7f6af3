//! PostgreSQL version banner parsing
//!
//! Banners come from the running server's `server_version` setting or from the
//! `postgres --version` output of the operator's init container, for example
//! `postgres (PostgreSQL) 10.6 (Debian 10.6-1.pgdg90+1)` or `PostgreSQL 9.5.14`.
//! Only `major.minor` is kept.
//!
//! Full `SELECT version()` output is accepted too. Its platform clause
//! (` on x86_64-..., compiled by gcc ... 6.3.0 ...`) carries the compiler
//! version, so it is cut off before matching.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Last whitespace-preceded `digits.digits`, ignoring a trailing `.patch`
const VERSION_PATTERN: &str = r"^.* (\d+)\.(\d+)(?:\.\d+)? ?";

fn version_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(VERSION_PATTERN).expect("version pattern is valid"))
}

/// A PostgreSQL `major.minor` version
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostgresVersion {
    pub major: u32,
    pub minor: u32,
}

impl PostgresVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Extract the version from a free-text banner
    pub fn parse_banner(banner: &str) -> Result<Self> {
        let unparsable = || {
            Error::VersionProbeError(format!(
                "Unable to parse PostgreSQL version from version string: `{}`",
                banner.trim()
            ))
        };

        let release = strip_platform(banner).trim_end();
        let captures = version_regex()
            .captures(release)
            .ok_or_else(unparsable)?;
        let major = captures[1].parse().map_err(|_| unparsable())?;
        let minor = captures[2].parse().map_err(|_| unparsable())?;
        Ok(Self { major, minor })
    }
}

/// Release part of a banner, without the ` on <platform>, compiled by ...` tail
fn strip_platform(banner: &str) -> &str {
    banner
        .split_once(" on ")
        .map_or(banner, |(release, _)| release)
}

impl fmt::Display for PostgresVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_debian_banner() {
        let version =
            PostgresVersion::parse_banner("postgres (PostgreSQL) 10.6 (Debian 10.6-1.pgdg90+1)")
                .unwrap();
        assert_eq!(version, PostgresVersion::new(10, 6));
    }

    #[test]
    fn test_parse_patch_suffix_is_ignored() {
        let version = PostgresVersion::parse_banner("PostgreSQL 9.5.14").unwrap();
        assert_eq!(version, PostgresVersion::new(9, 5));
        assert_eq!(version.to_string(), "9.5");
    }

    #[test]
    fn test_parse_select_version_output_ignores_compiler() {
        let version = PostgresVersion::parse_banner(
            "PostgreSQL 10.6 (Debian 10.6-1.pgdg90+1) on x86_64-pc-linux-gnu, \
             compiled by gcc (Debian 6.3.0-18+deb9u1) 6.3.0 20170516, 64-bit",
        )
        .unwrap();
        assert_eq!(version, PostgresVersion::new(10, 6));

        let version = PostgresVersion::parse_banner(
            "PostgreSQL 12.4 on x86_64-redhat-linux-gnu, \
             compiled by gcc (GCC) 8.3.1 20191121 (Red Hat 8.3.1-5), 64-bit",
        )
        .unwrap();
        assert_eq!(version, PostgresVersion::new(12, 4));
    }

    #[test]
    fn test_parse_server_version_setting() {
        let version =
            PostgresVersion::parse_banner("PostgreSQL 10.6 (Debian 10.6-1.pgdg90+1)").unwrap();
        assert_eq!(version, PostgresVersion::new(10, 6));
    }

    #[test]
    fn test_parse_trailing_newline() {
        let version = PostgresVersion::parse_banner("postgres (PostgreSQL) 12.1\n").unwrap();
        assert_eq!(version, PostgresVersion::new(12, 1));
    }

    #[test]
    fn test_parse_failures() {
        assert!(PostgresVersion::parse_banner("").is_err());
        assert!(PostgresVersion::parse_banner("10.6").is_err());
        assert!(PostgresVersion::parse_banner("postgres version unknown").is_err());
        assert!(matches!(
            PostgresVersion::parse_banner("garbage"),
            Err(Error::VersionProbeError(_))
        ));
    }

    #[test]
    fn test_ordering() {
        assert!(PostgresVersion::new(9, 5) < PostgresVersion::new(10, 6));
        assert!(PostgresVersion::new(10, 6) == PostgresVersion::new(10, 6));
        assert!(PostgresVersion::new(10, 10) > PostgresVersion::new(10, 9));
    }
}
