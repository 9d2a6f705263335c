//! Changelog rows and patch filename parsing

use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

use crate::error::{Error, Result};

/// Major version written to every changelog row
pub const CHANGELOG_MAJOR: &str = "01";
/// Minor version written to every changelog row
pub const CHANGELOG_MINOR: &str = "00";

/// Patch code of the sentinel row written by a fresh baseline
pub const BASELINE_PATCH: &str = "0000";
/// Name of the sentinel row written by a fresh baseline
pub const BASELINE_NAME: &str = "initial_baseline";

pub(crate) const INSERT_CHANGELOG: &str = "
    INSERT INTO changelog (major, minor, patch, name, applied)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id";

pub(crate) const SELECT_CHANGELOG: &str =
    "SELECT id, major, minor, patch, name, applied FROM changelog ORDER BY id";

/// One applied schema change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ChangelogEntry {
    pub id: i32,
    pub major: String,
    pub minor: String,
    pub patch: String,
    pub name: String,
    pub applied: NaiveDateTime,
}

/// Patch identity decoded from a `<patch>.<name>.<extension>` filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
    pub patch: String,
    pub name: String,
}

impl PatchFile {
    /// Parse a migration filename such as `0001.add_user_email_index.sql`.
    ///
    /// Only the final path component is considered. After the extension is
    /// stripped the stem must hold exactly one dot with text on both sides.
    pub fn parse(filename: &str) -> Result<Self> {
        let malformed = || Error::MalformedFilename(filename.to_string());

        let file_name = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(malformed)?;

        let mut parts = strip_extension(file_name).split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(patch), Some(name), None) if !patch.is_empty() && !name.is_empty() => {
                Ok(Self {
                    patch: patch.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(malformed()),
        }
    }
}

/// Drop the last extension; leading dots never start one
fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if file_name[..idx].chars().any(|c| c != '.') => &file_name[..idx],
        _ => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("0007.add_index.sql", "0007", "add_index")]
    #[case("0001.add_user_email_index.sql", "0001", "add_user_email_index")]
    #[case("migrations/0002.seed_roles.sql", "0002", "seed_roles")]
    #[case("/srv/app/db.patches/0003.rename.psql", "0003", "rename")]
    #[case("0004.no_extension_after_strip.", "0004", "no_extension_after_strip")]
    fn test_parse_patch_filename(
        #[case] filename: &str,
        #[case] patch: &str,
        #[case] name: &str,
    ) {
        let parsed = PatchFile::parse(filename).unwrap();
        assert_eq!(
            parsed,
            PatchFile {
                patch: patch.to_string(),
                name: name.to_string(),
            }
        );
    }

    #[rstest]
    #[case("malformed_no_dot.sql")]
    #[case("0001.add.index.sql")]
    #[case("0001.sql")]
    #[case(".0001.sql")]
    #[case("0001..sql")]
    #[case(".sql")]
    #[case("")]
    #[case("migrations/..")]
    fn test_parse_malformed_filename(#[case] filename: &str) {
        let err = PatchFile::parse(filename).unwrap_err();
        assert!(
            matches!(&err, Error::MalformedFilename(f) if f == filename),
            "unexpected error for {:?}: {}",
            filename,
            err
        );
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("0001.name.sql"), "0001.name");
        assert_eq!(strip_extension("noext"), "noext");
        assert_eq!(strip_extension(".hidden"), ".hidden");
        assert_eq!(strip_extension("..sql"), "..sql");
    }

    #[test]
    fn test_fixed_version_literals() {
        assert_eq!(CHANGELOG_MAJOR, "01");
        assert_eq!(CHANGELOG_MINOR, "00");
        assert_eq!(BASELINE_PATCH, "0000");
        assert_eq!(BASELINE_NAME, "initial_baseline");
    }
}
