//! Guards against clobbering inputs when writing reports.
//!
//! Migration runs point at real exports and at the production database dump;
//! a mistyped output path must never overwrite one of them.

use anyhow::{bail, Result};
use std::path::Path;

use crate::sources::is_database_path;

/// Validates that a report path is safe to (over)write.
///
/// Checks:
/// - Output extension must be `expected_extension` (e.g. "json", "csv", "sql")
/// - Output cannot be any of the input paths
/// - Output cannot be a database file
pub fn validate_output_path(output: &Path, expected_extension: &str, inputs: &[&Path]) -> Result<()> {
    let extension = output.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !extension.eq_ignore_ascii_case(expected_extension) {
        bail!(
            "Safety check failed: output file '{}' must have a .{} extension",
            output.display(),
            expected_extension
        );
    }

    for input in inputs {
        if output == *input || same_file(output, input) {
            bail!(
                "Safety check failed: output '{}' cannot be the same as input '{}'",
                output.display(),
                input.display()
            );
        }
    }

    if is_database_path(output) {
        bail!("Safety check failed: refusing to write report to database file '{}'", output.display());
    }

    Ok(())
}

/// Both paths exist and resolve to the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_output() {
        let output = PathBuf::from("/tmp/subject_mapping.json");
        let source = PathBuf::from("/data/users.json");
        assert!(validate_output_path(&output, "json", &[&source]).is_ok());
    }

    #[test]
    fn test_wrong_extension() {
        let output = PathBuf::from("/tmp/subject_mapping.txt");
        let result = validate_output_path(&output, "json", &[]);
        assert!(result.unwrap_err().to_string().contains("must have a .json extension"));
    }

    #[test]
    fn test_output_equals_input() {
        let path = PathBuf::from("/data/users.json");
        let result = validate_output_path(&path, "json", &[&path]);
        assert!(result.unwrap_err().to_string().contains("cannot be the same as input"));
    }

    #[test]
    fn test_output_resolves_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("users.json");
        std::fs::write(&input, "[]").unwrap();
        let indirect = dir.path().join(".").join("users.json");
        assert!(validate_output_path(&indirect, "json", &[&input]).is_err());
    }

    #[test]
    fn test_database_output_blocked() {
        let output = PathBuf::from("/tmp/subjects.sqlite3");
        assert!(validate_output_path(&output, "sqlite3", &[]).is_err());
    }
}
