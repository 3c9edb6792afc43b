//! Loading source and target records.
//!
//! Spreadsheet and PDF extraction happen elsewhere; by the time records reach
//! this crate they are either a JSON export or rows of a SQLite database.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;

use crate::models::NameRecord;

// ============================================================================
// JSON
// ============================================================================

/// One record as it appears in a JSON export.
///
/// Accepts `"name": "..."`, `"names": [...]` or both (single name first), and
/// numeric ids as well as string ids.
#[derive(Debug, Deserialize)]
struct RecordInput {
    id: serde_json::Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    attributes: BTreeMap<String, serde_json::Value>,
}

impl RecordInput {
    fn into_record(self, position: usize) -> Result<NameRecord> {
        let id = scalar_to_string(&self.id)
            .with_context(|| format!("record {position}: id must be a string or number"))?;

        let mut names = Vec::with_capacity(self.names.len() + 1);
        names.extend(self.name);
        names.extend(self.names);

        let mut attributes = BTreeMap::new();
        for (key, value) in self.attributes {
            if let Some(text) = scalar_to_string(&value) {
                attributes.insert(key, text);
            }
        }

        Ok(NameRecord { id, names, attributes })
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a JSON array of records.
pub fn parse_json_records(text: &str) -> Result<Vec<NameRecord>> {
    let inputs: Vec<RecordInput> = serde_json::from_str(text).context("Expected a JSON array of records")?;
    inputs
        .into_iter()
        .enumerate()
        .map(|(i, input)| input.into_record(i))
        .collect()
}

/// Load records from a JSON file.
pub fn load_json_records(path: &Path) -> Result<Vec<NameRecord>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_json_records(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

// ============================================================================
// SQLite
// ============================================================================

/// Load records from a SQLite database with a caller-supplied query.
///
/// The first column is the id; every following column is a display name, in
/// order (e.g. `SELECT code, name_ca, name_es FROM subjects`). NULL names are
/// skipped. The database is opened read-only.
pub fn load_sqlite_records(path: &Path, query: &str) -> Result<Vec<NameRecord>> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut stmt = conn.prepare(query).context("Failed to prepare record query")?;

    let column_count = stmt.column_count();
    if column_count < 2 {
        bail!("Record query must return an id column and at least one name column");
    }

    let mut records = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let id = value_to_string(row.get_ref(0)?).context("Record id must not be NULL")?;
        let mut names = Vec::with_capacity(column_count - 1);
        for col in 1..column_count {
            if let Some(name) = value_to_string(row.get_ref(col)?) {
                names.push(name);
            }
        }
        records.push(NameRecord::with_names(id, names));
    }

    Ok(records)
}

fn value_to_string(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

/// Load records from `path`, picking the reader by file extension.
///
/// `.sqlite`, `.sqlite3` and `.db` files need a query; anything else is read as JSON.
pub fn load_records(path: &Path, query: Option<&str>) -> Result<Vec<NameRecord>> {
    if is_database_path(path) {
        let Some(query) = query else {
            bail!("{} is a database; a record query is required", path.display());
        };
        load_sqlite_records(path, query)
    } else {
        load_json_records(path)
    }
}

pub fn is_database_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("sqlite" | "sqlite3" | "db")
    )
}

// ============================================================================
// Filtering
// ============================================================================

/// Login accounts that never correspond to a subject.
pub const DEFAULT_EXCLUDED_KEYWORDS: [&str; 7] = [
    "admin",
    "webmaster",
    "direccio",
    "recerca",
    "biblio",
    "coordinacio",
    "guiadocent",
];

/// Split records into (kept, excluded): a record is excluded when its id or
/// display name contains any keyword, case-insensitively.
pub fn exclude_by_keywords(records: Vec<NameRecord>, keywords: &[String]) -> (Vec<NameRecord>, Vec<NameRecord>) {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    records.into_iter().partition(|record| {
        let id = record.id.to_lowercase();
        let name = record.display_name().to_lowercase();
        !keywords.iter().any(|k| id.contains(k) || name.contains(k))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_json_records_shapes() {
        let text = r#"[
            {"id": "u1", "name": "tipografia_i", "attributes": {"password": "abc", "year": 2}},
            {"id": 42, "names": ["Tipografia I", "Tipografía I"]},
            {"id": "S3", "name": "Taller", "names": ["Workshop"]}
        ]"#;
        let records = parse_json_records(text).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].attribute("password"), Some("abc"));
        assert_eq!(records[0].attribute("year"), Some("2"));
        assert_eq!(records[1].id, "42");
        assert_eq!(records[1].names.len(), 2);
        assert_eq!(records[2].names, vec!["Taller", "Workshop"]);
    }

    #[test]
    fn test_parse_json_records_bad_id() {
        let err = parse_json_records(r#"[{"id": null, "name": "x"}]"#).unwrap_err();
        assert!(format!("{err:#}").contains("record 0"));
        assert!(parse_json_records(r#"{"id": "x"}"#).is_err());
    }

    #[test]
    fn test_load_json_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, r#"[{"id": "u1", "name": "taller_i"}]"#).unwrap();
        let records = load_records(&path, None).unwrap();
        assert_eq!(records, vec![NameRecord::new("u1", "taller_i")]);
    }

    #[test]
    fn test_load_sqlite_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subjects.sqlite3");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE subjects (code TEXT, name_ca TEXT, name_es TEXT);
             INSERT INTO subjects VALUES ('T1', 'Tipografia I', 'Tipografía I');
             INSERT INTO subjects VALUES ('T2', NULL, 'Taller II');",
        )
        .unwrap();
        drop(conn);

        let records = load_records(&path, Some("SELECT code, name_ca, name_es FROM subjects ORDER BY code")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].display_name(), "Tipografia I");
        assert_eq!(records[1].names, vec!["Taller II"]);
        assert_eq!(records[1].display_name(), "Taller II");
    }

    #[test]
    fn test_sqlite_query_needs_name_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subjects.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE subjects (code TEXT);")
            .unwrap();
        assert!(load_sqlite_records(&path, "SELECT code FROM subjects").is_err());
        assert!(load_records(&path, None).is_err());
    }

    #[test]
    fn test_is_database_path() {
        assert!(is_database_path(&PathBuf::from("/data/app.sqlite3")));
        assert!(is_database_path(&PathBuf::from("subjects.db")));
        assert!(!is_database_path(&PathBuf::from("users.json")));
    }

    #[test]
    fn test_exclude_by_keywords() {
        let records = vec![
            NameRecord::new("admin_bau", "admin_bau"),
            NameRecord::new("u2", "tipografia_i"),
            NameRecord::new("u3", "Biblioteca"),
        ];
        let keywords: Vec<String> = DEFAULT_EXCLUDED_KEYWORDS.iter().map(|k| k.to_string()).collect();
        let (kept, excluded) = exclude_by_keywords(records, &keywords);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "u2");
        assert_eq!(excluded.len(), 2);
    }
}
