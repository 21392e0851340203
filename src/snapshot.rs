use crate::error::ExportError;
use rusqlite::{Connection, OpenFlags, Result as SqliteResult};
use std::path::Path;

/// Lists every table in a snapshot with its columns and row count.
pub fn describe_snapshot(db_path: &Path) -> Result<String, ExportError> {
    if !db_path.exists() {
        return Err(ExportError::MissingDatabase(db_path.to_path_buf()));
    }

    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<SqliteResult<Vec<String>>>()?;

    let mut output = String::new();
    output.push_str(&format!("Database: {}\n", db_path.display()));
    output.push_str(&format!("Found {} tables:\n", tables.len()));

    for table in &tables {
        output.push_str(&format!("  - {}\n", table));
        let quoted = format!("`{}`", table.replace('`', "``"));

        if let Ok(mut pragma_stmt) = conn.prepare(&format!("PRAGMA table_info({})", quoted)) {
            let columns = pragma_stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(1)?, // column name
                    row.get::<_, String>(2)?, // declared type
                ))
            })?;

            for (name, col_type) in columns.flatten() {
                output.push_str(&format!("      {} ({})\n", name, col_type));
            }
        }

        let count_query = format!("SELECT COUNT(*) FROM {}", quoted);
        if let Ok(count) = conn.query_row(&count_query, [], |row| row.get::<_, i64>(0)) {
            output.push_str(&format!("      Records: {}\n", count));
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_missing_file() {
        let result = describe_snapshot(Path::new("definitely_missing_snapshot.db"));
        assert!(matches!(result, Err(ExportError::MissingDatabase(_))));
    }

    #[test]
    fn test_describe_lists_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sport.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE HEART_DATA_CACHE (ID INTEGER PRIMARY KEY, DATA_LIST TEXT);
             INSERT INTO HEART_DATA_CACHE (DATA_LIST) VALUES ('[]'), ('[]');",
        )
        .unwrap();
        drop(conn);

        let text = describe_snapshot(&path).unwrap();
        assert!(text.contains("Found 1 tables:"));
        assert!(text.contains("  - HEART_DATA_CACHE"));
        assert!(text.contains("      DATA_LIST (TEXT)"));
        assert!(text.contains("      Records: 2"));
    }
}
