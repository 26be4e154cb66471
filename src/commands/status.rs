use anyhow::{Context, Result};
use chapterseg::store;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args.db_path;

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    let counts = store::store_counts(&conn)
        .with_context(|| format!("failed to read counts from {}", db_path.display()))?;
    let needs_review = query_count(
        &conn,
        "SELECT COUNT(*) FROM documents WHERE needs_review = 1",
    )
    .unwrap_or(0);
    let incomplete = query_count(
        &conn,
        "SELECT COUNT(*) FROM subtopics WHERE found = 0 OR complete = 0",
    )
    .unwrap_or(0);

    info!(
        path = %db_path.display(),
        documents = counts.documents,
        chapters = counts.chapters,
        subtopics = counts.subtopics,
        documents_needing_review = needs_review,
        subtopics_incomplete = incomplete,
        "database status"
    );

    Ok(())
}

fn query_count(conn: &Connection, sql: &str) -> Result<i64> {
    let count = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
