use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::info;

use crate::model::{Document, DocumentSummary};
use crate::segment::ChunkingOutcome;
use crate::util::{ensure_directory, now_utc_string};

pub const DB_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistCounts {
    pub chapters: usize,
    pub subtopics: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub documents: i64,
    pub chapters: i64,
    pub subtopics: i64,
}

pub fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to set foreign_keys=ON")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
          source_id TEXT PRIMARY KEY,
          char_count INTEGER NOT NULL,
          total_lines INTEGER NOT NULL,
          needs_review INTEGER NOT NULL,
          summary_json TEXT NOT NULL,
          updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chapters (
          chapter_id TEXT PRIMARY KEY,
          source_id TEXT NOT NULL,
          chapter_number INTEGER NOT NULL,
          title TEXT NOT NULL,
          start_line INTEGER NOT NULL,
          end_line INTEGER NOT NULL,
          char_count INTEGER NOT NULL,
          content TEXT NOT NULL,
          FOREIGN KEY(source_id) REFERENCES documents(source_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS subtopics (
          subtopic_id TEXT PRIMARY KEY,
          source_id TEXT NOT NULL,
          chapter_number INTEGER NOT NULL,
          order_index INTEGER NOT NULL,
          title TEXT NOT NULL,
          content TEXT NOT NULL,
          found INTEGER NOT NULL,
          complete INTEGER NOT NULL,
          char_count INTEGER NOT NULL,
          notes TEXT NOT NULL,
          FOREIGN KEY(source_id) REFERENCES documents(source_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_chapters_source ON chapters(source_id, chapter_number);
        CREATE INDEX IF NOT EXISTS idx_subtopics_source ON subtopics(source_id, chapter_number, order_index);
        ",
        )
        .context("failed to create schema")?;

    connection
        .execute(
            "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![DB_SCHEMA_VERSION],
        )
        .context("failed to record schema version")?;

    Ok(())
}

pub fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }
    let connection =
        Connection::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

fn row_key(source_id: &str, chapter_number: u32, order: usize) -> String {
    format!("{source_id}:{chapter_number}:{order}")
}

/// Replaces everything stored for the document with this run's chunks and
/// subtopics. Rows are keyed `<source_id>:<chapter>:<order>`; chapter rows use
/// order 0 and subtopics start at 1.
pub fn persist_run(
    connection: &mut Connection,
    document: &Document,
    chunking: &ChunkingOutcome,
    summary: &DocumentSummary,
) -> Result<PersistCounts> {
    let summary_json =
        serde_json::to_string(summary).context("failed to serialize document summary")?;
    let tx = connection.transaction()?;
    let mut counts = PersistCounts::default();

    tx.execute(
        "DELETE FROM subtopics WHERE source_id = ?1",
        params![&document.source_id],
    )?;
    tx.execute(
        "DELETE FROM chapters WHERE source_id = ?1",
        params![&document.source_id],
    )?;
    tx.execute(
        "
        INSERT INTO documents(source_id, char_count, total_lines, needs_review, summary_json, updated_at)
        VALUES(?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(source_id) DO UPDATE SET
          char_count=excluded.char_count,
          total_lines=excluded.total_lines,
          needs_review=excluded.needs_review,
          summary_json=excluded.summary_json,
          updated_at=excluded.updated_at
        ",
        params![
            &document.source_id,
            document.text.chars().count() as i64,
            chunking.total_lines as i64,
            summary.needs_review,
            summary_json,
            now_utc_string()
        ],
    )?;

    {
        let mut statement = tx.prepare(
            "
            INSERT OR REPLACE INTO chapters(
              chapter_id, source_id, chapter_number, title, start_line, end_line, char_count, content
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )?;

        for chunk in chunking.chunks.values() {
            statement.execute(params![
                row_key(&document.source_id, chunk.chapter_number, 0),
                &document.source_id,
                chunk.chapter_number,
                &chunk.title,
                chunk.start_line as i64,
                chunk.end_line as i64,
                chunk.char_count as i64,
                &chunk.content
            ])?;
            counts.chapters += 1;
        }
    }

    {
        let mut statement = tx.prepare(
            "
            INSERT OR REPLACE INTO subtopics(
              subtopic_id, source_id, chapter_number, order_index, title, content,
              found, complete, char_count, notes
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )?;

        for chapter in &summary.chapters {
            for (index, subtopic) in chapter.subtopics.iter().enumerate() {
                let order = index + 1;
                statement.execute(params![
                    row_key(&document.source_id, chapter.chapter_number, order),
                    &document.source_id,
                    chapter.chapter_number,
                    order as i64,
                    &subtopic.title,
                    &subtopic.content,
                    subtopic.found,
                    subtopic.complete,
                    subtopic.char_count as i64,
                    &subtopic.notes
                ])?;
                counts.subtopics += 1;
            }
        }
    }

    tx.commit()?;

    info!(
        source_id = %document.source_id,
        chapters = counts.chapters,
        subtopics = counts.subtopics,
        "persisted segmentation run"
    );

    Ok(counts)
}

pub fn store_counts(connection: &Connection) -> Result<StoreCounts> {
    Ok(StoreCounts {
        documents: count_rows(connection, "SELECT COUNT(*) FROM documents")?,
        chapters: count_rows(connection, "SELECT COUNT(*) FROM chapters")?,
        subtopics: count_rows(connection, "SELECT COUNT(*) FROM subtopics")?,
    })
}

fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
