use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS questions (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            question_number TEXT UNIQUE,
            question_text   TEXT,
            options         TEXT,
            image_path      TEXT,
            correct_answer  TEXT DEFAULT 'Unknown',
            topic           TEXT DEFAULT 'General',
            explanation     TEXT,
            question_type   TEXT DEFAULT 'standard',
            flagged         BOOLEAN DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_questions_topic ON questions(topic);

        -- Quarantine: segments that could not be parsed, kept for manual repair
        CREATE TABLE IF NOT EXISTS parsing_errors (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            raw_text     TEXT,
            error_reason TEXT,
            source_page  INTEGER
        );
        ",
    )?;
    Ok(())
}

// ── Records ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Standard,
    DragDrop,
    Simulation,
}

impl QuestionType {
    pub fn detect(text: &str) -> Self {
        let upper = text.to_uppercase();
        if upper.contains("DRAG DROP") {
            QuestionType::DragDrop
        } else if upper.contains("SIMULATION") {
            QuestionType::Simulation
        } else {
            QuestionType::Standard
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Standard => "standard",
            QuestionType::DragDrop => "drag_drop",
            QuestionType::Simulation => "simulation",
        }
    }

    fn from_column(s: &str) -> Self {
        match s {
            "drag_drop" => QuestionType::DragDrop,
            "simulation" => QuestionType::Simulation,
            _ => QuestionType::Standard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionRecord {
    pub question_number: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub topic: String,
    pub question_type: QuestionType,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuarantineRecord {
    pub raw_text: String,
    pub error_reason: String,
    pub source_page: u32,
}

// ── Sink ──

/// Where parsed records go. Question writes are first-write-wins on
/// `question_number`.
pub trait RecordSink {
    /// Insert unless the number already exists. Returns whether a row was written.
    fn upsert_question(&self, record: &QuestionRecord) -> Result<bool>;
    fn insert_quarantine(&self, record: &QuarantineRecord) -> Result<()>;
    /// Returns whether a question with that number exists.
    fn update_image_path(&self, question_number: &str, path: &str) -> Result<bool>;
}

impl RecordSink for Connection {
    fn upsert_question(&self, q: &QuestionRecord) -> Result<bool> {
        let options = serde_json::to_string(&q.options)?;
        let mut stmt = self.prepare_cached(
            "INSERT OR IGNORE INTO questions
             (question_number, question_text, options, correct_answer, topic, question_type, image_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let inserted = stmt.execute(rusqlite::params![
            q.question_number,
            q.text,
            options,
            q.correct_answer,
            q.topic,
            q.question_type.as_str(),
            q.image_path,
        ])?;
        Ok(inserted > 0)
    }

    fn insert_quarantine(&self, r: &QuarantineRecord) -> Result<()> {
        let mut stmt = self.prepare_cached(
            "INSERT INTO parsing_errors (raw_text, error_reason, source_page) VALUES (?1, ?2, ?3)",
        )?;
        stmt.execute(rusqlite::params![r.raw_text, r.error_reason, r.source_page])?;
        Ok(())
    }

    fn update_image_path(&self, question_number: &str, path: &str) -> Result<bool> {
        let updated = self.execute(
            "UPDATE questions SET image_path = ?1 WHERE question_number = ?2",
            rusqlite::params![path, question_number],
        )?;
        Ok(updated > 0)
    }
}

// ── Queries ──

fn question_from_row(row: &rusqlite::Row) -> rusqlite::Result<QuestionRecord> {
    let options: Option<String> = row.get(2)?;
    let kind: Option<String> = row.get(6)?;
    Ok(QuestionRecord {
        question_number: row.get(0)?,
        text: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        options: options
            .and_then(|o| serde_json::from_str(&o).ok())
            .unwrap_or_default(),
        correct_answer: row.get(3)?,
        topic: row.get(4)?,
        image_path: row.get(5)?,
        question_type: QuestionType::from_column(kind.as_deref().unwrap_or("standard")),
    })
}

const QUESTION_COLUMNS: &str = "question_number, question_text, options, COALESCE(correct_answer,'Unknown'),
     COALESCE(topic,'General'), image_path, question_type";

pub fn fetch_question(conn: &Connection, question_number: &str) -> Result<Option<QuestionRecord>> {
    let sql = format!("SELECT {} FROM questions WHERE question_number = ?1", QUESTION_COLUMNS);
    let row = conn
        .query_row(&sql, [question_number], question_from_row)
        .optional()?;
    Ok(row)
}

/// One page of questions plus the total matching the filter.
pub fn fetch_questions(
    conn: &Connection,
    topic: Option<&str>,
    unknown_only: bool,
    limit: usize,
    offset: usize,
) -> Result<(Vec<QuestionRecord>, usize)> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(t) = topic {
        conditions.push(format!("topic = ?{}", params.len() + 1));
        params.push(Box::new(t.to_string()));
    }
    if unknown_only {
        conditions.push("correct_answer LIKE '%Unknown%'".to_string());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let sql = format!(
        "SELECT {} FROM questions{} ORDER BY id LIMIT {} OFFSET {}",
        QUESTION_COLUMNS, where_clause, limit, offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(param_refs.as_slice(), question_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let total: usize = conn.query_row(
        &format!("SELECT COUNT(*) FROM questions{}", where_clause),
        param_refs.as_slice(),
        |r| r.get(0),
    )?;
    Ok((rows, total))
}

pub struct ParsingErrorRow {
    pub id: i64,
    pub raw_text: String,
    pub error_reason: String,
    pub source_page: Option<u32>,
}

pub fn fetch_parsing_errors(conn: &Connection, limit: usize) -> Result<Vec<ParsingErrorRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, COALESCE(raw_text,''), COALESCE(error_reason,''), source_page
         FROM parsing_errors ORDER BY id LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(ParsingErrorRow {
                id: row.get(0)?,
                raw_text: row.get(1)?,
                error_reason: row.get(2)?,
                source_page: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub questions: usize,
    pub quarantined: usize,
    pub with_image: usize,
    pub unknown_answer: usize,
    pub standard: usize,
    pub drag_drop: usize,
    pub simulation: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<usize> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    Ok(Stats {
        questions: count("SELECT COUNT(*) FROM questions")?,
        quarantined: count("SELECT COUNT(*) FROM parsing_errors")?,
        with_image: count("SELECT COUNT(*) FROM questions WHERE image_path IS NOT NULL")?,
        unknown_answer: count("SELECT COUNT(*) FROM questions WHERE correct_answer LIKE '%Unknown%'")?,
        standard: count("SELECT COUNT(*) FROM questions WHERE question_type = 'standard'")?,
        drag_drop: count("SELECT COUNT(*) FROM questions WHERE question_type = 'drag_drop'")?,
        simulation: count("SELECT COUNT(*) FROM questions WHERE question_type = 'simulation'")?,
    })
}

/// (topic, question count), ordered by topic.
pub fn topic_breakdown(conn: &Connection) -> Result<Vec<(String, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT COALESCE(topic,'General'), COUNT(*) FROM questions GROUP BY topic ORDER BY topic",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Tests ──
