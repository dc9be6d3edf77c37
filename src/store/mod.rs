//! Append-only SQLite log of predictions and user-supplied labels.
//!
//! A connection is opened per operation and dropped when it finishes; the
//! schema is migrated once, when the store is opened.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection};

use crate::classifier::NUM_CLASSES;
use crate::error::{Result, ServiceError};
use crate::models::PredictionRecord;

mod migrations;

use migrations::run_migrations;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct PredictionStore {
    db_path: PathBuf,
}

impl PredictionStore {
    /// Opens (creating if needed) the store file and ensures the table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(&db_path)?;
        run_migrations(&mut conn)?;
        log::info!("Prediction store ready at {}", db_path.display());

        Ok(Self { db_path })
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    /// Inserts one new row stamped with the current local time and returns
    /// its id. Existing rows are never touched.
    pub fn log_prediction(
        &self,
        predicted: u8,
        confidence: f64,
        true_label: Option<u8>,
    ) -> Result<i64> {
        check_class("predicted", predicted)?;
        if let Some(label) = true_label {
            check_class("true_label", label)?;
        }
        if !(0.0..=100.0).contains(&confidence) {
            return Err(ServiceError::InvalidRecord(format!(
                "confidence {confidence} is outside 0-100"
            )));
        }

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO predictions (timestamp, predicted, confidence, true_label)
             VALUES (?1, ?2, ?3, ?4)",
            params![timestamp, predicted, confidence, true_label],
        )?;
        let id = conn.last_insert_rowid();

        log::debug!(
            "Logged prediction #{id}: predicted={predicted} confidence={confidence} true_label={true_label:?}"
        );
        Ok(id)
    }

    /// Most recent labeled rows first, at most `limit` of them.
    pub fn get_recent_predictions(&self, limit: usize) -> Result<Vec<PredictionRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, predicted, confidence, true_label
             FROM predictions
             WHERE true_label IS NOT NULL
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let mut rows = stmt.query(params![limit])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(PredictionRecord {
                id: row.get(0)?,
                timestamp: parse_timestamp(&row.get::<_, String>(1)?)?,
                predicted: row.get(2)?,
                confidence: row.get(3)?,
                true_label: row.get(4)?,
            });
        }
        Ok(records)
    }
}

fn check_class(field: &str, value: u8) -> Result<()> {
    if usize::from(value) < NUM_CLASSES {
        Ok(())
    } else {
        Err(ServiceError::InvalidRecord(format!(
            "{field} {value} is not a digit 0-9"
        )))
    }
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|e| ServiceError::Schema(format!("invalid timestamp '{value}': {e}")))
}
