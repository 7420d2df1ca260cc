//! SQLite data adapter.
//!
//! `securities` holds the registry of known codes with an `active` flag;
//! only active codes are listed. `daily_bars` holds one row per code and date.

use crate::domain::bar::DailyBar;
use crate::domain::error::ScanError;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{BarLookup, BarStore, DataPort};
use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> ScanError {
    ScanError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> ScanError {
    ScanError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, ScanError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| ScanError::Database {
        reason: format!("invalid stored date '{}': {}", s, e),
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ScanError> {
        let db_path = config
            .get_string("data", "path")
            .ok_or_else(|| ScanError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            })?;

        let pool_size = config.get_int("data", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, ScanError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn initialize_schema(&self) -> Result<(), ScanError> {
        let conn = self.pool.get().map_err(pool_error)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS securities (
                code TEXT PRIMARY KEY,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS daily_bars (
                code TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL DEFAULT 0,
                PRIMARY KEY (code, date)
            );
            CREATE INDEX IF NOT EXISTS idx_daily_bars_date ON daily_bars(date);",
        )
        .map_err(query_error)?;

        Ok(())
    }

    fn is_registered(&self, code: &str) -> Result<bool, ScanError> {
        let conn = self.pool.get().map_err(pool_error)?;
        let found: Option<String> = conn
            .query_row(
                "SELECT code FROM securities WHERE code = ?1",
                params![code],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_error)?;
        Ok(found.is_some())
    }
}

impl DataPort for SqliteAdapter {
    fn list_securities(&self) -> Result<Vec<String>, ScanError> {
        let conn = self.pool.get().map_err(pool_error)?;

        let mut stmt = conn
            .prepare("SELECT code FROM securities WHERE active = 1 ORDER BY code")
            .map_err(query_error)?;

        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_error)?;

        let mut codes = Vec::new();
        for row in rows {
            codes.push(row.map_err(query_error)?);
        }
        Ok(codes)
    }

    fn fetch_bars(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<BarLookup, ScanError> {
        if !self.is_registered(code)? {
            return Ok(BarLookup::NotFound);
        }

        let conn = self.pool.get().map_err(pool_error)?;

        let start_str = start_date.map(|d| d.format("%Y-%m-%d").to_string());
        let end_str = end_date.map(|d| d.format("%Y-%m-%d").to_string());

        let query = "SELECT date, open, high, low, close, volume
                     FROM daily_bars
                     WHERE code = ?1
                       AND (?2 IS NULL OR date >= ?2)
                       AND (?3 IS NULL OR date <= ?3)
                     ORDER BY date ASC";

        let mut stmt = conn.prepare(query).map_err(query_error)?;

        let rows = stmt
            .query_map(params![code, start_str, end_str], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                ))
            })
            .map_err(query_error)?;

        let mut bars = Vec::new();
        for row in rows {
            let (date, open, high, low, close, volume) = row.map_err(query_error)?;
            bars.push(DailyBar::new(parse_date(&date)?, open, high, low, close, volume));
        }

        Ok(BarLookup::from_bars(bars))
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, ScanError> {
        let conn = self.pool.get().map_err(pool_error)?;

        let query = "SELECT MIN(date), MAX(date), COUNT(*) FROM daily_bars WHERE code = ?1";

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(query, params![code], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(query_error)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => Ok(Some((
                parse_date(&min_str)?,
                parse_date(&max_str)?,
                count as usize,
            ))),
            _ => Ok(None),
        }
    }
}

impl BarStore for SqliteAdapter {
    fn store_bars(&self, code: &str, bars: &[DailyBar]) -> Result<usize, ScanError> {
        let mut conn = self.pool.get().map_err(pool_error)?;
        let tx = conn.transaction().map_err(query_error)?;

        tx.execute(
            "INSERT INTO securities (code, active) VALUES (?1, 1)
             ON CONFLICT(code) DO UPDATE SET active = 1",
            params![code],
        )
        .map_err(query_error)?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO daily_bars (code, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    code,
                    bar.date.format("%Y-%m-%d").to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)?;
        Ok(bars.len())
    }

    fn set_active(&self, code: &str, active: bool) -> Result<bool, ScanError> {
        let conn = self.pool.get().map_err(pool_error)?;
        let updated = conn
            .execute(
                "UPDATE securities SET active = ?2 WHERE code = ?1",
                params![code, active],
            )
            .map_err(query_error)?;
        Ok(updated > 0)
    }

    fn remove_security(&self, code: &str) -> Result<bool, ScanError> {
        let mut conn = self.pool.get().map_err(pool_error)?;
        let tx = conn.transaction().map_err(query_error)?;

        tx.execute("DELETE FROM daily_bars WHERE code = ?1", params![code])
            .map_err(query_error)?;
        let removed = tx
            .execute("DELETE FROM securities WHERE code = ?1", params![code])
            .map_err(query_error)?;

        tx.commit().map_err(query_error)?;
        Ok(removed > 0)
    }

    fn clear(&self) -> Result<usize, ScanError> {
        let mut conn = self.pool.get().map_err(pool_error)?;
        let tx = conn.transaction().map_err(query_error)?;

        tx.execute("DELETE FROM daily_bars", []).map_err(query_error)?;
        let removed = tx
            .execute("DELETE FROM securities", [])
            .map_err(query_error)?;

        tx.commit().map_err(query_error)?;
        Ok(removed)
    }
}
