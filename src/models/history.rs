//! History model
//!
//! One row per processed photo. Successful rows carry the full nutrition
//! record; failed rows only identify the user and time.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use super::NutritionRecord;

/// Timestamp layout stored in `history.created_at`; sorts lexically
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A stored history row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub display_name: String,
    pub username: Option<String>,
    pub created_at: String,
    pub success: bool,
    pub record: Option<NutritionRecord>,
}

/// Data for appending a history row
#[derive(Debug, Clone)]
pub struct HistoryEntryCreate {
    pub user_id: i64,
    pub display_name: String,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub record: Option<NutritionRecord>,
}

/// Per-user counters for /stats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total: i64,
    pub successful: i64,
}

impl HistoryStats {
    /// Percentage of successful identifications, 0 when nothing was sent
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 * 100.0 / self.total as f64
        }
    }
}

impl HistoryEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let success: bool = row.get("success")?;
        let record = if success {
            Some(NutritionRecord {
                food: row.get("food")?,
                serving_size: row.get("serving_size")?,
                fat: row.get("fat")?,
                carbs: row.get("carbs")?,
                fiber: row.get("fiber")?,
                sugar: row.get("sugar")?,
                sodium: row.get("sodium")?,
                potassium: row.get("potassium")?,
                cholesterol: row.get("cholesterol")?,
            })
        } else {
            None
        };

        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            display_name: row.get("display_name")?,
            username: row.get("username")?,
            created_at: row.get("created_at")?,
            success,
            record,
        })
    }

    /// Append a history row
    pub fn create(conn: &Connection, data: &HistoryEntryCreate) -> DbResult<Self> {
        let r = data.record.as_ref();
        conn.execute(
            r#"
            INSERT INTO history (
                user_id, display_name, username, created_at, success,
                food, serving_size, fat, carbs, fiber, sugar, sodium, potassium, cholesterol
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                data.user_id,
                data.display_name,
                data.username,
                data.created_at.format(TIMESTAMP_FORMAT).to_string(),
                r.is_some(),
                r.map(|r| r.food.as_str()),
                r.map(|r| r.serving_size),
                r.map(|r| r.fat),
                r.map(|r| r.carbs),
                r.map(|r| r.fiber),
                r.map(|r| r.sugar),
                r.map(|r| r.sodium),
                r.map(|r| r.potassium),
                r.map(|r| r.cholesterol),
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| {
            crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM history WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Most recent successful identifications for a user, newest first
    pub fn recent_successful(conn: &Connection, user_id: i64, limit: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM history
            WHERE user_id = ?1 AND success = 1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )?;

        let entries = stmt
            .query_map(params![user_id, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Total and successful row counts for a user
    pub fn stats(conn: &Connection, user_id: i64) -> DbResult<HistoryStats> {
        let stats = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(success), 0) FROM history WHERE user_id = ?1",
            [user_id],
            |row| {
                Ok(HistoryStats {
                    total: row.get(0)?,
                    successful: row.get(1)?,
                })
            },
        )?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::db::{migrations, Database};

    fn test_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| migrations::run_migrations(conn)).unwrap();
        db
    }

    fn pizza() -> NutritionRecord {
        NutritionRecord {
            food: "pizza".to_string(),
            serving_size: 107.0,
            fat: 10.7,
            carbs: 35.3,
            fiber: 2.5,
            sugar: 4.1,
            sodium: 685,
            potassium: 193,
            cholesterol: 19,
        }
    }

    fn entry(user_id: i64, minute: u32, record: Option<NutritionRecord>) -> HistoryEntryCreate {
        HistoryEntryCreate {
            user_id,
            display_name: "Ada Lovelace".to_string(),
            username: Some("ada".to_string()),
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, minute, 0).unwrap(),
            record,
        }
    }

    #[test]
    fn test_create_round_trips_record() {
        let db = test_db();
        let stored = db
            .with_conn(|conn| HistoryEntry::create(conn, &entry(7, 0, Some(pizza()))))
            .unwrap();

        assert!(stored.success);
        assert_eq!(stored.user_id, 7);
        assert_eq!(stored.username.as_deref(), Some("ada"));
        assert_eq!(stored.created_at, "2025-03-01T12:00:00.000Z");
        assert_eq!(stored.record, Some(pizza()));
    }

    #[test]
    fn test_failed_entry_has_no_record() {
        let db = test_db();
        let stored = db
            .with_conn(|conn| HistoryEntry::create(conn, &entry(7, 0, None)))
            .unwrap();

        assert!(!stored.success);
        assert!(stored.record.is_none());
    }

    #[test]
    fn test_recent_successful_newest_first_and_limited() {
        let db = test_db();
        db.with_conn(|conn| {
            for minute in 0..4 {
                let mut record = pizza();
                record.food = format!("food-{}", minute);
                HistoryEntry::create(conn, &entry(7, minute, Some(record)))?;
            }
            HistoryEntry::create(conn, &entry(7, 10, None))?;
            HistoryEntry::create(conn, &entry(8, 11, Some(pizza())))?;
            Ok(())
        })
        .unwrap();

        let recent = db
            .with_conn(|conn| HistoryEntry::recent_successful(conn, 7, 3))
            .unwrap();
        let foods: Vec<String> = recent
            .iter()
            .map(|e| e.record.as_ref().unwrap().food.clone())
            .collect();
        assert_eq!(foods, vec!["food-3", "food-2", "food-1"]);
    }

    #[test]
    fn test_stats_counts_per_user() {
        let db = test_db();
        db.with_conn(|conn| {
            HistoryEntry::create(conn, &entry(7, 0, Some(pizza())))?;
            HistoryEntry::create(conn, &entry(7, 1, None))?;
            HistoryEntry::create(conn, &entry(7, 2, None))?;
            HistoryEntry::create(conn, &entry(9, 3, Some(pizza())))?;
            Ok(())
        })
        .unwrap();

        let stats = db.with_conn(|conn| HistoryEntry::stats(conn, 7)).unwrap();
        assert_eq!(stats, HistoryStats { total: 3, successful: 1 });

        let empty = db.with_conn(|conn| HistoryEntry::stats(conn, 42)).unwrap();
        assert_eq!(empty, HistoryStats::default());
        assert_eq!(empty.success_rate(), 0.0);
    }

    #[test]
    fn test_success_rate() {
        let stats = HistoryStats { total: 4, successful: 3 };
        assert_eq!(stats.success_rate(), 75.0);
    }
}
