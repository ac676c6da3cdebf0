//! Database module - SQLite storage for exercises, progress and settings

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::exercises::{Category, Exercise, STARTER_EXERCISES, starter_categories};
use crate::settings::Settings;
use crate::timer::SideStrategy;

/// Completed exercise record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub id: Option<i64>,
    pub exercise_id: i64,
    pub completed_sets: i32,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: Option<i32>, // Wall time from start to completion
}

/// Database wrapper
pub struct Database {
    conn: Connection,
}

const EXERCISE_COLUMNS: &str = "id, name, category_id, sets, reps, hold_secs, duration_secs, \
                                rest_secs, is_paired, side_strategy, notes";

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS exercises (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
                sets INTEGER NOT NULL,
                reps INTEGER,
                hold_secs INTEGER,
                duration_secs INTEGER,
                rest_secs INTEGER,
                is_paired INTEGER NOT NULL DEFAULT 0,
                side_strategy TEXT,
                notes TEXT
            );
            CREATE TABLE IF NOT EXISTS progress (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
                completed_sets INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;

        // Migration: add duration_secs column if missing
        let has_duration: bool = self
            .conn
            .prepare("SELECT duration_secs FROM progress LIMIT 1")
            .is_ok();
        if !has_duration {
            self.conn
                .execute("ALTER TABLE progress ADD COLUMN duration_secs INTEGER", [])?;
        }

        Ok(())
    }

    // === Categories ===

    pub fn add_category(&self, name: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO categories (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Id of the named category, creating it when missing
    pub fn ensure_category(&self, name: &str) -> Result<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(id) => Ok(id),
            None => self.add_category(name),
        }
    }

    pub fn get_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY name")?;
        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    pub fn delete_category(&self, id: i64) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    // === Exercises ===

    pub fn add_exercise(&self, exercise: &Exercise) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO exercises (name, category_id, sets, reps, hold_secs, duration_secs, rest_secs, is_paired, side_strategy, notes) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                exercise.name,
                exercise.category_id,
                exercise.sets,
                exercise.reps,
                exercise.hold_secs,
                exercise.duration_secs,
                exercise.rest_secs,
                exercise.is_paired,
                exercise.side_strategy.map(|s| s.as_str()),
                exercise.notes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_exercise(&self, exercise: &Exercise) -> Result<bool> {
        let Some(id) = exercise.id else {
            return Ok(false);
        };
        let n = self.conn.execute(
            "UPDATE exercises SET name = ?1, category_id = ?2, sets = ?3, reps = ?4, hold_secs = ?5, duration_secs = ?6, rest_secs = ?7, is_paired = ?8, side_strategy = ?9, notes = ?10 WHERE id = ?11",
            params![
                exercise.name,
                exercise.category_id,
                exercise.sets,
                exercise.reps,
                exercise.hold_secs,
                exercise.duration_secs,
                exercise.rest_secs,
                exercise.is_paired,
                exercise.side_strategy.map(|s| s.as_str()),
                exercise.notes,
                id,
            ],
        )?;
        Ok(n > 0)
    }

    pub fn get_exercise(&self, id: i64) -> Result<Option<Exercise>> {
        let sql = format!("SELECT {} FROM exercises WHERE id = ?1", EXERCISE_COLUMNS);
        let exercise = self
            .conn
            .query_row(&sql, params![id], exercise_from_row)
            .optional()?;
        Ok(exercise)
    }

    /// All exercises, optionally limited to one category
    pub fn get_exercises(&self, category_id: Option<i64>) -> Result<Vec<Exercise>> {
        let sql = format!(
            "SELECT {} FROM exercises WHERE ?1 IS NULL OR category_id = ?1 ORDER BY name",
            EXERCISE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let exercises = stmt
            .query_map(params![category_id], exercise_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exercises)
    }

    pub fn delete_exercise(&self, id: i64) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM exercises WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    /// Insert the starter catalogue. Exercises already present by name are skipped.
    pub fn seed_starter(&self) -> Result<usize> {
        for name in starter_categories() {
            self.ensure_category(name)?;
        }

        let existing: Vec<String> = self
            .get_exercises(None)?
            .into_iter()
            .map(|e| e.name)
            .collect();

        let mut added = 0;
        for template in STARTER_EXERCISES {
            if existing.iter().any(|n| n == template.name) {
                continue;
            }
            let category_id = self.ensure_category(template.category)?;
            self.add_exercise(&template.to_exercise(Some(category_id)))?;
            added += 1;
        }
        debug!(added, "seeded starter exercises");
        Ok(added)
    }

    // === Progress ===

    pub fn add_progress(&self, progress: &Progress) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO progress (exercise_id, completed_sets, completed_at, duration_secs) VALUES (?1, ?2, ?3, ?4)",
            params![
                progress.exercise_id,
                progress.completed_sets,
                progress.completed_at.to_rfc3339(),
                progress.duration_secs,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Progress log, newest first, optionally for one exercise
    pub fn get_progress(&self, exercise_id: Option<i64>) -> Result<Vec<Progress>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, exercise_id, completed_sets, completed_at, duration_secs FROM progress WHERE ?1 IS NULL OR exercise_id = ?1 ORDER BY completed_at DESC"
        )?;

        let progress = stmt
            .query_map(params![exercise_id], |row| {
                let date_str: String = row.get(3)?;
                Ok(Progress {
                    id: Some(row.get(0)?),
                    exercise_id: row.get(1)?,
                    completed_sets: row.get(2)?,
                    completed_at: DateTime::parse_from_rfc3339(&date_str)
                        .map(|d| d.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                    duration_secs: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(progress)
    }

    // === Settings ===

    /// Stored settings over defaults. Unreadable rows are logged and skipped.
    pub fn load_settings(&self) -> Result<Settings> {
        let mut settings = Settings::default();
        let mut stmt = self.conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        for (key, value) in rows {
            if let Err(e) = settings.set(&key, &value) {
                warn!(%key, %value, "ignoring stored setting: {}", e);
            }
        }
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        for (key, value) in settings.entries() {
            self.conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        Ok(())
    }
}

fn exercise_from_row(row: &Row<'_>) -> rusqlite::Result<Exercise> {
    let strategy: Option<String> = row.get(9)?;
    Ok(Exercise {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        category_id: row.get(2)?,
        sets: row.get(3)?,
        reps: row.get(4)?,
        hold_secs: row.get(5)?,
        duration_secs: row.get(6)?,
        rest_secs: row.get(7)?,
        is_paired: row.get(8)?,
        side_strategy: strategy.as_deref().and_then(SideStrategy::parse),
        notes: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knee_exercise(db: &Database) -> Exercise {
        let category_id = db.add_category("knee").unwrap();
        let mut exercise = Exercise::new("terminal knee extension", 3);
        exercise.category_id = Some(category_id);
        exercise.reps = Some(15);
        exercise.is_paired = true;
        exercise.side_strategy = Some(SideStrategy::Sequential);
        exercise
    }

    #[test]
    fn test_exercise_crud() {
        let db = Database::open_in_memory().unwrap();
        let mut exercise = knee_exercise(&db);

        let id = db.add_exercise(&exercise).unwrap();
        let stored = db.get_exercise(id).unwrap().unwrap();
        exercise.id = Some(id);
        assert_eq!(stored, exercise);

        exercise.sets = 4;
        exercise.side_strategy = None;
        assert!(db.update_exercise(&exercise).unwrap());
        let stored = db.get_exercise(id).unwrap().unwrap();
        assert_eq!(stored.sets, 4);
        assert_eq!(stored.side_strategy, None);

        assert!(db.delete_exercise(id).unwrap());
        assert!(db.get_exercise(id).unwrap().is_none());
        assert!(!db.delete_exercise(id).unwrap());
    }

    #[test]
    fn test_exercises_filtered_by_category() {
        let db = Database::open_in_memory().unwrap();
        let exercise = knee_exercise(&db);
        db.add_exercise(&exercise).unwrap();

        let hip = db.add_category("hip").unwrap();
        let mut clamshells = Exercise::new("clamshells", 3);
        clamshells.category_id = Some(hip);
        clamshells.reps = Some(12);
        db.add_exercise(&clamshells).unwrap();

        assert_eq!(db.get_exercises(None).unwrap().len(), 2);
        let hip_only = db.get_exercises(Some(hip)).unwrap();
        assert_eq!(hip_only.len(), 1);
        assert_eq!(hip_only[0].name, "clamshells");
    }

    #[test]
    fn test_categories() {
        let db = Database::open_in_memory().unwrap();
        let knee = db.ensure_category("knee").unwrap();
        assert_eq!(db.ensure_category("knee").unwrap(), knee);
        db.add_category("ankle").unwrap();

        let names: Vec<_> = db.get_categories().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["ankle", "knee"]);
        assert!(db.add_category("knee").is_err());

        assert!(db.delete_category(knee).unwrap());
        assert_eq!(db.get_categories().unwrap().len(), 1);
    }

    #[test]
    fn test_progress_log() {
        let db = Database::open_in_memory().unwrap();
        let exercise = knee_exercise(&db);
        let id = db.add_exercise(&exercise).unwrap();

        let earlier = Progress {
            id: None,
            exercise_id: id,
            completed_sets: 3,
            completed_at: Utc::now() - chrono::Duration::days(1),
            duration_secs: Some(190),
        };
        let later = Progress {
            completed_at: Utc::now(),
            duration_secs: None,
            ..earlier.clone()
        };
        db.add_progress(&earlier).unwrap();
        db.add_progress(&later).unwrap();

        let log = db.get_progress(Some(id)).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log[0].completed_at > log[1].completed_at);
        assert_eq!(log[1].duration_secs, Some(190));
        assert!(db.get_progress(Some(id + 1)).unwrap().is_empty());

        // Deleting the exercise removes its progress
        db.delete_exercise(id).unwrap();
        assert!(db.get_progress(None).unwrap().is_empty());
    }

    #[test]
    fn test_settings_persist() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.load_settings().unwrap(), Settings::default());

        let mut settings = Settings::default();
        settings.default_rest_secs = 45;
        settings.default_side_strategy = SideStrategy::Sequential;
        db.save_settings(&settings).unwrap();
        assert_eq!(db.load_settings().unwrap(), settings);

        settings.secs_per_rep = 5;
        db.save_settings(&settings).unwrap();
        assert_eq!(db.load_settings().unwrap().secs_per_rep, 5);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let added = db.seed_starter().unwrap();
        assert_eq!(added, STARTER_EXERCISES.len());
        assert_eq!(db.seed_starter().unwrap(), 0);
        assert_eq!(db.get_exercises(None).unwrap().len(), STARTER_EXERCISES.len());
        assert_eq!(db.get_categories().unwrap().len(), starter_categories().len());
    }
}
