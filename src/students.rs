use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};

use crate::models::Student;

fn row_to_student(row: &sqlx::sqlite::SqliteRow) -> Student {
    Student {
        id: row.get("id"),
        name: row.get("name"),
        progress: row.get("progress"),
    }
}

pub async fn list_students(pool: &SqlitePool) -> Result<Vec<Student>> {
    let rows = sqlx::query("SELECT id, name, progress FROM students ORDER BY id ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(row_to_student).collect())
}

pub async fn get_student(pool: &SqlitePool, id: i64) -> Result<Student> {
    let row = sqlx::query("SELECT id, name, progress FROM students WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(row_to_student(&row)),
        None => bail!("student not found: {}", id),
    }
}

/// Inserts a student whose progress starts at `"Not started"`.
pub async fn create_student(pool: &SqlitePool, name: &str) -> Result<Student> {
    let name = name.trim();
    if name.is_empty() {
        bail!("student name must not be empty");
    }

    let result = sqlx::query("INSERT INTO students (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    get_student(pool, result.last_insert_rowid()).await
}
