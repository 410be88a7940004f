use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use super::common::parse_gender;
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::PatientRepo,
    },
    models::{Gender, NewPatient, Patient},
};

pub struct SqlitePatientRepo {
    pool: SqlitePool,
}

impl SqlitePatientRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_patient(row: &SqliteRow) -> DbResult<Patient> {
        Ok(Patient {
            id: row.get("id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            gender: parse_gender(&row.get::<String, _>("gender"))?,
            birth_day: row.get("birthday"),
            created_on: row.get("created_on"),
        })
    }
}

#[async_trait]
impl PatientRepo for SqlitePatientRepo {
    async fn create(&self, input: NewPatient) -> DbResult<Patient> {
        let result = sqlx::query(
            r#"
            INSERT INTO patients (first_name, last_name, gender, birthday, created_on)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.gender.as_str())
        .bind(input.birth_day)
        .bind(input.created_on)
        .execute(&self.pool)
        .await?;

        Ok(Patient {
            id: result.last_insert_rowid(),
            first_name: input.first_name,
            last_name: input.last_name,
            gender: input.gender,
            birth_day: input.birth_day,
            created_on: input.created_on,
        })
    }

    async fn get_by_id(&self, id: i64) -> DbResult<Option<Patient>> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, gender, birthday, created_on
            FROM patients
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_patient).transpose()
    }

    async fn list(&self) -> DbResult<Vec<Patient>> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, gender, birthday, created_on
            FROM patients
            ORDER BY last_name ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_patient).collect()
    }

    async fn list_by_gender(&self, gender: Gender) -> DbResult<Vec<Patient>> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, gender, birthday, created_on
            FROM patients
            WHERE gender = ?
            ORDER BY last_name ASC, id ASC
            "#,
        )
        .bind(gender.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_patient).collect()
    }

    async fn list_by_name(&self, first_name: &str, last_name: &str) -> DbResult<Vec<Patient>> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, gender, birthday, created_on
            FROM patients
            WHERE first_name = ? AND last_name = ?
            ORDER BY last_name ASC, id ASC
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_patient).collect()
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM patients WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn delete_created_before(&self, cutoff: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM patients WHERE created_on < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count_created_before(&self, cutoff: NaiveDate) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients WHERE created_on < ?")
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }
}
