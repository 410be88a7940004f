use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::PatientRepo,
    },
    models::{Gender, NewPatient, Patient},
};

pub struct PostgresPatientRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresPatientRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_patient(row: &PgRow) -> DbResult<Patient> {
        let gender: String = row.get("gender");
        Ok(Patient {
            id: row.get("id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            gender: gender.parse().map_err(|e: String| {
                DbError::Internal(format!("Invalid gender in database: {}", e))
            })?,
            birth_day: row.get("birthday"),
            created_on: row.get("created_on"),
        })
    }
}

#[async_trait]
impl PatientRepo for PostgresPatientRepo {
    async fn create(&self, input: NewPatient) -> DbResult<Patient> {
        let row = sqlx::query(
            r#"
            INSERT INTO patients (first_name, last_name, gender, birthday, created_on)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, first_name, last_name, gender, birthday, created_on
            "#,
        )
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.gender.as_str())
        .bind(input.birth_day)
        .bind(input.created_on)
        .fetch_one(&self.write_pool)
        .await?;

        Self::parse_patient(&row)
    }

    async fn get_by_id(&self, id: i64) -> DbResult<Option<Patient>> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, gender, birthday, created_on
            FROM patients
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
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
        .fetch_all(&self.read_pool)
        .await?;

        rows.iter().map(Self::parse_patient).collect()
    }

    async fn list_by_gender(&self, gender: Gender) -> DbResult<Vec<Patient>> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, gender, birthday, created_on
            FROM patients
            WHERE gender = $1
            ORDER BY last_name ASC, id ASC
            "#,
        )
        .bind(gender.as_str())
        .fetch_all(&self.read_pool)
        .await?;

        rows.iter().map(Self::parse_patient).collect()
    }

    async fn list_by_name(&self, first_name: &str, last_name: &str) -> DbResult<Vec<Patient>> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, gender, birthday, created_on
            FROM patients
            WHERE first_name = $1 AND last_name = $2
            ORDER BY last_name ASC, id ASC
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .fetch_all(&self.read_pool)
        .await?;

        rows.iter().map(Self::parse_patient).collect()
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1")
            .bind(id)
            .execute(&self.write_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn delete_created_before(&self, cutoff: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM patients WHERE created_on < $1")
            .bind(cutoff)
            .execute(&self.write_pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count_created_before(&self, cutoff: NaiveDate) -> DbResult<u64> {
        // Reads from the primary so dry runs see the same rows a real purge would
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM patients WHERE created_on < $1")
                .bind(cutoff)
                .fetch_one(&self.write_pool)
                .await?;

        Ok(count as u64)
    }
}
