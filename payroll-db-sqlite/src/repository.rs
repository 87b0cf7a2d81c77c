use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use payroll_core::db::{EntryBatch, PayrollRepository};
use payroll_core::{EntryFilter, PayEntry, RepositoryError, TaxResult};
use rust_decimal::prelude::ToPrimitive;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal};

const COLUMNS: &str = "id, week_start_date, week_end_date, gross_pay, notes,
    federal_income_tax, social_security, medicare, state_income_tax, futa, suta, net_pay,
    social_security_wages, futa_wages, suta_wages, created_at, updated_at";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connects to `database_url` (e.g. `sqlite:payroll.db?mode=rwc` or
    /// `sqlite::memory:`), creating the file when missing.
    ///
    /// In-memory databases get a single, never-recycled connection so every
    /// query sees the same database.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true);
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let max_connections = if in_memory { 1 } else { 5 };
        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            // Closing the only connection would drop the database.
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        debug!(database_url, max_connections, "Connected to SQLite");
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_pay_entry(row: &SqliteRow) -> Result<PayEntry, RepositoryError> {
    Ok(PayEntry {
        id: row
            .try_get("id")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        week_start: row
            .try_get::<NaiveDate, _>("week_start_date")
            .map_err(|e| RepositoryError::Database(format!("Failed to get week_start_date: {}", e)))?,
        week_end: row
            .try_get::<NaiveDate, _>("week_end_date")
            .map_err(|e| RepositoryError::Database(format!("Failed to get week_end_date: {}", e)))?,
        gross_pay: get_decimal(row, "gross_pay")?,
        notes: row
            .try_get("notes")
            .map_err(|e| RepositoryError::Database(e.to_string()))?,
        taxes: TaxResult {
            federal_income_tax: get_decimal(row, "federal_income_tax")?,
            social_security: get_decimal(row, "social_security")?,
            medicare: get_decimal(row, "medicare")?,
            state_income_tax: get_decimal(row, "state_income_tax")?,
            futa: get_decimal(row, "futa")?,
            suta: get_decimal(row, "suta")?,
            net_pay: get_decimal(row, "net_pay")?,
            social_security_wages: get_decimal(row, "social_security_wages")?,
            futa_wages: get_decimal(row, "futa_wages")?,
            suta_wages: get_decimal(row, "suta_wages")?,
        },
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get updated_at: {}", e)))?,
    })
}

/// Binds the ten computed columns in `COLUMNS` order.
fn bind_taxes<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    taxes: &TaxResult,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(decimal_to_text(taxes.federal_income_tax))
        .bind(decimal_to_text(taxes.social_security))
        .bind(decimal_to_text(taxes.medicare))
        .bind(decimal_to_text(taxes.state_income_tax))
        .bind(decimal_to_text(taxes.futa))
        .bind(decimal_to_text(taxes.suta))
        .bind(decimal_to_text(taxes.net_pay))
        .bind(decimal_to_text(taxes.social_security_wages))
        .bind(decimal_to_text(taxes.futa_wages))
        .bind(decimal_to_text(taxes.suta_wages))
}

fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate), RepositoryError> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1);
    let last = NaiveDate::from_ymd_opt(year, 12, 31);
    first
        .zip(last)
        .ok_or_else(|| RepositoryError::Database(format!("Year out of range: {}", year)))
}

#[async_trait]
impl PayrollRepository for SqliteRepository {
    async fn entries_for_year(
        &self,
        year: i32,
    ) -> Result<Vec<PayEntry>, RepositoryError> {
        let (first, last) = year_bounds(year)?;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pay_entries
             WHERE week_start_date >= ? AND week_start_date <= ?
             ORDER BY week_start_date, created_at, id",
            COLUMNS
        ))
        .bind(first)
        .bind(last)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_pay_entry).collect()
    }

    async fn get_entry(
        &self,
        id: i64,
    ) -> Result<PayEntry, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM pay_entries WHERE id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?
            .ok_or(RepositoryError::NotFound)?;

        row_to_pay_entry(&row)
    }

    async fn list_entries(
        &self,
        filter: &EntryFilter,
    ) -> Result<Vec<PayEntry>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM pay_entries WHERE 1 = 1",
            COLUMNS
        ));
        if let Some(start) = filter.start_date {
            query.push(" AND week_start_date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            query.push(" AND week_end_date <= ").push_bind(end);
        }
        // Amounts are TEXT; compare numerically.
        if let Some(min) = filter.min_gross_pay.and_then(|d| d.to_f64()) {
            query.push(" AND CAST(gross_pay AS REAL) >= ").push_bind(min);
        }
        if let Some(max) = filter.max_gross_pay.and_then(|d| d.to_f64()) {
            query.push(" AND CAST(gross_pay AS REAL) <= ").push_bind(max);
        }
        query
            .push(" ORDER BY week_start_date DESC, created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(filter.effective_limit()))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset));

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_pay_entry).collect()
    }

    async fn overlapping_entries(
        &self,
        week_start: NaiveDate,
        week_end: NaiveDate,
        exclude_id: Option<i64>,
    ) -> Result<Vec<PayEntry>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pay_entries
             WHERE week_start_date <= ? AND week_end_date >= ?
               AND (? IS NULL OR id <> ?)
             ORDER BY week_start_date, id",
            COLUMNS
        ))
        .bind(week_end)
        .bind(week_start)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_pay_entry).collect()
    }

    async fn commit(
        &self,
        batch: EntryBatch,
    ) -> Result<Vec<PayEntry>, RepositoryError> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        // Any early return drops `tx`, which rolls the batch back.
        for id in &batch.deletes {
            let result = sqlx::query("DELETE FROM pay_entries WHERE id = ?")
                .bind(*id)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        }

        for entry in &batch.updates {
            let query = sqlx::query(
                "UPDATE pay_entries SET
                    week_start_date = ?, week_end_date = ?, gross_pay = ?, notes = ?,
                    federal_income_tax = ?, social_security = ?, medicare = ?,
                    state_income_tax = ?, futa = ?, suta = ?, net_pay = ?,
                    social_security_wages = ?, futa_wages = ?, suta_wages = ?,
                    updated_at = ?
                 WHERE id = ?",
            )
            .bind(entry.week_start)
            .bind(entry.week_end)
            .bind(decimal_to_text(entry.gross_pay))
            .bind(entry.notes.clone());
            let result = bind_taxes(query, &entry.taxes)
                .bind(now)
                .bind(entry.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        }

        let mut inserted = Vec::with_capacity(batch.inserts.len());
        for pending in batch.inserts {
            let query = sqlx::query(
                "INSERT INTO pay_entries (
                    week_start_date, week_end_date, gross_pay, notes,
                    federal_income_tax, social_security, medicare, state_income_tax,
                    futa, suta, net_pay, social_security_wages, futa_wages, suta_wages,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(pending.entry.week_start)
            .bind(pending.entry.week_end)
            .bind(decimal_to_text(pending.entry.gross_pay))
            .bind(pending.entry.notes.clone());
            let result = bind_taxes(query, &pending.taxes)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;

            inserted.push(PayEntry {
                id: result.last_insert_rowid(),
                week_start: pending.entry.week_start,
                week_end: pending.entry.week_end,
                gross_pay: pending.entry.gross_pay,
                notes: pending.entry.notes,
                taxes: pending.taxes,
                created_at: now,
                updated_at: now,
            });
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        debug!(
            inserted = inserted.len(),
            updated = batch.updates.len(),
            deleted = batch.deletes.len(),
            "Committed entry batch"
        );
        Ok(inserted)
    }
}
