use std::str::FromStr;

use payroll_core::RepositoryError;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

/// Reads a money column.
///
/// Values are written as TEXT. INTEGER and REAL cells from hand-edited or
/// older databases are accepted too; a non-finite REAL is an error. NULL
/// reads as zero.
pub fn get_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{}' not found: {}", column, e)))?;

    if value_ref.is_null() {
        return Ok(Decimal::ZERO);
    }
    let type_name = value_ref.type_info().name().to_string();

    match type_name.as_str() {
        "TEXT" => {
            let text: String = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get TEXT from '{}': {}", column, e))
            })?;
            Decimal::from_str(text.trim()).map_err(|e| {
                RepositoryError::Database(format!(
                    "Invalid decimal '{}' in '{}': {}",
                    text, column, e
                ))
            })
        }
        "INTEGER" => {
            let val: i64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!(
                    "Failed to get INTEGER from '{}': {}",
                    column, e
                ))
            })?;
            Ok(Decimal::from(val))
        }
        "REAL" => {
            let val: f64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get REAL from '{}': {}", column, e))
            })?;
            if !val.is_finite() {
                return Err(RepositoryError::Database(format!(
                    "Non-finite value {} in '{}'",
                    val, column
                )));
            }
            Decimal::try_from(val).map_err(|e| {
                RepositoryError::Database(format!("Failed to convert {} to Decimal: {}", val, e))
            })
        }
        _ => Err(RepositoryError::Database(format!(
            "Unexpected type '{}' for column '{}'",
            type_name, column
        ))),
    }
}

/// Canonical TEXT form used for every money column.
pub fn decimal_to_text(d: Decimal) -> String {
    d.to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query("CREATE TABLE amounts (id INTEGER PRIMARY KEY, amount)")
            .execute(&pool)
            .await
            .expect("Failed to create test table");
        pool
    }

    /// Inserts `literal` as the amount of row 1 and reads it back.
    async fn read_literal(literal: &str) -> Result<Decimal, RepositoryError> {
        let pool = setup_test_db().await;
        sqlx::query(&format!("INSERT INTO amounts (id, amount) VALUES (1, {literal})"))
            .execute(&pool)
            .await
            .expect("Failed to insert test data");

        let row = sqlx::query("SELECT amount FROM amounts WHERE id = 1")
            .fetch_one(&pool)
            .await
            .expect("Failed to fetch row");

        get_decimal(&row, "amount")
    }

    #[tokio::test]
    async fn reads_text() {
        assert_eq!(read_literal("'21.68'").await, Ok(dec!(21.68)));
    }

    #[tokio::test]
    async fn text_keeps_precision_beyond_f64() {
        assert_eq!(
            read_literal("'1234567890123.45'").await,
            Ok(dec!(1234567890123.45))
        );
    }

    #[tokio::test]
    async fn reads_integer() {
        assert_eq!(read_literal("-99999").await, Ok(dec!(-99999)));
    }

    #[tokio::test]
    async fn reads_real() {
        assert_eq!(read_literal("123.45").await, Ok(dec!(123.45)));
    }

    #[tokio::test]
    async fn null_reads_as_zero() {
        assert_eq!(read_literal("NULL").await, Ok(Decimal::ZERO));
    }

    #[tokio::test]
    async fn infinite_real_is_rejected() {
        let result = read_literal("9e999").await;

        assert!(
            matches!(&result, Err(RepositoryError::Database(msg)) if msg.contains("Non-finite")),
            "{result:?}"
        );
    }

    #[tokio::test]
    async fn garbage_text_is_rejected() {
        assert!(matches!(
            read_literal("'twelve'").await,
            Err(RepositoryError::Database(_))
        ));
    }

    #[tokio::test]
    async fn blob_is_rejected() {
        let result = read_literal("X'00'").await;

        assert!(
            matches!(&result, Err(RepositoryError::Database(msg)) if msg.contains("BLOB")),
            "{result:?}"
        );
    }

    #[tokio::test]
    async fn missing_column_is_an_error() {
        let pool = setup_test_db().await;
        sqlx::query("INSERT INTO amounts (id, amount) VALUES (1, '1')")
            .execute(&pool)
            .await
            .unwrap();
        let row = sqlx::query("SELECT id FROM amounts")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert!(matches!(
            get_decimal(&row, "amount"),
            Err(RepositoryError::Database(_))
        ));
    }

    #[test]
    fn text_form_keeps_scale() {
        assert_eq!(decimal_to_text(dec!(800.00)), "800.00");
    }
}
