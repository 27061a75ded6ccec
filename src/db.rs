use anyhow::Result;
use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Row};
use std::collections::HashMap;

use crate::etl::load::ConsolidatedRow;

pub async fn get_pool(database_url: &str) -> Result<Pool<Postgres>> {
    PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url)
        .await
        .map_err(Into::into)
}

/// Load the master mapping once per batch run.
pub async fn load_taxonomy_dictionary(
    pool: &Pool<Postgres>,
    table: &str,
) -> Result<HashMap<String, String>> {
    let query = format!(
        r#"SELECT "Unit-Element_Name", "Taxonomy_id" FROM {}"#,
        table
    );

    let rows = sqlx::query(&query).fetch_all(pool).await?;
    let mut mapping = HashMap::with_capacity(rows.len());
    for row in rows {
        let key: String = row.try_get("Unit-Element_Name")?;
        let taxonomy_id: String = row.try_get("Taxonomy_id")?;
        mapping.insert(key, taxonomy_id);
    }

    info!("Master mapping loaded: {} entries from {}", mapping.len(), table);
    Ok(mapping)
}

/// Append-only insert under the fixed column order. Absent values bind SQL
/// NULL, so the insert always matches the destination schema.
pub async fn append_consolidated(
    pool: &Pool<Postgres>,
    table: &str,
    rows: &[ConsolidatedRow],
) -> Result<u64> {
    let insert = format!(
        r#"INSERT INTO "{}"
           ("Taxonomy_id", "Company Code", "Financial Year", "Quarter",
            "Element Name", "Unit", "Value", "Decimal", "Unit-Element_Name",
            "Period Start Date", "Period End Date")
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        table
    );

    let mut inserted = 0u64;
    for row in rows {
        sqlx::query(&insert)
            .bind(&row.taxonomy_id)
            .bind(&row.company_code)
            .bind(&row.financial_year)
            .bind(&row.quarter)
            .bind(&row.element_name)
            .bind(&row.unit)
            .bind(&row.value)
            .bind(&row.decimal)
            .bind(&row.unit_element_name)
            .bind(&row.period_start_date)
            .bind(&row.period_end_date)
            .execute(pool)
            .await?;
        inserted += 1;
    }

    info!("Appended {} rows to {}", inserted, table);
    Ok(inserted)
}
