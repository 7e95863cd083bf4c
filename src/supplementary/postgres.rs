//! Postgres-backed supplementary data (read-only)
//!
//! The pool connects lazily, so a bad or missing database only shows up as
//! failed lookups, which specialists already tolerate.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use crate::error::OrchestrationError;
use crate::supplementary::{CompetitorRecord, MenuItemRecord, SalesRecord, SupplementaryData};
use crate::Result;

pub struct PgSupplementaryStore {
    pool: PgPool,
}

impl PgSupplementaryStore {
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| {
                OrchestrationError::DatabaseError(format!(
                    "Failed to configure supplementary data pool: {}",
                    e
                ))
            })?;

        info!("Supplementary data backend: postgres");
        Ok(Self { pool })
    }
}

fn db_error(what: &str, e: sqlx::Error) -> OrchestrationError {
    OrchestrationError::SupplementaryError(format!("Failed to load {}: {}", what, e))
}

// Nullable columns decode as Option so only NULL maps to None; a type
// mismatch is still an error.

fn sales_from_row(row: &PgRow) -> std::result::Result<SalesRecord, sqlx::Error> {
    Ok(SalesRecord {
        day: row.try_get("day")?,
        revenue: row.try_get("revenue")?,
        orders: row.try_get("orders")?,
        platform: row.try_get::<Option<String>, _>("platform")?,
    })
}

fn competitor_from_row(row: &PgRow) -> std::result::Result<CompetitorRecord, sqlx::Error> {
    Ok(CompetitorRecord {
        name: row.try_get("name")?,
        cuisine: row.try_get::<Option<String>, _>("cuisine")?,
        rating: row.try_get::<Option<f64>, _>("rating")?,
        price_level: row.try_get::<Option<String>, _>("price_level")?,
        distance_km: row.try_get::<Option<f64>, _>("distance_km")?,
    })
}

fn menu_item_from_row(row: &PgRow) -> std::result::Result<MenuItemRecord, sqlx::Error> {
    Ok(MenuItemRecord {
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        category: row.try_get::<Option<String>, _>("category")?,
        units_sold: row.try_get::<Option<i64>, _>("units_sold")?,
    })
}

#[async_trait]
impl SupplementaryData for PgSupplementaryStore {
    async fn recent_sales(&self, restaurant_id: &str, days: u32) -> Result<Vec<SalesRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT day, revenue::FLOAT8 AS revenue, orders::INT8 AS orders, platform
            FROM daily_sales
            WHERE restaurant_id = $1
            ORDER BY day DESC
            LIMIT $2
            "#,
        )
        .bind(restaurant_id)
        .bind(days as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("sales history", e))?;

        rows.iter()
            .map(sales_from_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| db_error("sales history", e))
    }

    async fn competitor_records(&self, location: &str) -> Result<Vec<CompetitorRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT name, cuisine, rating::FLOAT8 AS rating, price_level, distance_km::FLOAT8 AS distance_km
            FROM competitors
            WHERE LOWER(location) = LOWER($1)
            ORDER BY distance_km ASC NULLS LAST
            LIMIT 25
            "#,
        )
        .bind(location)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("competitor records", e))?;

        rows.iter()
            .map(competitor_from_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| db_error("competitor records", e))
    }

    async fn menu_items(&self, restaurant_id: &str) -> Result<Vec<MenuItemRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT name, price::FLOAT8 AS price, category, units_sold::INT8 AS units_sold
            FROM menu_items
            WHERE restaurant_id = $1
            ORDER BY units_sold DESC NULLS LAST
            LIMIT 50
            "#,
        )
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("menu items", e))?;

        rows.iter()
            .map(menu_item_from_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| db_error("menu items", e))
    }
}
