//! Supplementary structured data
//!
//! Optional, read-only lookups specialists use to ground their answers.
//! Every specialist must work with this capability entirely absent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Result;

pub mod postgres;
pub use postgres::PgSupplementaryStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesRecord {
    pub day: chrono::NaiveDate,
    pub revenue: f64,
    pub orders: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemRecord {
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units_sold: Option<i64>,
}

/// Read-only supplementary data source
#[async_trait]
pub trait SupplementaryData: Send + Sync {
    async fn recent_sales(&self, restaurant_id: &str, days: u32) -> Result<Vec<SalesRecord>>;

    async fn competitor_records(&self, location: &str) -> Result<Vec<CompetitorRecord>>;

    async fn menu_items(&self, restaurant_id: &str) -> Result<Vec<MenuItemRecord>>;
}

/// No store configured; every lookup is empty
pub struct NoSupplementaryData;

#[async_trait]
impl SupplementaryData for NoSupplementaryData {
    async fn recent_sales(&self, _restaurant_id: &str, _days: u32) -> Result<Vec<SalesRecord>> {
        Ok(Vec::new())
    }

    async fn competitor_records(&self, _location: &str) -> Result<Vec<CompetitorRecord>> {
        Ok(Vec::new())
    }

    async fn menu_items(&self, _restaurant_id: &str) -> Result<Vec<MenuItemRecord>> {
        Ok(Vec::new())
    }
}

/// Fixed in-memory data for development & tests
#[derive(Default)]
pub struct InMemorySupplementaryData {
    sales: HashMap<String, Vec<SalesRecord>>,
    competitors: HashMap<String, Vec<CompetitorRecord>>,
    menus: HashMap<String, Vec<MenuItemRecord>>,
}

impl InMemorySupplementaryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sales(mut self, restaurant_id: &str, records: Vec<SalesRecord>) -> Self {
        self.sales.insert(restaurant_id.to_string(), records);
        self
    }

    pub fn with_competitors(mut self, location: &str, records: Vec<CompetitorRecord>) -> Self {
        self.competitors.insert(location.to_lowercase(), records);
        self
    }

    pub fn with_menu(mut self, restaurant_id: &str, records: Vec<MenuItemRecord>) -> Self {
        self.menus.insert(restaurant_id.to_string(), records);
        self
    }
}

#[async_trait]
impl SupplementaryData for InMemorySupplementaryData {
    async fn recent_sales(&self, restaurant_id: &str, days: u32) -> Result<Vec<SalesRecord>> {
        let mut records = self.sales.get(restaurant_id).cloned().unwrap_or_default();
        records.sort_by(|a, b| b.day.cmp(&a.day));
        records.truncate(days as usize);
        Ok(records)
    }

    async fn competitor_records(&self, location: &str) -> Result<Vec<CompetitorRecord>> {
        Ok(self
            .competitors
            .get(&location.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn menu_items(&self, restaurant_id: &str) -> Result<Vec<MenuItemRecord>> {
        Ok(self.menus.get(restaurant_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_sales_newest_first() {
        let store = InMemorySupplementaryData::new().with_sales(
            "r1",
            (1..=5)
                .map(|d| SalesRecord {
                    day: day(d),
                    revenue: 100.0 * d as f64,
                    orders: d as i64,
                    platform: None,
                })
                .collect(),
        );

        let sales = store.recent_sales("r1", 2).await.unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].day, day(5));
        assert!(store.recent_sales("unknown", 7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_competitors_case_insensitive() {
        let store = InMemorySupplementaryData::new().with_competitors(
            "Austin, TX",
            vec![CompetitorRecord {
                name: "Pie Co".into(),
                cuisine: Some("pizza".into()),
                rating: Some(4.4),
                price_level: None,
                distance_km: Some(1.2),
            }],
        );

        assert_eq!(store.competitor_records("austin, tx").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_store_is_empty() {
        let store = NoSupplementaryData;
        assert!(store.menu_items("r1").await.unwrap().is_empty());
        assert!(store.competitor_records("anywhere").await.unwrap().is_empty());
    }
}
