use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Context, Result};

/// Runtime configuration loaded from `config.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub corporation_id: i64,
    #[serde(default)]
    pub region_ids: Vec<i32>,
    #[serde(default)]
    pub location_ids: Vec<i64>,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub order_filter: OrderFilter,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries per page after the first attempt.
    pub attempts: u32,
    /// Fixed pause between attempts, in seconds.
    pub delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_secs: 5,
        }
    }
}

/// Which orders make it into the aggregated book. The upstream
/// endpoints disagree on what they pre-filter, so retention is an
/// explicit setting applied uniformly to region and structure sources.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct OrderFilter {
    pub include_buy_orders: bool,
    pub include_empty_volume: bool,
}

impl OrderFilter {
    pub fn retains(&self, is_buy_order: bool, volume_remain: i64) -> bool {
        if is_buy_order && !self.include_buy_orders {
            return false;
        }
        if volume_remain <= 0 && !self.include_empty_volume {
            return false;
        }
        true
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Config = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_falls_back_to_defaults() {
        let sample = r#"{
            "client_id": "abc",
            "client_secret": "def",
            "refresh_token": "ghi",
            "corporation_id": 98000001
        }"#;

        let config: Config = serde_json::from_str(sample).unwrap();

        assert!(config.region_ids.is_empty());
        assert!(config.location_ids.is_empty());
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.retry.delay_secs, 5);
        assert!(!config.order_filter.include_buy_orders);
        assert!(!config.order_filter.include_empty_volume);
    }

    #[test]
    fn explicit_sections_override_defaults() {
        let sample = r#"{
            "client_id": "abc",
            "client_secret": "def",
            "refresh_token": "ghi",
            "corporation_id": 98000001,
            "region_ids": [10000002],
            "location_ids": [1035466617946],
            "retry": {"attempts": 1, "delay_secs": 0},
            "order_filter": {"include_buy_orders": true}
        }"#;

        let config: Config = serde_json::from_str(sample).unwrap();

        assert_eq!(config.region_ids, vec![10000002]);
        assert_eq!(config.location_ids, vec![1035466617946]);
        assert_eq!(config.retry.attempts, 1);
        assert!(config.order_filter.include_buy_orders);
        assert!(!config.order_filter.include_empty_volume);
    }

    #[test]
    fn default_filter_drops_buy_and_empty_orders() {
        let filter = OrderFilter::default();

        assert!(filter.retains(false, 10));
        assert!(!filter.retains(true, 10));
        assert!(!filter.retains(false, 0));
        assert!(!filter.retains(false, -5));
    }

    #[test]
    fn permissive_filter_keeps_everything() {
        let filter = OrderFilter {
            include_buy_orders: true,
            include_empty_volume: true,
        };

        assert!(filter.retains(true, 0));
        assert!(filter.retains(false, -1));
    }
}
