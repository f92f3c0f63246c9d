use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::fetch::{AccessToken, EsiClient};
use crate::output::write_json;
use crate::services::{DATASOURCE, ESI_BASE};

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustedPrice {
    pub type_id: i32,
    #[serde(default)]
    pub adjusted_price: f64,
}

pub async fn get_and_write(
    client: &EsiClient,
    token: &AccessToken,
    out_dir: &Path,
) -> Result<()> {
    let prices = get_adjusted_prices(client, token).await?;
    let by_type = to_price_map(&prices);
    let path = write_json(out_dir, "adjusted_prices.json", &by_type)?;
    log::info!("wrote {} adjusted prices to {:?}", by_type.len(), path);
    Ok(())
}

/// Market-wide adjusted prices arrive on a single page.
pub async fn get_adjusted_prices(
    client: &EsiClient,
    token: &AccessToken,
) -> Result<Vec<AdjustedPrice>> {
    let url = format!("{ESI_BASE}/markets/prices/?{DATASOURCE}");
    let page = client
        .fetch_page::<Vec<AdjustedPrice>>(&url, None, token)
        .await?;
    Ok(page.records)
}

pub fn to_price_map(prices: &[AdjustedPrice]) -> HashMap<i32, f64> {
    prices
        .iter()
        .map(|entry| (entry.type_id, entry.adjusted_price))
        .collect()
}
