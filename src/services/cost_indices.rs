use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fetch::{AccessToken, EsiClient};
use crate::output::write_json;
use crate::services::{DATASOURCE, ESI_BASE};

#[derive(Debug, Clone, Deserialize)]
pub struct CostIndexRecord {
    pub solar_system_id: i32,
    pub cost_indices: Vec<ActivityIndex>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityIndex {
    pub activity: String,
    pub cost_index: f64,
}

/// Fixed per-system record. Activities absent from the upstream list
/// stay at zero; activity names outside the four known ones are
/// dropped without complaint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SystemIndices {
    pub manufacturing: f64,
    pub invention: f64,
    pub reaction: f64,
    pub copy: f64,
}

pub async fn get_and_write(
    client: &EsiClient,
    token: &AccessToken,
    out_dir: &Path,
) -> Result<()> {
    let records = get_cost_indices(client, token).await?;
    let by_system = to_system_map(&records);
    let path = write_json(out_dir, "cost_indices.json", &by_system)?;
    log::info!("wrote cost indices for {} systems to {:?}", by_system.len(), path);
    Ok(())
}

/// Industry cost indices arrive on a single page.
pub async fn get_cost_indices(
    client: &EsiClient,
    token: &AccessToken,
) -> Result<Vec<CostIndexRecord>> {
    let url = format!("{ESI_BASE}/industry/systems/?{DATASOURCE}");
    let page = client
        .fetch_page::<Vec<CostIndexRecord>>(&url, None, token)
        .await?;
    Ok(page.records)
}

pub fn to_system_map(records: &[CostIndexRecord]) -> HashMap<i32, SystemIndices> {
    records
        .iter()
        .map(|record| {
            let mut indices = SystemIndices::default();
            for entry in &record.cost_indices {
                match entry.activity.as_str() {
                    "manufacturing" => indices.manufacturing = entry.cost_index,
                    "copying" => indices.copy = entry.cost_index,
                    "invention" => indices.invention = entry.cost_index,
                    "reaction" => indices.reaction = entry.cost_index,
                    _ => {}
                }
            }
            (record.solar_system_id, indices)
        })
        .collect()
}
