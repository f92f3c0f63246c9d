use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::fetch::{self, AccessToken, EsiClient};
use crate::output::write_json;
use crate::services::{DATASOURCE, ESI_BASE};

/// Containment chains deeper than this indicate a cycle in the asset
/// data; the walk refuses to follow them further.
const MAX_CONTAINMENT_DEPTH: usize = 128;

#[derive(Debug, Clone, Deserialize)]
pub struct AssetRecord {
    pub item_id: i64,
    pub location_id: i64,
    pub quantity: i64,
    pub type_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlueprintRecord {
    pub item_id: i64,
    pub runs: i32,
    pub material_efficiency: i32,
    pub time_efficiency: i32,
}

/// Grouping key for the aggregated output: assets of the same type
/// with identical blueprint stats are fungible and sum together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AssetKey {
    pub type_id: i32,
    pub runs: i32,
    #[serde(rename = "me")]
    pub material_efficiency: i32,
    #[serde(rename = "te")]
    pub time_efficiency: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationAsset {
    #[serde(flatten)]
    pub key: AssetKey,
    pub quantity: i64,
}

pub type LocationAssets = HashMap<i64, Vec<LocationAsset>>;

pub async fn get_and_write(
    client: &EsiClient,
    token: &AccessToken,
    corporation_id: i64,
    out_dir: &Path,
) -> Result<()> {
    let (assets, blueprints) = get_assets_and_blueprints(client, token, corporation_id).await?;
    log::info!(
        "corporation {}: {} assets, {} blueprints",
        corporation_id,
        assets.len(),
        blueprints.len()
    );

    let by_location = resolve_locations(&assets, &blueprints)?;
    let path = write_json(out_dir, "assets.json", &by_location)?;
    log::info!("wrote assets for {} locations to {:?}", by_location.len(), path);
    Ok(())
}

/// Both collections download concurrently; each must succeed in full
/// before the transform runs. `join!` waits for both sides, so a
/// failure on one never strands the other's page workers.
pub async fn get_assets_and_blueprints(
    client: &EsiClient,
    token: &AccessToken,
    corporation_id: i64,
) -> Result<(Vec<AssetRecord>, Vec<BlueprintRecord>)> {
    let assets_url = format!("{ESI_BASE}/corporations/{corporation_id}/assets/?{DATASOURCE}");
    let blueprints_url =
        format!("{ESI_BASE}/corporations/{corporation_id}/blueprints/?{DATASOURCE}");

    let (assets, blueprints) = tokio::join!(
        fetch::fetch_all::<AssetRecord>(client, &assets_url, token),
        fetch::fetch_all::<BlueprintRecord>(client, &blueprints_url, token),
    );

    Ok((assets?, blueprints?))
}

/// Resolve every asset to its outermost container and aggregate
/// quantities per (root location, asset key).
pub fn resolve_locations(
    assets: &[AssetRecord],
    blueprints: &[BlueprintRecord],
) -> Result<LocationAssets> {
    let asset_by_item: HashMap<i64, &AssetRecord> =
        assets.iter().map(|asset| (asset.item_id, asset)).collect();
    let blueprint_by_item: HashMap<i64, &BlueprintRecord> = blueprints
        .iter()
        .map(|blueprint| (blueprint.item_id, blueprint))
        .collect();

    let mut aggregate: HashMap<i64, HashMap<AssetKey, i64>> = HashMap::new();

    for asset in assets {
        let key = match blueprint_by_item.get(&asset.item_id) {
            Some(blueprint) => AssetKey {
                type_id: asset.type_id,
                runs: blueprint.runs,
                material_efficiency: blueprint.material_efficiency,
                time_efficiency: blueprint.time_efficiency,
            },
            None => AssetKey {
                type_id: asset.type_id,
                runs: 0,
                material_efficiency: 0,
                time_efficiency: 0,
            },
        };

        let root = resolve_root(asset, &asset_by_item)?;
        *aggregate.entry(root).or_default().entry(key).or_insert(0) += asset.quantity;
    }

    Ok(aggregate
        .into_iter()
        .map(|(location_id, keyed)| {
            let entries = keyed
                .into_iter()
                .map(|(key, quantity)| LocationAsset { key, quantity })
                .collect();
            (location_id, entries)
        })
        .collect())
}

/// Follow containment references until an id that is not itself an
/// asset: the station, structure, or solar system holding the item.
fn resolve_root(asset: &AssetRecord, asset_by_item: &HashMap<i64, &AssetRecord>) -> Result<i64> {
    let mut current = asset.location_id;
    let mut depth = 0;
    while let Some(parent) = asset_by_item.get(&current) {
        current = parent.location_id;
        depth += 1;
        if depth > MAX_CONTAINMENT_DEPTH {
            return Err(AppError::message(format!(
                "containment chain for item {} exceeds {} levels; asset data is cyclic or corrupt",
                asset.item_id, MAX_CONTAINMENT_DEPTH
            )));
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(item_id: i64, location_id: i64, quantity: i64, type_id: i32) -> AssetRecord {
        AssetRecord {
            item_id,
            location_id,
            quantity,
            type_id,
        }
    }

    #[test]
    fn nested_items_resolve_to_the_outermost_container() {
        // Item 2 sits inside item 1, which sits in station 100.
        let assets = vec![asset(1, 100, 5, 10), asset(2, 1, 1, 20)];

        let by_location = resolve_locations(&assets, &[]).unwrap();

        assert_eq!(by_location.len(), 1);
        let entries = &by_location[&100];
        assert_eq!(entries.len(), 2);

        let find = |type_id: i32| entries.iter().find(|e| e.key.type_id == type_id).unwrap();
        let container = find(10);
        assert_eq!(container.quantity, 5);
        assert_eq!((container.key.runs, container.key.material_efficiency), (0, 0));
        assert_eq!(find(20).quantity, 1);
    }

    #[test]
    fn blueprint_stats_attach_to_matching_items() {
        let assets = vec![asset(7, 100, 1, 999)];
        let blueprints = vec![BlueprintRecord {
            item_id: 7,
            runs: 10,
            material_efficiency: 10,
            time_efficiency: 20,
        }];

        let by_location = resolve_locations(&assets, &blueprints).unwrap();
        let entry = &by_location[&100][0];

        assert_eq!(entry.key.runs, 10);
        assert_eq!(entry.key.material_efficiency, 10);
        assert_eq!(entry.key.time_efficiency, 20);
    }

    #[test]
    fn fungible_assets_sum_into_one_entry() {
        // Two stacks of the same type, one nested, no blueprint stats:
        // identical keys, so a single summed entry.
        let assets = vec![
            asset(1, 100, 5, 34),
            asset(2, 100, 3, 50),
            asset(3, 2, 7, 34),
        ];

        let by_location = resolve_locations(&assets, &[]).unwrap();
        let entries = &by_location[&100];

        assert_eq!(entries.len(), 2);
        let merged = entries.iter().find(|e| e.key.type_id == 34).unwrap();
        assert_eq!(merged.quantity, 12);
    }

    #[test]
    fn total_quantity_is_conserved() {
        let assets = vec![
            asset(1, 100, 5, 10),
            asset(2, 1, 3, 20),
            asset(3, 200, 11, 10),
            asset(4, 3, 2, 20),
        ];

        let by_location = resolve_locations(&assets, &[]).unwrap();

        let output_total: i64 = by_location
            .values()
            .flat_map(|entries| entries.iter().map(|e| e.quantity))
            .sum();
        let input_total: i64 = assets.iter().map(|a| a.quantity).sum();
        assert_eq!(output_total, input_total);
    }

    #[test]
    fn root_locations_are_never_asset_items() {
        let assets = vec![
            asset(1, 100, 1, 10),
            asset(2, 1, 1, 20),
            asset(3, 2, 1, 30),
        ];

        let by_location = resolve_locations(&assets, &[]).unwrap();

        for root in by_location.keys() {
            assert!(assets.iter().all(|a| a.item_id != *root));
        }
    }

    #[test]
    fn containment_cycle_is_reported_not_followed_forever() {
        // 1 and 2 claim to contain each other.
        let assets = vec![asset(1, 2, 1, 10), asset(2, 1, 1, 20)];

        let err = resolve_locations(&assets, &[]).unwrap_err();

        assert!(err.to_string().contains("cyclic"));
    }
}
