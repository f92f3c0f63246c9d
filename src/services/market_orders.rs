use std::collections::HashMap;
use std::path::Path;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::config::OrderFilter;
use crate::error::{AppError, Context, Result};
use crate::fetch::{self, AccessToken, EsiClient};
use crate::output::write_json;
use crate::services::{DATASOURCE, ESI_BASE};

/// One order from a region endpoint; the record names its station or
/// structure explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionOrder {
    pub location_id: i64,
    pub type_id: i32,
    pub price: f64,
    pub volume_remain: i64,
    #[serde(default)]
    pub is_buy_order: bool,
}

/// One order from a structure endpoint; the location is the queried
/// structure itself.
#[derive(Debug, Clone, Deserialize)]
pub struct StructureOrder {
    pub type_id: i32,
    pub price: f64,
    pub volume_remain: i64,
    pub is_buy_order: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderEntry {
    pub price: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeOrders {
    pub orders: Vec<OrderEntry>,
    pub total: u64,
}

/// Location -> type -> outstanding orders with their summed volume.
pub type OrderBook = HashMap<i64, HashMap<i32, TypeOrders>>;

pub async fn get_and_write(
    client: &EsiClient,
    token: &AccessToken,
    region_ids: &[i32],
    location_ids: &[i64],
    filter: &OrderFilter,
    out_dir: &Path,
) -> Result<()> {
    let (region_orders, structure_orders) =
        get_orders(client, token, region_ids, location_ids).await?;

    let book = aggregate_orders(&region_orders, &structure_orders, filter);
    let path = write_json(out_dir, "market_orders.json", &book)?;
    log::info!("wrote order book for {} locations to {:?}", book.len(), path);
    Ok(())
}

/// Download every configured region and structure concurrently. Each
/// source settles before the first failure is reported, so no paged
/// download is abandoned mid-flight, and errors name their source.
pub async fn get_orders(
    client: &EsiClient,
    token: &AccessToken,
    region_ids: &[i32],
    location_ids: &[i64],
) -> Result<(Vec<Vec<RegionOrder>>, HashMap<i64, Vec<StructureOrder>>)> {
    let region_fetches = region_ids.iter().map(|&region_id| async move {
        let url = format!("{ESI_BASE}/markets/{region_id}/orders/?{DATASOURCE}");
        let orders = fetch::fetch_all::<RegionOrder>(client, &url, token)
            .await
            .with_context(|| format!("Failed to fetch orders for region {}", region_id))?;
        log::debug!("region {}: {} orders", region_id, orders.len());
        Ok::<_, AppError>(orders)
    });

    let structure_fetches = location_ids.iter().map(|&location_id| async move {
        let url = format!("{ESI_BASE}/markets/structures/{location_id}/?{DATASOURCE}");
        let orders = fetch::fetch_all::<StructureOrder>(client, &url, token)
            .await
            .with_context(|| format!("Failed to fetch orders for structure {}", location_id))?;
        log::debug!("structure {}: {} orders", location_id, orders.len());
        Ok::<_, AppError>((location_id, orders))
    });

    let (region_results, structure_results) =
        tokio::join!(join_all(region_fetches), join_all(structure_fetches));

    let mut region_orders = Vec::with_capacity(region_results.len());
    for result in region_results {
        region_orders.push(result?);
    }

    let mut structure_orders = HashMap::with_capacity(structure_results.len());
    for result in structure_results {
        let (location_id, orders) = result?;
        structure_orders.insert(location_id, orders);
    }

    Ok((region_orders, structure_orders))
}

/// Merge every source into one book. Accumulation is keyed, so the
/// totals and entry sets come out the same whatever order the sources
/// merge in.
pub fn aggregate_orders(
    region_orders: &[Vec<RegionOrder>],
    structure_orders: &HashMap<i64, Vec<StructureOrder>>,
    filter: &OrderFilter,
) -> OrderBook {
    let mut book = OrderBook::new();
    for orders in region_orders {
        with_region_orders(&mut book, orders, filter);
    }
    for (&location_id, orders) in structure_orders {
        with_structure_orders(&mut book, orders, location_id, filter);
    }
    book
}

fn with_region_orders(book: &mut OrderBook, orders: &[RegionOrder], filter: &OrderFilter) {
    for order in orders {
        if !filter.retains(order.is_buy_order, order.volume_remain) {
            continue;
        }
        push_order(
            book,
            order.location_id,
            order.type_id,
            order.price,
            order.volume_remain,
        );
    }
}

fn with_structure_orders(
    book: &mut OrderBook,
    orders: &[StructureOrder],
    location_id: i64,
    filter: &OrderFilter,
) {
    for order in orders {
        if !filter.retains(order.is_buy_order, order.volume_remain) {
            continue;
        }
        push_order(book, location_id, order.type_id, order.price, order.volume_remain);
    }
}

fn push_order(book: &mut OrderBook, location_id: i64, type_id: i32, price: f64, volume: i64) {
    let volume = volume.max(0) as u64;
    let entry = book
        .entry(location_id)
        .or_default()
        .entry(type_id)
        .or_default();
    entry.orders.push(OrderEntry { price, volume });
    entry.total += volume;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_order(
        location_id: i64,
        type_id: i32,
        price: f64,
        volume_remain: i64,
        is_buy_order: bool,
    ) -> RegionOrder {
        RegionOrder {
            location_id,
            type_id,
            price,
            volume_remain,
            is_buy_order,
        }
    }

    fn structure_order(
        type_id: i32,
        price: f64,
        volume_remain: i64,
        is_buy_order: bool,
    ) -> StructureOrder {
        StructureOrder {
            type_id,
            price,
            volume_remain,
            is_buy_order,
        }
    }

    #[test]
    fn single_region_sell_order_forms_the_book() {
        let regions = vec![vec![region_order(60003760, 34, 5.0, 100, false)]];
        let structures = HashMap::new();

        let book = aggregate_orders(&regions, &structures, &OrderFilter::default());

        let orders = &book[&60003760][&34];
        assert_eq!(orders.orders, vec![OrderEntry { price: 5.0, volume: 100 }]);
        assert_eq!(orders.total, 100);
    }

    #[test]
    fn region_and_structure_orders_merge_per_location() {
        let regions = vec![vec![
            region_order(60003760, 34, 5.0, 100, false),
            region_order(60003760, 34, 5.5, 40, false),
        ]];
        let mut structures = HashMap::new();
        structures.insert(60003760, vec![structure_order(34, 4.9, 60, false)]);

        let book = aggregate_orders(&regions, &structures, &OrderFilter::default());

        let orders = &book[&60003760][&34];
        assert_eq!(orders.orders.len(), 3);
        assert_eq!(orders.total, 200);
    }

    #[test]
    fn defaults_drop_buy_and_empty_orders_from_both_sources() {
        let regions = vec![vec![
            region_order(60003760, 34, 5.0, 100, false),
            region_order(60003760, 34, 6.0, 50, true),
            region_order(60003760, 34, 5.2, 0, false),
        ]];
        let mut structures = HashMap::new();
        structures.insert(
            1035466617946,
            vec![
                structure_order(34, 4.8, 25, false),
                structure_order(34, 7.0, 80, true),
            ],
        );

        let book = aggregate_orders(&regions, &structures, &OrderFilter::default());

        assert_eq!(book[&60003760][&34].total, 100);
        assert_eq!(book[&60003760][&34].orders.len(), 1);
        assert_eq!(book[&1035466617946][&34].total, 25);
    }

    #[test]
    fn filter_override_retains_buy_orders() {
        let regions = vec![vec![
            region_order(60003760, 34, 5.0, 100, false),
            region_order(60003760, 34, 6.0, 50, true),
        ]];
        let filter = OrderFilter {
            include_buy_orders: true,
            include_empty_volume: false,
        };

        let book = aggregate_orders(&regions, &HashMap::new(), &filter);

        assert_eq!(book[&60003760][&34].orders.len(), 2);
        assert_eq!(book[&60003760][&34].total, 150);
    }

    #[test]
    fn totals_are_independent_of_merge_order() {
        let region_a = vec![
            region_order(100, 34, 5.0, 10, false),
            region_order(200, 35, 2.0, 7, false),
        ];
        let region_b = vec![region_order(100, 34, 4.5, 3, false)];
        let mut structures = HashMap::new();
        structures.insert(100, vec![structure_order(34, 4.0, 5, false)]);

        let filter = OrderFilter::default();
        let forward = aggregate_orders(
            &[region_a.clone(), region_b.clone()],
            &structures,
            &filter,
        );
        let reversed = aggregate_orders(&[region_b, region_a], &structures, &filter);

        for (location_id, types) in &forward {
            for (type_id, orders) in types {
                let other = &reversed[location_id][type_id];
                assert_eq!(orders.total, other.total);
                assert_eq!(orders.orders.len(), other.orders.len());
            }
        }
        assert_eq!(forward[&100][&34].total, 18);
        assert_eq!(forward[&200][&35].total, 7);
    }
}
