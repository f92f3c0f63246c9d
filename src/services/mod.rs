pub mod adjusted_prices;
pub mod assets;
pub mod cost_indices;
pub mod market_orders;

/// Root of the ESI REST surface. Every endpoint additionally pins the
/// `tranquility` datasource.
pub(crate) const ESI_BASE: &str = "https://esi.evetech.net/latest";

pub(crate) const DATASOURCE: &str = "datasource=tranquility";
