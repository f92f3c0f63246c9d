use clap::Parser;

#[derive(Parser)]
#[command(name = "eve-industry-cli")]
#[command(about = "Fetch EVE Online market and industry data into JSON snapshots")]
#[command(version)]
pub struct Cli {
    /// Fetch market-wide adjusted prices
    #[arg(long)]
    pub adjusted_prices: bool,

    /// Fetch per-system industry cost indices
    #[arg(long)]
    pub cost_indices: bool,

    /// Fetch market orders for the configured regions and structures
    #[arg(long)]
    pub market_orders: bool,

    /// Fetch corporation assets and blueprints
    #[arg(long)]
    pub assets: bool,

    #[arg(short, long, default_value = "config.json")]
    pub config: String,

    #[arg(short, long, default_value = ".")]
    pub output_dir: String,
}

impl Cli {
    pub fn any_operation(&self) -> bool {
        self.adjusted_prices || self.cost_indices || self.market_orders || self.assets
    }
}
