use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use eve_industry_cli::cli::Cli;
use eve_industry_cli::config::Config;
use eve_industry_cli::fetch::{authenticate, EsiClient, RetryPolicy};
use eve_industry_cli::services::{adjusted_prices, assets, cost_indices, market_orders};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if !cli.any_operation() {
        bail!(
            "No operation selected; pass at least one of \
             --adjusted-prices, --cost-indices, --market-orders, --assets"
        );
    }

    let config = Config::load(&cli.config).context("Failed to load configuration")?;
    let client = EsiClient::new(RetryPolicy::from(&config.retry))?;

    let token = authenticate(
        client.http(),
        &config.client_id,
        &config.client_secret,
        &config.refresh_token,
    )
    .await
    .context("Failed to authenticate")?;
    log::info!("authenticated; token valid until {}", token.expires_at);

    let out_dir = PathBuf::from(&cli.output_dir);
    let mut tasks = Vec::new();

    if cli.adjusted_prices {
        let client = client.clone();
        let token = token.clone();
        let out_dir = out_dir.clone();
        tasks.push(tokio::spawn(async move {
            adjusted_prices::get_and_write(&client, &token, &out_dir).await
        }));
    }

    if cli.cost_indices {
        let client = client.clone();
        let token = token.clone();
        let out_dir = out_dir.clone();
        tasks.push(tokio::spawn(async move {
            cost_indices::get_and_write(&client, &token, &out_dir).await
        }));
    }

    if cli.market_orders {
        let client = client.clone();
        let token = token.clone();
        let out_dir = out_dir.clone();
        let region_ids = config.region_ids.clone();
        let location_ids = config.location_ids.clone();
        let filter = config.order_filter;
        tasks.push(tokio::spawn(async move {
            market_orders::get_and_write(
                &client,
                &token,
                &region_ids,
                &location_ids,
                &filter,
                &out_dir,
            )
            .await
        }));
    }

    if cli.assets {
        let client = client.clone();
        let token = token.clone();
        let out_dir = out_dir.clone();
        let corporation_id = config.corporation_id;
        tasks.push(tokio::spawn(async move {
            assets::get_and_write(&client, &token, corporation_id, &out_dir).await
        }));
    }

    // All selected operations run concurrently; the first failure
    // aborts the run and nothing further is written.
    for task in tasks {
        task.await??;
    }

    Ok(())
}
