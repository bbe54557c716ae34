use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use layerstore::cli::{Cli, Command};
use layerstore::config::Config;
use layerstore::{DirStore, FeatureStore, geojson, layer_stats};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store_path = cli.store.unwrap_or(config.store_path);

    info!("layerstore starting");

    // Every command only reads, so a missing store is an error rather than created
    let store = DirStore::open_existing(&store_path)
        .context(format!("Failed to open store at {}", store_path.display()))?;

    match cli.command {
        Command::List => {
            let names = store.layer_names()?;
            if names.is_empty() {
                println!("No layers found");
            } else {
                for name in names {
                    if let Some(layer) = store.find_layer(&name)? {
                        println!("{} ({}, {})", name.cyan(), layer.geometry, layer.crs.dimmed());
                    }
                }
            }
        }
        Command::Show { layer, limit } => {
            let info = store
                .find_layer(&layer)?
                .ok_or_else(|| eyre::eyre!("Layer not found: {}", layer))?;
            println!("Layer: {} ({}, {})", info.name.cyan(), info.geometry, info.crs);
            for field in &info.fields {
                println!("  {} {}", field.name.yellow(), field.field_type.to_string().dimmed());
            }
            for feature in store.features(&layer)?.iter().take(limit) {
                let coords: Vec<String> = feature
                    .geometry
                    .coords()
                    .iter()
                    .map(|c| format!("({}, {})", c.x, c.y))
                    .collect();
                let attrs: Vec<String> = feature
                    .attributes
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                println!("{} {} {}", feature.id.to_string().dimmed(), coords.join(" "), attrs.join(" "));
            }
        }
        Command::Stats { layer } => {
            let stats = layer_stats(&store, &layer)?;
            println!("Layer: {}", layer.cyan());
            println!("  Features: {}", stats.feature_count);
            match stats.bounds {
                Some(b) => println!("  Extent: {} {} {} {}", b.min_x, b.min_y, b.max_x, b.max_y),
                None => println!("  Extent: empty"),
            }
        }
        Command::Export { layer, output } => {
            let info = store
                .find_layer(&layer)?
                .ok_or_else(|| eyre::eyre!("Layer not found: {}", layer))?;
            let collection = geojson::to_feature_collection(&info, &store.features(&layer)?);
            let content = if config.pretty_export {
                serde_json::to_string_pretty(&collection)?
            } else {
                serde_json::to_string(&collection)?
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, content).context(format!("Failed to write {}", path.display()))?;
                    println!("{} Exported {} to {}", "✓".green(), layer.cyan(), path.display());
                }
                None => println!("{}", content),
            }
        }
    }

    Ok(())
}
