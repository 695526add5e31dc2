pub mod types;
pub mod config;
pub mod data;
pub mod topology;
pub mod classify;
pub mod processing;
pub mod spatial;
pub mod tooltip;
pub mod render;
pub mod raster;
pub mod server;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the datasets once and write index.html, map.svg and map.png
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the map, loading the datasets in the background
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    match &cli.command {
        Commands::Generate { config } => {
            let app_config = config::AppConfig::load_or_default(config)?;
            generate(&app_config).await?;
        }
        Commands::Serve { config } => {
            let app_config = config::AppConfig::load_or_default(config)?;
            server::start_server(app_config).await?;
        }
    }

    Ok(())
}

async fn generate(app_config: &config::AppConfig) -> anyhow::Result<()> {
    let out_dir = &app_config.output.dir;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;
    let index_path = out_dir.join("index.html");

    // A failed load leaves only the loading page behind, never a partial map.
    let model = match data::load_model(&app_config.input).await {
        Ok(model) => model,
        Err(e) => {
            error!(error = %e, "failed to load datasets; writing loading page only");
            write_file(&index_path, &render::render_loading_page())?;
            return Ok(());
        }
    };

    let idle = tooltip::HoverState::Idle;
    write_file(&index_path, &render::render_page(&model, &idle))?;
    write_file(&out_dir.join("map.svg"), &render::render_svg(&model, &idle))?;

    if app_config.output.png {
        raster::write_png(&model, app_config.output.png_scale, &out_dir.join("map.png"))?;
    }

    info!(dir = ?out_dir, counties = model.counties.len(), "generation complete");
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))?;
    info!(path = ?path, "wrote file");
    Ok(())
}
