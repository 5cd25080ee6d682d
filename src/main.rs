use anyhow::Context;
use clap::{Parser, Subcommand};
use sg_census_map::aggregate::AggregateResult;
use sg_census_map::{export, filter, server, AppConfig, CensusDataset, RegionSelection};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the dashboard metrics for a region
    Summary {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Region name, or "All"
        #[arg(short, long, default_value = "All")]
        region: RegionSelection,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List the region selector options
    Regions {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write the joined boundaries for a region as GeoJSON
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, default_value = "All")]
        region: RegionSelection,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Serve the read API for the dashboard
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Summary {
            config,
            region,
            json,
        } => {
            let (app_config, dataset) = load(config)?;
            let result = dataset.summarize(region, &app_config.processing);
            if *json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&result);
            }
        }
        Commands::Regions { config } => {
            let (_, dataset) = load(config)?;
            for option in filter::selector_options(dataset.records()) {
                println!("{}", option);
            }
        }
        Commands::Export {
            config,
            region,
            output,
        } => {
            let (_, dataset) = load(config)?;
            let filtered = dataset.filter(region);
            export::write_feature_collection(output, &filtered)?;
        }
        Commands::Serve { config } => {
            let (app_config, dataset) = load(config)?;
            server::start_server(app_config, dataset).await?;
        }
    }

    Ok(())
}

/// Any load or merge failure aborts startup.
fn load(path: &Path) -> anyhow::Result<(AppConfig, CensusDataset)> {
    info!("using config {:?}", path);
    let app_config = AppConfig::load_from_file(path)?;
    let dataset = CensusDataset::load(&app_config).context("Failed to load census dataset")?;
    info!(
        subzones = dataset.records().len(),
        nationwide_total = dataset.nationwide_total(),
        "dataset ready"
    );
    Ok((app_config, dataset))
}

fn print_summary(result: &AggregateResult) {
    println!("Region:       {}", result.region);
    println!("Population:   {}", format_count(result.total_population));
    println!("Districts:    {}", result.district_count);
    println!("Subzones:     {}", result.subzone_count);
    println!("Population %: {}", result.population_percentage);

    for breakdown in &result.breakdowns {
        println!();
        println!("{}", breakdown.name);
        for category in &breakdown.categories {
            println!("  {:<10} {:>12}", category.name, format_count(category.total));
        }
    }

    println!();
    if result.region == RegionSelection::ALL_LABEL {
        println!("Most populated subzones");
    } else {
        println!("Most populated subzones in {}", result.region);
    }
    for ranked in &result.top_subzones {
        let total = ranked
            .subzone_total
            .map(format_count)
            .unwrap_or_else(|| "-".to_string());
        println!("  {:>3}. {:<30} {:>12}", ranked.rank, ranked.subzone, total);
    }
}

/// Rounds to a whole number with thousands separators.
fn format_count(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if value < 0.0 && digits != "0" {
        out.insert(0, '-');
    }
    out
}
