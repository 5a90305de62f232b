use anyhow::{Context, Result};
use std::env;
use std::path::Path;

use banks_etl::{Pipeline, PipelineConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();

    // Optional single argument: JSON config file
    let config = match args.get(1) {
        Some(path) => PipelineConfig::from_json_file(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => PipelineConfig::default(),
    };

    run(config)
}

fn run(config: PipelineConfig) -> Result<()> {
    println!("🏦 Largest Banks ETL v{}", banks_etl::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Source: {}", config.url);
    println!("Table:  {} ({})", config.table_name, config.store_path.display());

    let pipeline = Pipeline::new(config);
    let report = pipeline.run().context("ETL run failed")?;

    println!("\n✓ Extracted {} banks", report.extracted);
    println!("✓ Loaded {} rows", report.loaded);
    println!(
        "✓ CSV written to {}",
        pipeline.config().output_path.display()
    );

    for result in &report.queries {
        println!("\n{}", result);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Process complete (log: {})", pipeline.config().log_path.display());

    Ok(())
}
