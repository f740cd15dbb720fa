use clap::Parser;
use foodgram::db::services::import_service;
use foodgram::db::{self, schema};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Seeds the ingredient and tag catalogs from `ingredients.json` and `tags.json`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing the JSON files
    #[arg(short, long, default_value = "data")]
    dir: PathBuf,

    /// Database to seed; falls back to DATABASE_URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn")),
        )
        .init();

    let db_pool = db::connect(&args.database_url).await?;
    schema::create_schema(&db_pool).await?;

    info!(dir = %args.dir.display(), "Importing catalog data.");
    let summary = import_service::import_catalog(&db_pool, &args.dir).await?;
    println!(
        "Ingredients: {} created, {} already present. Tags: {} created, {} already present.",
        summary.ingredients_created,
        summary.ingredients_existing,
        summary.tags_created,
        summary.tags_existing
    );
    Ok(())
}
