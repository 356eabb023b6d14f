use clap::Parser;
use print_catalog::{
    AppConfig,
    models::ModelRow,
    supabase::{ModelTable, PostgrestModelTable, SupabaseClient},
};
use std::{path::PathBuf, process::ExitCode};

/// Loads a JSON catalog into the remote `models` table in one insert.
#[derive(Parser)]
#[command(name = "seed-models", version, about = "Seed the models table from a JSON file")]
struct Cli {
    /// JSON array of model rows
    #[arg(long, default_value = "data/models.json")]
    file: PathBuf,

    /// Parse and report without inserting
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let raw = match std::fs::read_to_string(&cli.file) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!("cannot read {}: {}", cli.file.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let rows: Vec<ModelRow> = match serde_json::from_str(&raw) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("{} is not a valid model list: {}", cli.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Inserting {} models...", rows.len());
    if cli.dry_run {
        tracing::info!("dry run, nothing inserted");
        return ExitCode::SUCCESS;
    }

    let config = AppConfig::load();
    let supabase = SupabaseClient::new(&config.supabase_url, &config.supabase_anon_key)
        .with_service_key(config.supabase_service_key);
    let table = PostgrestModelTable::new(supabase);

    match table.insert(&rows).await {
        Ok(inserted) => {
            tracing::info!("Successfully inserted {} models", inserted.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(code = ?e.code, "insert failed: {}", e);
            tracing::error!("check that the `models` table exists with the expected columns");
            ExitCode::FAILURE
        }
    }
}
