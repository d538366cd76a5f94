use clap::Parser;
use log::{error, info};
use salary_dashboard::app::{self, AppState};
use salary_dashboard::config::{Cli, DbCredentials, TableName};
use salary_dashboard::error::Result;
use salary_dashboard::loader;
use salary_dashboard::store::{PgSalaryStore, SalaryStore};
use std::sync::Arc;

async fn open_store(cli: &Cli) -> Result<Arc<dyn SalaryStore>> {
    if let Some(path) = &cli.csv {
        return Ok(Arc::new(loader::from_csv(path)?));
    }

    let table = TableName::parse(&cli.table)?;
    let credentials = if cli.use_env {
        DbCredentials::from_env()?
    } else {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        DbCredentials::prompt(&mut input, &mut output, |key| std::env::var(key).ok())?
    };

    Ok(Arc::new(PgSalaryStore::connect(&credentials, table).await?))
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let store = match open_store(&cli).await {
        Ok(store) => store,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let state = AppState::new(store, cli.page_size)?;
    info!("Starting salary dashboard");
    app::run(state, &cli.bind).await?;

    Ok(())
}
