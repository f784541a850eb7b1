//! `loomworks-seed`: loads default dropdown options and demo data into the
//! Postgres stores.

mod demo;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use uuid::Uuid;

use loomworks_core::TenantId;
use loomworks_infra::{
    AppConfig, ConfigError,
    dropdowns::{DropdownStore, PostgresDropdownStore},
    event_store::PostgresEventStore,
};
use loomworks_observability::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "loomworks-seed", about = "Seed Loomworks tenant data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert the built-in dropdown options for a tenant.
    Dropdowns {
        #[arg(long)]
        tenant: Uuid,
        /// Delete the tenant's existing options first.
        #[arg(long)]
        reset: bool,
    },

    /// Append demo suppliers, raw materials and a draft purchase order.
    Demo {
        #[arg(long)]
        tenant: Uuid,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            loomworks_observability::init(LogFormat::default());
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    loomworks_observability::init(config.log_format);

    if let Err(e) = run(cli.command, &config).await {
        tracing::error!(error = ?e, "seeding failed");
        std::process::exit(1);
    }
}

async fn run(command: Command, config: &AppConfig) -> anyhow::Result<()> {
    let url = config
        .database_url
        .as_deref()
        .ok_or(ConfigError::Missing("DATABASE_URL"))?;
    let pool = PgPool::connect(url).await.context("failed to connect to postgres")?;

    match command {
        Command::Dropdowns { tenant, reset } => {
            let tenant_id = TenantId::from_uuid(tenant);
            let store = PostgresDropdownStore::new(pool);
            store.ensure_schema().await?;

            if reset {
                let removed = store.clear(tenant_id).await?;
                tracing::info!(%tenant_id, removed, "dropdown options cleared");
            }
            let added = store.seed_defaults(tenant_id).await?;
            tracing::info!(%tenant_id, added, "dropdown options seeded");
        }
        Command::Demo { tenant } => {
            let tenant_id = TenantId::from_uuid(tenant);
            let store = PostgresEventStore::new(pool);
            store.ensure_schema().await?;

            let summary = demo::seed(store, tenant_id).await?;
            tracing::info!(
                %tenant_id,
                suppliers = summary.suppliers,
                materials = summary.materials,
                po_number = %summary.po_number,
                "demo data seeded"
            );
        }
    }
    Ok(())
}
