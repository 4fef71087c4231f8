use std::io::IsTerminal;

use clap::{Parser, Subcommand};

use bilink::cli::output::{print_error, print_query_output, print_session, OutputMode};
use bilink::cli::query::{parse_bus_dt, run_query, Query};
use bilink::cli::session_cmd::{run_login, run_logout, run_refresh};
use bilink::cli::TenantContext;

#[derive(Parser)]
#[command(name = "bilink", version, about = "Sign in to the POS BI service and pull sales aggregates")]
struct Cli {
    /// Config file path (overrides discovery)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Tenant name from the config file
    #[arg(long, global = true, env = "BILINK_TENANT")]
    tenant: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with the configured credentials and store the session
    Login,

    /// Renew the stored session with its refresh token
    Refresh,

    /// Forget the stored session
    Logout,

    /// List locations visible to the tenant
    Locations,

    /// List revenue centers of a location
    #[command(name = "revenue-centers")]
    RevenueCenters {
        /// Location reference
        #[arg(long)]
        loc_ref: String,
    },

    /// Per-revenue-center totals for a business date
    #[command(name = "daily-totals")]
    DailyTotals {
        /// Location reference
        #[arg(long)]
        loc_ref: String,

        /// Business date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_bus_dt)]
        bus_dt: chrono::NaiveDate,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Display merged tenant config with secrets masked
    Show,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BILINK_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli).await {
        print_error(&e, json, std::io::stderr().is_terminal());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), bilink::BilinkError> {
    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Pretty
    };
    let config = cli.config.as_deref();
    let tenant = cli.tenant.as_deref();

    let query = match cli.command {
        Commands::Config {
            action: ConfigAction::Show,
        } => return bilink::cli::config_cmd::run_config_show(config),
        Commands::Login => {
            let ctx = TenantContext::load(config, tenant)?;
            let tokens = run_login(&ctx).await?;
            print_session(&ctx.name, "Signed in", &tokens, mode);
            return Ok(());
        }
        Commands::Refresh => {
            let ctx = TenantContext::load(config, tenant)?;
            let tokens = run_refresh(&ctx).await?;
            print_session(&ctx.name, "Session refreshed", &tokens, mode);
            return Ok(());
        }
        Commands::Logout => {
            let ctx = TenantContext::load(config, tenant)?;
            if run_logout(&ctx)? {
                println!("Signed out of '{}'", ctx.name);
            } else {
                println!("No stored session for '{}'", ctx.name);
            }
            return Ok(());
        }
        Commands::Locations => Query::Locations,
        Commands::RevenueCenters { loc_ref } => Query::RevenueCenters { loc_ref },
        Commands::DailyTotals { loc_ref, bus_dt } => Query::DailyTotals { loc_ref, bus_dt },
    };

    let ctx = TenantContext::load(config, tenant)?;
    let output = run_query(&ctx, &query).await?;
    print_query_output(&output, mode);
    Ok(())
}
