use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use policy_domains::{api, config::ServiceConfig, db::Database};

#[derive(Parser)]
#[command(name = "policy-domains")]
#[command(about = "Policy administration service for isolated policy domains")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Apply pending database migrations and exit
    Migrate {
        /// SQLite database file
        #[arg(long, env = "POLICY_DOMAINS_DB")]
        db: Option<PathBuf>,
    },
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Port for HTTP API
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// SQLite database file
    #[arg(long, env = "POLICY_DOMAINS_DB")]
    db: Option<PathBuf>,

    /// Resource id granting access to every domain
    #[arg(long)]
    any_resource_id: Option<String>,

    /// Trusted header carrying the caller's authorized resource ids
    #[arg(long)]
    authz_header: Option<String>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "policy_domains=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = ServiceConfig::from_env();
    if args.any_resource_id.is_some() {
        config.any_resource_id = args.any_resource_id;
    }
    if args.authz_header.is_some() {
        config.authz_header = args.authz_header;
    }

    match (&config.authz_header, &config.any_resource_id) {
        (None, None) => tracing::warn!("No authorization header configured; every caller sees every domain"),
        (None, Some(_)) => tracing::warn!("Wildcard configured without an authorization header; domain listings will be empty"),
        _ => {}
    }

    let db = open_database(args.db)?.with_preset_policies(config.preset_policies.clone());
    let app = api::create_router(db, &config)?;

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Policy domains server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve(args)) => serve(args).await?,
        Some(Commands::Migrate { db }) => {
            open_database(db)?;
            tracing::info!("Database is up to date");
        }
        None => {
            serve(ServeArgs {
                port: 8080,
                bind: "127.0.0.1".to_string(),
                db: std::env::var_os("POLICY_DOMAINS_DB").map(PathBuf::from),
                ..ServeArgs::default()
            })
            .await?
        }
    }

    Ok(())
}
