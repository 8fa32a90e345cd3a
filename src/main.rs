use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};

use todo_server::server::{self, config, db::sqlite::SqlDB};

/// multi-user todo list server
#[derive(Parser, Debug)]
#[clap(name ="todo-server", author, version = env!("GIT_VERSION"), about, long_about = None)]
struct Options {
    /// enable debugging logs
    #[clap(short, long, action=ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// run the http server, applying pending migrations first
    Serve(ServeOptions),
    /// apply or revert database migrations
    Migrate(MigrateOptions),
}

#[derive(Args, Debug)]
struct ServeOptions {
    /// config file path
    #[clap(short, long)]
    config_path: String,
}

#[derive(Args, Debug)]
struct MigrateOptions {
    /// config file path
    #[clap(short, long)]
    config_path: String,

    /// revert every migration newer than this version instead of applying
    /// pending ones. 0 reverts everything
    #[clap(long)]
    revert_to: Option<i64>,
}

fn main() -> Result<()> {
    let opts = Options::parse();

    simple_logger::SimpleLogger::new()
        .with_utc_timestamps()
        .with_level({
            match opts.debug {
                0 => log::LevelFilter::Info,
                1 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            }
        })
        .with_module_level("sqlx", log::Level::Error.to_level_filter())
        .init()?;

    log::debug!("options: {:#?}", opts);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    match opts.command {
        Commands::Serve(opts) => rt.block_on(serve(opts)),
        Commands::Migrate(opts) => rt.block_on(migrate(opts)),
    }
}

async fn serve(opts: ServeOptions) -> Result<()> {
    let config = config::parse_config(&opts.config_path)
        .await
        .context("failed to parse config file")?;

    server::app(config).await
}

async fn migrate(opts: MigrateOptions) -> Result<()> {
    let config = config::parse_config(&opts.config_path)
        .await
        .context("failed to parse config file")?;

    let db = SqlDB::new(&config.database_url, config.max_connections)
        .await
        .context("failed to connect to database")?;

    match opts.revert_to {
        Some(version) => db.revert(version).await,
        None => db.migrate().await,
    }
    .context("failed to run migrations")
}
