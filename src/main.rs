use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use reportsmith::AppServices;
use reportsmith::cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // .env 中的 API KEY 等配置，文件不存在时忽略
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_filter = if args.verbose {
        "reportsmith=debug,tower_http=debug"
    } else {
        "reportsmith=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = args.into_config()?;
    let services = AppServices::from_config(config)?;

    reportsmith::serve(services).await
}
