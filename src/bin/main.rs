use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "movieproxy-server")]
#[command(about = "Movie catalog proxy with comments and a most-discussed ranking", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "movieproxy-server.yaml")]
    config: String,

    /// Log at debug level regardless of RUST_LOG.
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = if args.debug {
        tracing_subscriber::EnvFilter::new("movieproxy_rs=debug,tower_http=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "movieproxy_rs=info,tower_http=info".into())
    };

    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = movieproxy_rs::run(&args.config, args.debug).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
