use std::num::NonZeroUsize;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use hammer::model::HeaderField;
use hammer::transport;
use hammer::{Coordinator, HttpTransport, RequestTemplate, RunConfig, TransportOptions};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of concurrent connections
    #[arg(short, long, default_value = "100")]
    concurrency: NonZeroUsize,

    /// Total number of requests
    #[arg(short = 'n', long, default_value_t = 100)]
    requests: u64,

    /// Number of runtime worker threads
    #[arg(long, default_value = "2")]
    cpus: NonZeroUsize,

    /// Use HTTP keep-alive
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    keep_alive: bool,

    /// Use HTTP compression
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    compress: bool,

    /// URL
    #[arg(short, long, default_value = "http://127.0.0.1/")]
    url: String,

    /// HTTP method (GET, POST, PUT, DELETE...)
    #[arg(short, long, default_value = "GET")]
    method: String,

    /// Request body
    #[arg(short, long, default_value = "")]
    body: String,

    /// HTTP authentication user name
    #[arg(long, default_value = "")]
    user: String,

    /// HTTP authentication password
    #[arg(long, default_value = "")]
    pass: String,

    /// Additional request header `name: value` (can be set multiple times)
    #[arg(short = 'H', long = "header")]
    headers: Vec<HeaderField>,

    /// Show a progress bar while requests are sent
    #[arg(long)]
    progress: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.cpus.get())
        .enable_all()
        .build()?;
    runtime.block_on(run(args))
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut template = RequestTemplate::new(args.method, args.url)
        .body(args.body)
        .headers(args.headers);
    if !args.user.is_empty() {
        template = template.basic_auth(args.user, args.pass);
    }
    transport::validate(&template)?;

    let transport = HttpTransport::new(&TransportOptions {
        keep_alive: args.keep_alive,
        compression: args.compress,
        ..TransportOptions::default()
    })?;

    let config = RunConfig {
        concurrency: args.concurrency,
        requests: args.requests,
        show_progress: args.progress,
    };

    let result = Coordinator::new(config, template, transport).run().await?;

    let failed = result.failed_workers().count();
    if failed > 0 {
        tracing::warn!(
            failed_workers = failed,
            completed = result.completed(),
            requested = result.requested(),
            "some workers stopped early"
        );
    }
    println!("{result}");

    Ok(())
}
