//! Serve the micro-lang playground.
//!
//! ```ignore
//! RUST_LOG=info web --listen 127.0.0.1:3000
//! ```

use clap::Parser;
use micro_lang::eval::EvalConfig;

#[derive(Parser, Debug)]
#[command(about = "Serve the micro-lang playground")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// Most instructions a single run may execute.
    #[arg(long, default_value_t = 1_000_000)]
    max_steps: u64,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // install global collector configured based on RUST_LOG env var.
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = EvalConfig {
        max_steps: Some(args.max_steps),
        ..Default::default()
    };
    let server = micro_lang::web::get_server(config);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    tracing::info!("listening on {}", args.listen);
    axum::serve(listener, server).await
}
