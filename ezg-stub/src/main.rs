use clap::{Parser, ValueEnum};
use ezg_stub::StubMode;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Canonical,
    Fallback,
    NoMeshes,
    Fail,
}

#[derive(Parser, Debug)]
#[command(name = "ezg-stub", about = "Local stand-in for the head/electrode processing service")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    #[arg(long, value_enum, default_value_t = Mode::Canonical)]
    mode: Mode,

    /// Status returned in `fail` mode
    #[arg(long, default_value_t = 500)]
    fail_status: u16,

    /// Body returned in `fail` mode
    #[arg(long, default_value = "server overloaded")]
    fail_body: String,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mode = match args.mode {
        Mode::Canonical => StubMode::Canonical,
        Mode::Fallback => StubMode::Fallback,
        Mode::NoMeshes => StubMode::NoMeshes,
        Mode::Fail => StubMode::Fail {
            status: args.fail_status,
            body: args.fail_body,
        },
    };

    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, ?mode, "ezg-stub listening");
    ezg_stub::serve(listener, mode).await
}
