use clap::Parser;
use nestegg::cli::Cli;
use nestegg::dispatcher;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr so `--json` output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }
    let json = cli.json;

    if let Err(e) = dispatcher::dispatch(cli).await {
        if json {
            println!("{}", serde_json::json!({ "detail": format!("{:#}", e) }));
        } else {
            use colored::Colorize;
            eprintln!("{} {:#}", "Error:".red().bold(), e);
        }
        std::process::exit(1);
    }
}
