//! oauth-factory CLI binary entry point.

use clap::Parser;
use oauth_factory::cli::{auth, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let factory = match auth::load_factory(cli.config.as_deref(), cli.token_dir.as_deref()) {
        Ok(factory) => factory,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    let result = match &cli.command {
        Commands::Providers => auth::handle_providers(&factory),
        Commands::AuthorizeUrl(args) => auth::handle_authorize_url(&factory, args),
        Commands::Status(args) => auth::handle_status(&factory, args).await,
        Commands::Logout(args) => auth::handle_logout(&factory, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
