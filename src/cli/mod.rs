//! CLI entry point for oauth-factory.

pub mod auth;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Inspect provider configuration and stored OAuth sessions.
#[derive(Parser, Debug)]
#[command(name = "oauth-factory", version, about = "OAuth client factory CLI")]
pub struct Cli {
    /// Credentials TOML file (defaults to OAUTH_* environment variables)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory of the file-backed token store
    #[arg(long, global = true)]
    pub token_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configured providers
    Providers,
    /// Print the callback and authorization URL for a provider
    AuthorizeUrl(AuthorizeUrlArgs),
    /// Show whether a session is authenticated with a provider
    Status(SessionArgs),
    /// Remove a session's stored token for a provider
    Logout(SessionArgs),
}

/// Arguments for `oauth-factory authorize-url`.
#[derive(Parser, Debug)]
pub struct AuthorizeUrlArgs {
    /// Provider name (case-insensitive)
    pub provider: String,

    /// The inbound request URL the callback is derived from
    #[arg(long)]
    pub request_uri: String,

    /// Attach a PKCE S256 challenge (OAuth2 only)
    #[arg(long)]
    pub pkce: bool,

    /// Request token for OAuth1 providers
    #[arg(long)]
    pub request_token: Option<String>,
}

/// Arguments for commands acting on one (provider, session) pair.
#[derive(Parser, Debug)]
pub struct SessionArgs {
    /// Provider name (case-insensitive)
    pub provider: String,

    /// Session identifier the token is stored under
    #[arg(long)]
    pub session: String,

    #[arg(long, default_value = "http://localhost/")]
    pub request_uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_providers() {
        let cli = Cli::try_parse_from(["oauth-factory", "providers"]).unwrap();
        assert!(matches!(cli.command, Commands::Providers));
        assert!(cli.config.is_none());
    }

    #[test]
    fn parse_authorize_url_with_options() {
        let cli = Cli::try_parse_from([
            "oauth-factory",
            "--config",
            "creds.toml",
            "authorize-url",
            "GitHub",
            "--request-uri",
            "https://app.example/login?x=1",
            "--pkce",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("creds.toml")));
        match cli.command {
            Commands::AuthorizeUrl(args) => {
                assert_eq!(args.provider, "GitHub");
                assert_eq!(args.request_uri, "https://app.example/login?x=1");
                assert!(args.pkce);
                assert!(args.request_token.is_none());
            }
            other => panic!("expected AuthorizeUrl, got {other:?}"),
        }
    }

    #[test]
    fn parse_status_uses_default_request_uri() {
        let cli =
            Cli::try_parse_from(["oauth-factory", "status", "github", "--session", "s1"]).unwrap();
        match cli.command {
            Commands::Status(args) => {
                assert_eq!(args.session, "s1");
                assert_eq!(args.request_uri, "http://localhost/");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[test]
    fn parse_logout_requires_session() {
        assert!(Cli::try_parse_from(["oauth-factory", "logout", "github"]).is_err());
    }

    #[test]
    fn parse_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["oauth-factory"]).is_err());
    }
}
