//! CLI command handlers.

use std::path::Path;
use std::sync::Arc;

use super::{AuthorizeUrlArgs, SessionArgs};
use crate::auth::{
    AuthState, AuthorizationRequest, FileTokenStore, OAuthFactory, RequestContext,
    TokenStoreConfig,
};
use crate::config::{CredentialStore, FactorySettings};
use crate::error::OAuthError;
use crate::provider::ProtocolVariant;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Load credentials and open the file-backed token store.
///
/// Configuration errors here are fatal: the binary exits before serving anything.
pub fn load_factory(
    config: Option<&Path>,
    token_dir: Option<&Path>,
) -> Result<OAuthFactory, OAuthError> {
    let credentials = match config {
        Some(path) => CredentialStore::from_path(path)?,
        None => CredentialStore::from_env()?,
    };
    let store = match token_dir {
        Some(dir) => FileTokenStore::new(TokenStoreConfig::new(dir.to_path_buf())),
        None => FileTokenStore::new_default(),
    };
    OAuthFactory::with_settings(credentials, Arc::new(store), FactorySettings::from_env())
}

/// Handle `oauth-factory providers`.
pub fn handle_providers(factory: &OAuthFactory) -> CliResult {
    let registry = factory.registry();
    if registry.is_empty() {
        println!("No providers configured.");
        return Ok(());
    }
    for name in registry.names() {
        let provider = registry.resolve(name)?;
        let scopes = if provider.scopes.is_empty() {
            "-".to_string()
        } else {
            provider.scopes.join(" ")
        };
        println!("{name:<16} {:<7} {scopes}", provider.protocol);
    }
    Ok(())
}

/// Handle `oauth-factory authorize-url <provider>`.
pub fn handle_authorize_url(factory: &OAuthFactory, args: &AuthorizeUrlArgs) -> CliResult {
    let context = RequestContext::from_url(&args.request_uri)?;
    let client = factory.build(&args.provider, &context)?;

    let mut request = AuthorizationRequest::new();
    if args.pkce {
        if client.protocol() != ProtocolVariant::OAuth2 {
            return Err(format!("{} does not support PKCE", client.name()).into());
        }
        request = request.with_pkce();
    }
    if let Some(token) = &args.request_token {
        request = request.with_request_token(token.clone());
    }

    let url = client.authorization_url(&request)?;
    println!("Callback:  {}", client.callback_uri());
    println!("Authorize: {url}");
    println!("State:     {}", request.state);
    if let Some(pkce) = &request.pkce {
        println!("Verifier:  {}", pkce.secret());
    }
    Ok(())
}

/// Handle `oauth-factory status <provider> --session <id>`.
pub async fn handle_status(factory: &OAuthFactory, args: &SessionArgs) -> CliResult {
    let scope = factory.scope(RequestContext::from_url(&args.request_uri)?, args.session.clone());
    let authenticated = scope.is_authenticated(Some(args.provider.as_str())).await?;
    let state = scope.state(&args.provider).await?;
    let label = match (authenticated, state) {
        (true, _) => "authenticated",
        (false, AuthState::Expired) => "expired",
        (false, _) => "not authenticated",
    };
    println!("{}: {label}", args.provider.trim().to_ascii_lowercase());
    Ok(())
}

/// Handle `oauth-factory logout <provider> --session <id>`.
pub async fn handle_logout(factory: &OAuthFactory, args: &SessionArgs) -> CliResult {
    let scope = factory.scope(RequestContext::from_url(&args.request_uri)?, args.session.clone());
    scope.logout(&args.provider).await?;
    println!("Logged out of {}", args.provider.trim().to_ascii_lowercase());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Token, TokenStore};
    use tempfile::TempDir;

    fn write_config(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("credentials.toml");
        std::fs::write(
            &path,
            r#"
            [providers.github]
            key = "gh"
            secret = "s"
            "#,
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn load_factory_uses_file_config_and_token_dir() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir);
        let tokens = dir.path().join("tokens");
        let factory = load_factory(Some(config.as_path()), Some(tokens.as_path())).unwrap();
        assert_eq!(factory.registry().names(), vec!["github"]);

        let token = Token::new("a", "github", "s1");
        factory.token_store().put(&token.key(), &token).await.unwrap();
        assert!(tokens.join("github").is_dir());
    }

    #[test]
    fn load_factory_fails_fast_on_missing_config() {
        let dir = TempDir::new().unwrap();
        let err = load_factory(Some(dir.path().join("nope.toml").as_path()), Some(dir.path())).unwrap_err();
        assert!(matches!(err, OAuthError::Configuration(_)));
    }

    #[tokio::test]
    async fn logout_then_status_reports_not_authenticated() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir);
        let factory = load_factory(Some(config.as_path()), Some(dir.path())).unwrap();
        let token = Token::new("a", "github", "s1");
        factory.token_store().put(&token.key(), &token).await.unwrap();

        let args = SessionArgs {
            provider: "GitHub".into(),
            session: "s1".into(),
            request_uri: "http://localhost/".into(),
        };
        handle_logout(&factory, &args).await.unwrap();
        assert!(factory.token_store().get(&token.key()).await.unwrap().is_none());
        handle_status(&factory, &args).await.unwrap();
    }
}
