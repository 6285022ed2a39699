use anyhow::Result;
use futures_util::TryStreamExt;

use keymint_auth::oauth::{IssuanceEngine, TokenGrant};
use keymint_storage::Token;

use crate::cli::{ClientGrant, ExchangeArgs, GrantArgs, OutputFormat};
use crate::output::{TableRow, print_many, print_one};

impl TableRow for Token {
    const HEADER: &'static [&'static str] = &["Access Token", "Type", "Scope", "Refresh Token"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.access_token.clone(),
            self.token_type.to_string(),
            self.scope.clone(),
            self.refresh_token.clone(),
        ]
    }
}

pub async fn implicit(
    engine: &IssuanceEngine,
    client_id: &str,
    scope: &str,
    format: OutputFormat,
) -> Result<()> {
    let token = engine.generate_token(client_id, scope).await?;
    print_one(&token, format)
}

pub async fn exchange(engine: &IssuanceEngine, args: ExchangeArgs, format: OutputFormat) -> Result<()> {
    let token = engine
        .exchange(TokenGrant::AuthorizationCode {
            code: args.code,
            redirect_uri: args.redirect_uri,
            client_id: args.client_id,
            client_secret: args.client_secret,
            code_verifier: args.code_verifier,
        })
        .await?;
    print_one(&token, format)
}

pub async fn refresh(engine: &IssuanceEngine, refresh_token: String, format: OutputFormat) -> Result<()> {
    let token = engine
        .exchange(TokenGrant::RefreshToken { refresh_token })
        .await?;
    print_one(&token, format)
}

pub async fn grant(engine: &IssuanceEngine, args: GrantArgs, format: OutputFormat) -> Result<()> {
    let GrantArgs {
        grant_type,
        client_id,
        client_secret,
    } = args;
    let grant = match grant_type {
        ClientGrant::Password => TokenGrant::Password {
            client_id,
            client_secret,
        },
        ClientGrant::ClientCredentials => TokenGrant::ClientCredentials {
            client_id,
            client_secret,
        },
    };
    let token = engine.exchange(grant).await?;
    print_one(&token, format)
}

pub async fn list(engine: &IssuanceEngine, format: OutputFormat) -> Result<()> {
    let tokens: Vec<Token> = engine.list_tokens().try_collect().await?;
    print_many(&tokens, format)
}
