use anyhow::Result;
use futures_util::TryStreamExt;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;

use keymint_auth::oauth::{IssuanceEngine, PkceChallengeMethod, PkceVerifier};
use keymint_storage::Code;

use crate::cli::{CodeIssueArgs, OutputFormat};
use crate::output::{TableRow, print_json, print_many, print_one, print_success};

impl TableRow for Code {
    const HEADER: &'static [&'static str] =
        &["Code", "Client ID", "Redirect URI", "Scope", "PKCE", "Issued"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.code_id.clone(),
            self.client_id.clone(),
            self.callback_url.clone(),
            self.scope.clone(),
            match (&self.code_challenge, &self.code_challenge_method) {
                (None, _) => "-".to_string(),
                (Some(_), Some(method)) => method.clone(),
                (Some(_), None) => "plain".to_string(),
            },
            self.created_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| self.created_at.to_string()),
        ]
    }
}

/// A code together with the verifier generated for it by `--pkce`.
#[derive(Serialize)]
struct IssuedWithVerifier<'a> {
    #[serde(flatten)]
    code: &'a Code,
    code_verifier: &'a str,
}

pub async fn issue(engine: &IssuanceEngine, args: &CodeIssueArgs, format: OutputFormat) -> Result<()> {
    let generated = args.pkce.then(PkceVerifier::generate);
    let (challenge, method) = match &generated {
        Some(verifier) => {
            let method = PkceChallengeMethod::S256;
            (
                Some(method.challenge_for(verifier.as_str())),
                Some(method.as_str().to_string()),
            )
        }
        None => (args.code_challenge.clone(), args.code_challenge_method.clone()),
    };

    let code = engine
        .generate_code(
            &args.client_id,
            &args.redirect_uri,
            &args.scope,
            challenge.as_deref(),
            method.as_deref(),
        )
        .await?;

    match (generated, format) {
        (Some(verifier), OutputFormat::Json) => print_json(&IssuedWithVerifier {
            code: &code,
            code_verifier: verifier.as_str(),
        }),
        (Some(verifier), OutputFormat::Table) => {
            print_one(&code, format)?;
            println!("code_verifier: {}", verifier.as_str());
            Ok(())
        }
        (None, _) => print_one(&code, format),
    }
}

pub async fn list(engine: &IssuanceEngine, format: OutputFormat) -> Result<()> {
    let codes: Vec<Code> = engine.list_codes().try_collect().await?;
    print_many(&codes, format)
}

pub async fn purge(engine: &IssuanceEngine) -> Result<()> {
    let purged = engine.purge_expired_codes().await?;
    print_success(&format!("Purged {purged} expired code(s)"));
    Ok(())
}
