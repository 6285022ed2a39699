use anyhow::Result;
use futures_util::TryStreamExt;

use keymint_auth::oauth::IssuanceEngine;
use keymint_storage::Client;

use crate::cli::OutputFormat;
use crate::output::{TableRow, print_many, print_one, print_success};

impl TableRow for Client {
    const HEADER: &'static [&'static str] = &["Client ID", "Client Secret"];

    fn cells(&self) -> Vec<String> {
        vec![self.client_id.clone(), self.client_secret.clone()]
    }
}

pub async fn create(engine: &IssuanceEngine, format: OutputFormat) -> Result<()> {
    let client = engine.generate_client().await?;
    print_one(&client, format)
}

pub async fn list(engine: &IssuanceEngine, format: OutputFormat) -> Result<()> {
    let clients: Vec<Client> = engine.list_clients().try_collect().await?;
    print_many(&clients, format)
}

pub async fn delete(engine: &IssuanceEngine, client_id: &str) -> Result<()> {
    if !engine.store().delete_client(client_id).await? {
        anyhow::bail!("client not found: {client_id}");
    }
    print_success(&format!("Deleted client {client_id}"));
    Ok(())
}
