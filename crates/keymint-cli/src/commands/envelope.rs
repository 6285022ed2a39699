use anyhow::{Result, anyhow};
use serde_json::json;

use keymint_cli::config::CodecConfig;

use crate::output::print_json;

pub fn seal(config: &CodecConfig, code: &str, redirect_uri: &str) -> Result<()> {
    let codec = config.build().map_err(|e| anyhow!(e))?;
    let envelope = codec.encode(code, redirect_uri)?;
    print_json(&json!({ "envelope": envelope }))
}

pub fn open(config: &CodecConfig, envelope: &str) -> Result<()> {
    let codec = config.build().map_err(|e| anyhow!(e))?;
    let decoded = codec.decode(envelope)?;
    print_json(&json!({
        "code": decoded.code,
        "redirect_uri": decoded.redirect_uri,
    }))
}
