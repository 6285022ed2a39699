use anyhow::Result;
use serde_json::json;

use keymint_codec::CodecKey;

use crate::output::print_json;

pub fn generate() -> Result<()> {
    let key = CodecKey::generate();
    print_json(&json!({ "key": key.to_hex() }))
}
