//! Relational row shapes shared by the SQL backends.
//!
//! Both SQL backends use the same three tables. The `SELECT_*` statements
//! carry no placeholders, so drivers append their own `WHERE` clause.

use time::OffsetDateTime;

use crate::types::{Client, Code, Token};
use crate::{StorageError, StorageResult};

pub const SELECT_CLIENTS: &str = "SELECT client_id, client_secret FROM oauth_clients";

pub const SELECT_CODES: &str = "SELECT code_id, client_id, callback_url, scope, \
     code_challenge, code_challenge_method, created_at FROM oauth_codes";

pub const SELECT_TOKENS: &str =
    "SELECT access_token, token_type, scope, refresh_token FROM oauth_tokens";

/// `(client_id, client_secret)`
pub type ClientRow = (String, String);

/// Columns in `SELECT_CODES` order.
pub type CodeRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    OffsetDateTime,
);

/// `(access_token, token_type, scope, refresh_token)`
pub type TokenRow = (String, String, String, String);

impl From<ClientRow> for Client {
    fn from((client_id, client_secret): ClientRow) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }
}

impl From<CodeRow> for Code {
    fn from(row: CodeRow) -> Self {
        let (code_id, client_id, callback_url, scope, challenge, method, created_at) = row;
        Self {
            code_id,
            client_id,
            callback_url,
            scope,
            code_challenge: challenge,
            code_challenge_method: method,
            created_at,
        }
    }
}

impl TryFrom<TokenRow> for Token {
    type Error = StorageError;

    fn try_from((access_token, token_type, scope, refresh_token): TokenRow) -> StorageResult<Self> {
        Ok(Self {
            access_token,
            token_type: token_type.parse()?,
            scope,
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenType;

    #[test]
    fn test_token_row_parses_type() {
        let row = ("at".into(), "Bearer".into(), "read".into(), "rt".into());
        let token = Token::try_from(row).unwrap();
        assert_eq!(token.token_type, TokenType::Bearer);

        let row = ("at".into(), "MAC".into(), "read".into(), "rt".into());
        let err = Token::try_from(row).unwrap_err();
        assert!(matches!(err, StorageError::InvalidData { .. }));
    }

    #[test]
    fn test_code_row_keeps_pkce_columns() {
        let row: CodeRow = (
            "c".into(),
            "client".into(),
            "https://cb".into(),
            "read".into(),
            Some("challenge".into()),
            None,
            OffsetDateTime::UNIX_EPOCH,
        );
        let code = Code::from(row);
        assert_eq!(code.code_challenge.as_deref(), Some("challenge"));
        assert!(code.code_challenge_method.is_none());
        assert_eq!(code.created_at, OffsetDateTime::UNIX_EPOCH);
    }
}
