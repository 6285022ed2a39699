use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "keymint")]
#[command(about = "Keymint: issue and redeem OAuth 2.0 credentials")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the config file (defaults to ./keymint.toml if present)
    #[arg(short, long, global = true, env = "KEYMINT_CONFIG")]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage registered clients
    #[command(subcommand)]
    Client(ClientCommands),
    /// Issue and inspect authorization codes
    #[command(subcommand)]
    Code(CodeCommands),
    /// Mint, redeem and rotate tokens
    #[command(subcommand)]
    Token(TokenCommands),
    /// Seal and open stateless code envelopes
    #[command(subcommand)]
    Envelope(EnvelopeCommands),
    /// Codec key utilities
    #[command(subcommand)]
    Key(KeyCommands),
    /// Apply pending storage migrations
    Migrate,
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Register a client with a generated id and secret
    Create,
    /// List registered clients
    List,
    /// Delete a client and its outstanding codes
    Delete(ClientDeleteArgs),
}

#[derive(clap::Args)]
pub struct ClientDeleteArgs {
    /// Client ID
    pub client_id: String,
}

#[derive(Subcommand)]
pub enum CodeCommands {
    /// Issue an authorization code
    Issue(CodeIssueArgs),
    /// List outstanding codes
    List,
    /// Delete codes older than oauth.code_lifetime
    Purge,
}

#[derive(clap::Args)]
pub struct CodeIssueArgs {
    /// Client the code is bound to
    #[arg(long)]
    pub client_id: String,
    /// Redirect URI the code is bound to
    #[arg(long)]
    pub redirect_uri: String,
    /// Granted scope
    #[arg(long, default_value = "default")]
    pub scope: String,
    /// PKCE code challenge
    #[arg(long, conflicts_with = "pkce")]
    pub code_challenge: Option<String>,
    /// PKCE challenge method (S256 or plain)
    #[arg(long, requires = "code_challenge")]
    pub code_challenge_method: Option<String>,
    /// Generate an S256 verifier/challenge pair and print the verifier
    #[arg(long)]
    pub pkce: bool,
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Mint a token directly (implicit grant)
    Implicit(ImplicitArgs),
    /// Redeem an authorization code
    Exchange(ExchangeArgs),
    /// Rotate a token pair
    Refresh(RefreshArgs),
    /// Mint a token with client credentials
    Grant(GrantArgs),
    /// List live tokens
    List,
}

#[derive(clap::Args)]
pub struct ImplicitArgs {
    #[arg(long)]
    pub client_id: String,
    #[arg(long, default_value = "default")]
    pub scope: String,
}

#[derive(clap::Args)]
pub struct ExchangeArgs {
    /// Authorization code id
    #[arg(long)]
    pub code: String,
    #[arg(long)]
    pub redirect_uri: String,
    #[arg(long)]
    pub client_id: String,
    #[arg(long, env = "KEYMINT_CLIENT_SECRET")]
    pub client_secret: String,
    /// PKCE code verifier
    #[arg(long)]
    pub code_verifier: Option<String>,
}

#[derive(clap::Args)]
pub struct RefreshArgs {
    /// Refresh token to rotate
    pub refresh_token: String,
}

#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ClientGrant {
    Password,
    ClientCredentials,
}

#[derive(clap::Args)]
pub struct GrantArgs {
    #[arg(long, value_enum)]
    pub grant_type: ClientGrant,
    #[arg(long)]
    pub client_id: String,
    #[arg(long, env = "KEYMINT_CLIENT_SECRET")]
    pub client_secret: String,
}

#[derive(Subcommand)]
pub enum EnvelopeCommands {
    /// Seal a code and redirect URI into an envelope
    Seal(SealArgs),
    /// Open an envelope
    Open(OpenArgs),
}

#[derive(clap::Args)]
pub struct SealArgs {
    #[arg(long)]
    pub code: String,
    #[arg(long)]
    pub redirect_uri: String,
}

#[derive(clap::Args)]
pub struct OpenArgs {
    pub envelope: String,
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Print a fresh random codec key
    Generate,
}
