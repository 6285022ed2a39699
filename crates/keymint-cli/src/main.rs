mod cli;
mod commands;
mod output;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use keymint_cli::{backend, load_config, observability};

use cli::{
    ClientCommands, Cli, CodeCommands, Commands, EnvelopeCommands, KeyCommands, TokenCommands,
};
use output::{print_error, print_success};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    let config = load_config(cli.config.as_deref())
        .map_err(|e| anyhow!(e))
        .context("failed to load configuration")?;
    observability::init_tracing_with_level(&config.logging.level);

    // Commands that never touch storage.
    match &cli.command {
        Commands::Key(KeyCommands::Generate) => return commands::key::generate(),
        Commands::Envelope(EnvelopeCommands::Seal(args)) => {
            return commands::envelope::seal(&config.codec, &args.code, &args.redirect_uri);
        }
        Commands::Envelope(EnvelopeCommands::Open(args)) => {
            return commands::envelope::open(&config.codec, &args.envelope);
        }
        Commands::Migrate => {
            let backend = backend::migrate(&config.storage)
                .await
                .context("migration failed")?;
            print_success(&format!("Migrations applied ({backend})"));
            return Ok(());
        }
        _ => {}
    }

    let engine = backend::open_engine(&config)
        .await
        .with_context(|| format!("failed to open {} store", config.storage.backend.as_str()))?;

    match cli.command {
        Commands::Client(cmd) => match cmd {
            ClientCommands::Create => commands::client::create(&engine, format).await,
            ClientCommands::List => commands::client::list(&engine, format).await,
            ClientCommands::Delete(args) => commands::client::delete(&engine, &args.client_id).await,
        },
        Commands::Code(cmd) => match cmd {
            CodeCommands::Issue(args) => commands::code::issue(&engine, &args, format).await,
            CodeCommands::List => commands::code::list(&engine, format).await,
            CodeCommands::Purge => commands::code::purge(&engine).await,
        },
        Commands::Token(cmd) => match cmd {
            TokenCommands::Implicit(args) => {
                commands::token::implicit(&engine, &args.client_id, &args.scope, format).await
            }
            TokenCommands::Exchange(args) => commands::token::exchange(&engine, args, format).await,
            TokenCommands::Refresh(args) => {
                commands::token::refresh(&engine, args.refresh_token, format).await
            }
            TokenCommands::Grant(args) => commands::token::grant(&engine, args, format).await,
            TokenCommands::List => commands::token::list(&engine, format).await,
        },
        Commands::Envelope(_) | Commands::Key(_) | Commands::Migrate => Ok(()),
    }
}
