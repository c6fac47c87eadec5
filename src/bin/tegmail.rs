use std::io::{self, Read};

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use log::{info, warn};

use tegmail::auth::credentials::{self, CredentialStore};
use tegmail::auth::manager::{self, HttpAuthorizer, TokenManager};
use tegmail::auth::oauth::OAuthClient;
use tegmail::auth::secrets;
use tegmail::config::load_config;
use tegmail::logging;
use tegmail::mail::error::MailError;
use tegmail::session::Session;
use tegmail::terminal::interrupt::Interrupt;
use tegmail::terminal::tui::TuiSurface;

#[derive(Parser)]
#[command(name = "tegmail")]
#[command(about = "Terminal client for a Gmail mailbox", long_about = None)]
struct Cli {
    /// Show key dispatch on the status line and log at debug level
    #[arg(long)]
    debug: bool,

    /// Credential identity to use instead of prompting
    #[arg(long)]
    identity: Option<String>,

    /// Print the authorization URL instead of opening a browser
    #[arg(long)]
    no_browser: bool,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Store the OAuth client secret in keyring
    SetClientSecret {
        #[arg(long)]
        client_id: String,
    },

    /// List stored credential identities
    Identities,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    run(cli).map_err(|e| eyre!("{e:#}"))
}

fn run(cli: Cli) -> Result<()> {
    match cli.cmd {
        Some(Command::SetClientSecret { client_id }) => {
            eprintln!("Paste client secret (end with Ctrl-D):");
            let mut secret = String::new();
            io::stdin().read_to_string(&mut secret)?;
            secrets::save_client_secret(&client_id, secret.trim())?;
            println!("Saved client secret for client_id {client_id}");
            return Ok(());
        }
        Some(Command::Identities) => {
            let store = CredentialStore::open(CredentialStore::default_dir()?)?;
            for name in store.identities()? {
                println!("{name}");
            }
            return Ok(());
        }
        None => {}
    }

    let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
    logging::init(&cfg.resolve_log_path()?, cli.debug)?;
    info!("starting tegmail");

    let store = CredentialStore::open(CredentialStore::default_dir()?)?;
    let identity = match cli.identity {
        Some(name) => {
            credentials::validate_identity(&name)?;
            name
        }
        None => credentials::prompt_identity(&store, &mut io::stdin().lock(), &mut io::stderr())?,
    };

    let oauth = OAuthClient::new(
        &cfg.client_id,
        secrets::resolve_client_secret(&cfg.client_id),
        &cfg.redirect_uri,
    )?
    .open_browser(!cli.no_browser);
    let tokens = TokenManager::new(oauth, store, identity);

    // Interactive authorization needs the plain terminal, so it happens
    // before the session takes the screen.
    let interrupt = Interrupt::install()?;
    match tokens.access_token_with(true, &|| interrupt.is_set()) {
        Ok(_) => info!("authorized as identity {}", tokens.identity()),
        // offline: the stored refresh token is retried by the connect loop
        Err(e) if manager::is_transient(&e) => warn!("token endpoint unreachable: {e:#}"),
        Err(e) => return Err(e),
    }

    let authorizer = HttpAuthorizer::new(tokens, cfg.request_timeout());
    let surface = TuiSurface::open(interrupt)?;
    let mut session = Session::new(
        Box::new(surface),
        Box::new(authorizer),
        cfg.session_settings(cli.debug),
    );

    let outcome = session.bootstrap().and_then(|()| session.run());
    session.close()?;
    match outcome {
        Err(e) if matches!(e.downcast_ref::<MailError>(), Some(MailError::Interrupted)) => {
            info!("interrupted while connecting");
            Ok(())
        }
        other => {
            info!("exiting");
            other
        }
    }
}
