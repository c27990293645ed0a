mod account;
mod config;
mod join;
mod prompt;
mod site;

use clap::{Parser, Subcommand};
use clubhouse_backend::RestBackend;
use clubhouse_runtime_config::ClubConfig;
use std::io::Write;

use prompt::Terminal;

#[derive(Parser)]
#[command(name = "clubhouse", about = "clubhouse CLI - enroll, sign in, and browse member projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll as a member with an invite code
    Join,

    /// Check email and password and show the member (no session is stored)
    Login {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// Mail a password recovery link
    ForgotPassword {
        /// Account email (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// Set a new password using the token from a recovery link
    ResetPassword {
        /// Access token carried by the recovery link
        #[arg(long)]
        token: String,
    },

    /// Send a message to the club
    Contact,

    /// List member projects
    Projects,

    /// Show or set configuration
    Config {
        /// Set the backend project URL
        #[arg(long)]
        backend_url: Option<String>,

        /// Set the backend anon key
        #[arg(long)]
        anon_key: Option<String>,

        /// Set the public site URL used in recovery links
        #[arg(long)]
        site_url: Option<String>,
    },
}

fn connect() -> anyhow::Result<(ClubConfig, RestBackend)> {
    let cfg = config::load_config()?;
    let backend = config::connect(&cfg)?;
    Ok((cfg, backend))
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let mut prompt = Terminal;
    let mut out = std::io::stdout().lock();

    match command {
        Commands::Join => {
            let (_, backend) = connect()?;
            let done = join::run_join(&backend, &mut prompt, &mut out).await?;
            if !done.invite_consumed {
                writeln!(
                    out,
                    "note: your account is active but the invite code was not retired. \
                     please tell an admin."
                )?;
            }
            writeln!(out, "welcome aboard. sign in with `clubhouse login`.")?;
        }
        Commands::Login { email } => {
            let (_, backend) = connect()?;
            account::run_login(&backend, email, &mut prompt, &mut out).await?;
        }
        Commands::ForgotPassword { email } => {
            let (cfg, backend) = connect()?;
            account::run_forgot_password(
                &backend,
                &cfg.site.base_url,
                email,
                &mut prompt,
                &mut out,
            )
            .await?;
        }
        Commands::ResetPassword { token } => {
            let (_, backend) = connect()?;
            account::run_reset_password(&backend, &token, &mut prompt, &mut out).await?;
        }
        Commands::Contact => {
            let (_, backend) = connect()?;
            site::run_contact(&backend, &mut prompt, &mut out).await?;
        }
        Commands::Projects => {
            let (_, backend) = connect()?;
            site::run_projects(&backend, &mut out).await?;
        }
        Commands::Config {
            backend_url,
            anon_key,
            site_url,
        } => {
            if backend_url.is_none() && anon_key.is_none() && site_url.is_none() {
                config::show_config()?;
            } else {
                config::set_config(backend_url, anon_key, site_url)?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
