use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use parley_auth::UserIdentity;
use parley_config::load as load_config;
use parley_database::{table_counts, NewUser, UserRepository};
use parley_runtime::{shutdown_signal, telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "parley-server")]
#[command(about = "Parley realtime chat server (serves by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and websocket server
    Serve,
    /// Print row counts per table
    DumpData,
    /// Print a signed credential for an existing user
    DevToken {
        user_id: String,
    },
    /// Provision a user for local development
    CreateUser {
        display_name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let address = format!("{}:{}", config.http.address, config.http.port);
            let listener = TcpListener::bind(&address)
                .await
                .with_context(|| format!("failed to bind http listener on {address}"))?;

            info!("starting Parley server");
            services.serve(listener, shutdown_signal()).await?;
            info!("server shut down");
        }
        Commands::DumpData => {
            let counts = table_counts(&services.db_pool)
                .await
                .context("failed to count rows")?;

            println!("{:<16} {:>10}", "TABLE", "ROWS");
            println!("{}", "-".repeat(27));
            for (table, count) in counts {
                println!("{table:<16} {count:>10}");
            }
        }
        Commands::DevToken { user_id } => {
            let Some(user) = UserRepository::new(services.db_pool.clone())
                .find_by_id(&user_id)
                .await
                .context("failed to look up user")?
            else {
                bail!("no user with id {user_id}");
            };

            let token = services
                .authenticator
                .issue_token(&UserIdentity::from(user))
                .context("failed to sign credential")?;
            println!("{token}");
        }
        Commands::CreateUser {
            display_name,
            email,
            admin,
        } => {
            let user = UserRepository::new(services.db_pool.clone())
                .insert(&NewUser {
                    id: None,
                    display_name,
                    email,
                    avatar_url: None,
                    is_admin: admin,
                })
                .await
                .context("failed to create user")?;

            println!("{}\t{}\tadmin={}", user.id, user.display_name, user.is_admin);
        }
    }

    Ok(())
}
