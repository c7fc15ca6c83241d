use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use splitbill_backend::domain::commands::bills::HistoryQuery;
use splitbill_backend::domain::session::{CurrentUser, Session};
use splitbill_backend::storage::JsonConnection;
use splitbill_backend::{initialize_backend, AppConfig, Backend};

#[derive(Parser, Debug)]
#[command(name = "splitbill", version, about = "Inspect bills, debts and notifications")]
struct Cli {
    /// YAML configuration file
    #[arg(long, env = "SPLITBILL_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the configured data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// What a user still owes, largest first
    Debts { user_id: String },
    /// A user's notifications, newest first
    Notifications { user_id: String },
    /// Print the receipt of a stored bill
    Receipt { bill_id: String },
    /// Bills a user created or takes part in
    History {
        user_id: String,
        /// Only bills whose group name contains this text
        #[arg(long)]
        search: Option<String>,
    },
}

/// Session for a user id given on the command line
async fn session_for(backend: &Backend<JsonConnection>, user_id: &str) -> Result<Session> {
    let profile = backend.user_service.get_profile(user_id).await?;
    Ok(Session::new(CurrentUser {
        id: user_id.to_string(),
        display_name: profile
            .as_ref()
            .map(|p| p.display_name.clone())
            .unwrap_or_default(),
        photo_ref: profile.and_then(|p| p.photo_ref),
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_directory = dir;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match AppConfig::resolve_path(cli.config.as_deref()) {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("No config file given; using defaults"),
    }
    info!("Data directory: {}", config.data_directory.display());
    let backend = initialize_backend(&config)?;
    let currency = &config.currency;

    match cli.command {
        Command::Debts { user_id } => {
            let overview = backend.debt_service.overview_for(&user_id).await?;
            println!("Total unpaid: {}", currency.format(overview.total_unpaid));
            for debt in &overview.debts {
                println!(
                    "  {:<20} {:<20} {:>14}  {}",
                    debt.creditor_name,
                    debt.group_name,
                    currency.format(debt.amount),
                    debt.date.format("%d/%m/%Y")
                );
            }
        }
        Command::Notifications { user_id } => {
            let session = session_for(&backend, &user_id).await?;
            let notifications = backend.notification_service.list_for_user(&session).await?;
            let unread = backend.notification_service.unread_count(&session).await?;
            println!("{} notifications, {} unread", notifications.len(), unread);
            for notification in &notifications {
                println!(
                    "{} {} {} {}",
                    if notification.is_read { " " } else { "*" },
                    notification.created_at.format("%d/%m/%Y %H:%M"),
                    notification.sender_name,
                    notification.message
                );
            }
        }
        Command::Receipt { bill_id } => {
            let receipt = backend.bill_service.receipt(&bill_id).await?;
            print!("{}", receipt.render(currency));
        }
        Command::History { user_id, search } => {
            let session = session_for(&backend, &user_id).await?;
            let bills = backend
                .bill_service
                .history(&session, &HistoryQuery { search })
                .await?;
            for bill in &bills {
                let status = match bill.split_for(&user_id) {
                    Some(split) => split.status.to_string(),
                    None => "creator".to_string(),
                };
                println!(
                    "{}  {} {:<24} {:>14}  {}",
                    bill.created_at.format("%d/%m/%Y"),
                    bill.group_icon,
                    bill.group_name,
                    currency.format(bill.total_amount),
                    status
                );
            }
        }
    }

    Ok(())
}
