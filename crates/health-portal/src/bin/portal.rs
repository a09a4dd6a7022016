//! Health Portal CLI
//!
//! Drive the patient client core from a terminal. Session state (role marker
//! and cached profile) lives under the configured cache directory, so it
//! survives between invocations the way browser storage survives reloads.
//!
//! Usage:
//!   portal accounts
//!   portal login <role>
//!   portal logout
//!   portal register --first-name <name> --last-name <name> ...
//!   portal profile show [--view home|settings]
//!   portal profile set <field> <value>
//!   portal profile picture <file>

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use health_portal::*;
use health_validation::BmiCategory;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "portal")]
#[command(author = "Mycelix Health")]
#[command(version = "0.1.0")]
#[command(about = "Patient portal client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override the API base URL
    #[arg(long)]
    api: Option<String>,

    /// Override the session cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the account types and their entry routes
    Accounts,

    /// Record the active account type
    Login {
        /// doctor, patient, lab or pharmacy
        role: Role,
    },

    /// Clear the session
    Logout,

    /// Register a new patient account
    Register(RegisterArgs),

    /// Patient profile operations
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
}

#[derive(clap::Args)]
struct RegisterArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    /// National identity card number
    #[arg(long)]
    nic: String,
    #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    address: String,
    /// YYYY-MM-DD
    #[arg(long)]
    date_of_birth: String,
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Load and print the profile
    Show {
        #[arg(long, value_enum, default_value = "settings")]
        view: ViewArg,
    },

    /// Edit one field and save
    Set {
        /// Field name as the API spells it, e.g. bloodType
        field: String,
        value: String,
    },

    /// Upload a profile picture and save
    Picture { file: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    Home,
    Settings,
}

impl From<ViewArg> for ProfileView {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::Home => ProfileView::Home,
            ViewArg::Settings => ProfileView::Settings,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = PortalConfig::load()?;
    if let Some(url) = cli.api {
        config = config.with_api_base_url(url);
    }
    if let Some(dir) = cli.cache_dir {
        config = config.with_cache_dir(dir);
    }

    let session = SessionContext::mount(Arc::new(FileStore::new(&config.cache_dir)));

    match cli.command {
        Commands::Accounts => {
            for account in account_catalog() {
                println!("{:<10} {:<22} {}", account.title, account.href, account.description);
            }
        }
        Commands::Login { role } => {
            session.sign_in(role)?;
            println!("Signed in as {}", role.title());
        }
        Commands::Logout => {
            let role = session.role().unwrap_or(Role::Patient);
            let route = session.logout(role);
            println!("Signed out, next: {}", route);
        }
        Commands::Register(args) => {
            let api = Arc::new(HttpPortalApi::new(&config)?);
            register(api, session, &config, args).await?;
        }
        Commands::Profile { command } => {
            let api = Arc::new(HttpPortalApi::new(&config)?);
            profile(api, session, command).await?;
        }
    }

    Ok(())
}

async fn register(
    api: Arc<HttpPortalApi>,
    session: Arc<SessionContext>,
    config: &PortalConfig,
    args: RegisterArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let form = RegistrationForm::new()
        .with(RegistrationField::FirstName, args.first_name)
        .with(RegistrationField::LastName, args.last_name)
        .with(RegistrationField::Email, args.email)
        .with(RegistrationField::Nic, args.nic)
        .with(RegistrationField::Password, args.password)
        .with(RegistrationField::Phone, args.phone)
        .with(RegistrationField::Address, args.address)
        .with(RegistrationField::DateOfBirth, args.date_of_birth);

    let flow = RegistrationFlow::new(api, session, config.redirect_delay());
    match flow.submit(&form).await {
        Ok(RegistrationOutcome::Registered { notice, redirect }) => {
            println!("{}", notice.message);
            println!("Next: {}", redirect);
            Ok(())
        }
        Ok(RegistrationOutcome::Ignored) => Ok(()),
        Err(e) => Err(e.user_message().into()),
    }
}

async fn profile(
    api: Arc<HttpPortalApi>,
    session: Arc<SessionContext>,
    command: ProfileCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let view = match &command {
        ProfileCommands::Show { view } => (*view).into(),
        _ => ProfileView::Settings,
    };

    let store = ProfileStore::new(api, session, view);
    let mut events = store.subscribe();

    if let GuardOutcome::Redirect(route) = store.mount().await {
        return Err(format!("Not signed in as a patient, go to {}", route).into());
    }
    print_notices(&mut events);

    match command {
        ProfileCommands::Show { .. } => print_profile(&store.snapshot()),
        ProfileCommands::Set { field, value } => {
            store
                .edit_named(&field, &value)
                .map_err(|e| e.user_message())?;
            save(&store, &mut events).await?;
        }
        ProfileCommands::Picture { file } => {
            store
                .set_profile_picture(&file)
                .await
                .map_err(|e| e.user_message())?;
            save(&store, &mut events).await?;
        }
    }

    Ok(())
}

async fn save(
    store: &ProfileStore,
    events: &mut broadcast::Receiver<StoreEvent>,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = store.save().await;
    print_notices(events);
    // the failure notice has already been printed
    result.map(|_| ()).map_err(|_| "profile was not saved".into())
}

fn print_notices(events: &mut broadcast::Receiver<StoreEvent>) {
    loop {
        match events.try_recv() {
            Ok(StoreEvent::LoadFailed(notice))
            | Ok(StoreEvent::Saved(notice))
            | Ok(StoreEvent::SaveFailed(notice)) => match notice.level {
                NoticeLevel::Success => println!("{}", notice.message),
                NoticeLevel::Error => eprintln!("{}", notice.message),
            },
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

fn print_profile(profile: &PatientProfile) {
    for field in ProfileField::ALL {
        let value = match field {
            ProfileField::ProfilePicture if profile.has_profile_picture() => "(set)".to_string(),
            ProfileField::Bmi => match profile.bmi {
                Some(bmi) => format!("{:.1} ({})", bmi, BmiCategory::from_bmi(bmi)),
                None => String::new(),
            },
            _ => profile.field_value(field),
        };
        let marker = if field.is_editable() { "" } else { " (read-only)" };
        println!("{:<24} {}{}", field.as_str(), value, marker);
    }
}
