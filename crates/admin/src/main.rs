use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use locker_api::auth::password::{hash_password, validate_new_password};
use locker_core::sandbox::Sandbox;
use locker_core::storage::ensure_user_root;
use locker_db::models::user::{CreateUser, User};
use locker_db::{CredentialStore, PgCredentialStore};

#[derive(Parser)]
#[command(name = "locker-admin", version, about = "Locker user administration")]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Parent directory of every user's storage directory
    #[arg(long, env = "STORAGE_ROOT", default_value = "./storage")]
    storage_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user and its storage directory
    AddUser { login: String, password: String },
    /// Replace a user's password
    SetPassword { login: String, password: String },
    /// Delete a user and its sessions (files are kept)
    DeleteUser { login: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "locker_admin=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let pool = locker_db::create_pool(&cli.database_url)
        .await
        .context("Failed to connect to database")?;
    locker_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    let store = PgCredentialStore::new(pool);

    match cli.command {
        Commands::AddUser { login, password } => {
            let sandbox = Sandbox::new(&cli.storage_root).context("Invalid storage root")?;
            cmd_add_user(&store, &sandbox, login, &password).await?;
        }
        Commands::SetPassword { login, password } => {
            cmd_set_password(&store, &login, &password).await?;
        }
        Commands::DeleteUser { login } => {
            cmd_delete_user(&store, &login).await?;
        }
    }

    Ok(())
}

fn checked_hash(password: &str) -> Result<String> {
    if let Err(reason) = validate_new_password(password) {
        bail!(reason);
    }
    hash_password(password).map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))
}

async fn require_user(store: &dyn CredentialStore, login: &str) -> Result<User> {
    store
        .find_user_by_login(login)
        .await?
        .with_context(|| format!("No user with login '{login}'"))
}

async fn cmd_add_user(
    store: &dyn CredentialStore,
    sandbox: &Sandbox,
    login: String,
    password: &str,
) -> Result<()> {
    if login.is_empty() {
        bail!("Login must not be empty");
    }
    if store.find_user_by_login(&login).await?.is_some() {
        bail!("Login '{login}' is already taken");
    }

    let password_hash = checked_hash(password)?;
    let user = store
        .create_user(CreateUser {
            login,
            password_hash,
        })
        .await?;

    let root = ensure_user_root(sandbox, user.id)
        .await
        .context("Failed to create the storage directory for the new user")?;
    tracing::info!(user_id = user.id, root = %root.as_str(), "User created");
    println!("{}", user.id);
    Ok(())
}

async fn cmd_set_password(store: &dyn CredentialStore, login: &str, password: &str) -> Result<()> {
    let user = require_user(store, login).await?;
    let password_hash = checked_hash(password)?;
    if !store.update_password(user.id, &password_hash).await? {
        bail!("User '{login}' disappeared before the update");
    }
    tracing::info!(user_id = user.id, "Password updated");
    println!("Password updated for '{login}'");
    Ok(())
}

async fn cmd_delete_user(store: &dyn CredentialStore, login: &str) -> Result<()> {
    let user = require_user(store, login).await?;
    store.delete_user(user.id).await?;
    tracing::info!(user_id = user.id, "User deleted");
    println!("Deleted user '{login}' (id {})", user.id);
    Ok(())
}
