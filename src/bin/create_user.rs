//! Creates an API user from the command line.
//!
//! Usage:
//!   `cargo run --bin create_user -- --id eng-01 --name "Field Engineer" --password '...'`
//!
//! The database comes from `--database-url` or `DATABASE_URL` (a `.env` file
//! is honoured). Migrations are applied first so a fresh database works.

use anyhow::{Context, bail};
use clap::{Arg, Command};
use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::{Alias, Query};
use sea_orm::{ConnectionTrait, Database};

#[path = "../users/password.rs"]
mod password;

fn cli() -> Command {
    Command::new("create_user")
        .about("Create a user that can log in to the instrument API")
        .arg(
            Arg::new("database-url")
                .long("database-url")
                .env("DATABASE_URL")
                .required(true)
                .help("Database connection string"),
        )
        .arg(Arg::new("id").long("id").required(true).help("Login id"))
        .arg(
            Arg::new("name")
                .long("name")
                .required(true)
                .help("Full name shown in the UI"),
        )
        .arg(
            Arg::new("role")
                .long("role")
                .default_value("engineer")
                .help("Role label"),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .required(true)
                .help("Initial password"),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let matches = cli().get_matches();
    let arg = |name: &str| {
        matches
            .get_one::<String>(name)
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };
    let (database_url, id, name, role) = (arg("database-url"), arg("id"), arg("name"), arg("role"));
    let password = matches
        .get_one::<String>("password")
        .cloned()
        .unwrap_or_default();

    if id.is_empty() || name.is_empty() {
        bail!("--id and --name must not be blank");
    }
    if let Err(reason) = password::check_password(&password) {
        bail!(reason);
    }

    let db = Database::connect(&database_url)
        .await
        .context("Could not connect to the database")?;
    Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;

    let password_hash = password::hash_password(&password).context("Could not hash password")?;

    let mut insert = Query::insert();
    insert
        .into_table(Alias::new("users"))
        .columns(
            ["id", "full_name", "role", "password_hash", "online", "created_at"].map(Alias::new),
        )
        .values([
            id.clone().into(),
            name.into(),
            role.into(),
            password_hash.into(),
            false.into(),
            chrono::Utc::now().into(),
        ])
        .context("Could not build insert")?;

    let statement = db.get_database_backend().build(&insert);
    db.execute(statement)
        .await
        .with_context(|| format!("Could not create user '{id}'"))?;

    tracing::info!(user_id = %id, "Created user");
    Ok(())
}
