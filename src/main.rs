use anyhow::{Context, Result};
use cineview::admin::{Confirm, DeleteOutcome, ImportOutcome, DEFAULT_IMPORT_COUNT};
use cineview::app::AppContext;
use cineview::catalog::{BucketKind, CatalogStatus};
use cineview::config::{Config, REQUIRED_ENV};
use cineview::models::Credentials;
use cineview::tmdb::MetadataMovie;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::env;
use std::io::{self, BufRead, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cineview", version, about = "Browse the movie catalog from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Home page: latest, popular and the two genre rows
    Home,
    Popular {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Genre {
        id: i64,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Full search results
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// The five suggestions the search box would show
    Suggest { query: String },
    Movie { id: i64 },
    Login {
        username: String,
        #[arg(long)]
        password: Option<String>,
    },
    Register {
        username: String,
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    Whoami,
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand)]
enum AdminCommand {
    List {
        #[arg(long)]
        filter: Option<String>,
    },
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Import the current popular movies into the catalog
    Import {
        #[arg(short = 'n', long, default_value_t = DEFAULT_IMPORT_COUNT)]
        count: usize,
    },
}

struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn check_env() -> Result<()> {
    for key in REQUIRED_ENV {
        if env::var(key).is_err() {
            anyhow::bail!("Missing required environment variable: {}", key);
        }
    }
    Ok(())
}

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_movies(movies: &[MetadataMovie]) {
    for movie in movies {
        let year = movie.release_date.split('-').next().unwrap_or_default();
        println!(
            "{:>8}  {:<48} {:>4}  ★ {:.1}",
            movie.id, movie.title, year, movie.vote_average
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before tracing so RUST_LOG from .env reaches the filter.
    let loaded = dotenv();
    init_tracing();
    match loaded {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }
    check_env()?;

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let ctx = AppContext::init(&config).await?;
    let outcome = tokio::select! {
        res = run(&ctx, cli.command) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            Ok(())
        }
    };
    ctx.teardown();
    outcome
}

async fn run(ctx: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Home => {
            let catalog = ctx.catalog();
            match catalog.load().await {
                CatalogStatus::Ready(data) => {
                    for kind in BucketKind::ALL {
                        println!("== {}", data.title(kind));
                        print_movies(data.bucket(kind));
                    }
                }
                CatalogStatus::Error(message) => anyhow::bail!(message),
                CatalogStatus::Loading => {}
            }
        }
        Command::Popular { page } => print_movies(&ctx.metadata.popular(page).await?),
        Command::Genre { id, page } => print_movies(&ctx.metadata.by_genre(id, page).await?),
        Command::Search { query, page } => {
            let results = ctx.catalog().search_results(&query, page).await?;
            print_movies(&results);
        }
        Command::Suggest { query } => {
            let suggest = ctx.search_suggest();
            suggest.input(&query).await?;
            print_movies(&suggest.suggestions());
        }
        Command::Movie { id } => {
            let details = ctx.movie_details().load(id).await?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        Command::Login { username, password } => {
            let credentials = Credentials::new(username, read_password(password)?);
            let session = ctx.session.sign_in(&credentials).await?;
            println!("Welcome back, {}!", session.profile.username);
        }
        Command::Register { username, password } => {
            let credentials = Credentials::new(username, read_password(password)?);
            let session = ctx.session.sign_up(&credentials).await?;
            println!("Account created. Signed in as {}.", session.profile.username);
        }
        Command::Logout => {
            ctx.session.sign_out().await?;
            println!("Signed out.");
        }
        Command::Whoami => match ctx.session.current().session() {
            Some(session) => println!(
                "{} ({}){}",
                session.profile.username,
                session.identity.id,
                if session.identity.is_admin { " [admin]" } else { "" }
            ),
            None => println!("Not signed in."),
        },
        Command::Admin(admin) => run_admin(ctx, admin).await?,
    }
    Ok(())
}

async fn run_admin(ctx: &AppContext, command: AdminCommand) -> Result<()> {
    let admin = ctx.admin();
    match command {
        AdminCommand::List { filter } => {
            admin.list().await?;
            let movies = admin.filter(filter.as_deref().unwrap_or_default()).await;
            for movie in movies {
                println!(
                    "{:<12} {:<48} {:>4.1}  {}",
                    movie.id,
                    movie.title,
                    movie.rating,
                    movie.trailer_url.as_deref().unwrap_or("-")
                );
            }
        }
        AdminCommand::Delete { id, yes } => {
            let outcome = if yes {
                admin.delete(&id, &|_: &str| true).await?
            } else {
                admin.delete(&id, &StdinConfirm).await?
            };
            match outcome {
                DeleteOutcome::Deleted => println!("Movie deleted successfully."),
                DeleteOutcome::Declined => println!("Cancelled."),
            }
        }
        AdminCommand::Import { count } => match admin.import_popular(count).await? {
            ImportOutcome::Imported(n) => println!("Imported {n} movies."),
            ImportOutcome::Nothing => println!("Nothing to import."),
        },
    }
    Ok(())
}
