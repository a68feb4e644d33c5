//! buddy -- interactive client for the Buddy pet-adoption backend.
//!
//! Loads configuration, restores the persisted session, and reads commands
//! from stdin until `quit` or end of input.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use buddy_client::auth::LogoutOptions;
use buddy_client::cache::ResourceKey;
use buddy_client::config::Config;
use buddy_client::models::{AuthRequest, PetQuery};
use buddy_client::transport::ApiRequest;
use buddy_client::BuddyClient;

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

struct CliArgs {
    config_path: PathBuf,
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut config_path = PathBuf::from("buddy.toml");

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    config_path = PathBuf::from(path);
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("buddy {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Run with --help for usage information.");
                std::process::exit(1);
            }
        }
    }

    CliArgs { config_path }
}

fn print_usage() {
    println!(
        "\
buddy {version} -- Buddy pet-adoption client

USAGE:
    buddy [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file [default: buddy.toml]
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    RUST_LOG               Override log level (e.g. RUST_LOG=debug)
    BUDDY_CONFIG           Alternative to --config flag
    BUDDY_API_URL          Backend base URL (required unless set in the file)
",
        version = env!("CARGO_PKG_VERSION")
    );
}

const COMMANDS: &str = "\
commands:
    login <email> <password>     log in
    logout [redirect]            log out (always clears the local session)
    whoami                       show the current session
    get <path>                   GET a path through the refreshing client (cached)
    pets [key=value ...]         search pets (species, gender, ageRange, weightRange, page, size)
    pet <id>                     show one pet
    help                         this text
    quit                         exit";

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = parse_args();

    let config_path = std::env::var("BUDDY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or(cli.config_path);

    let config = Config::load(&config_path)?;
    init_tracing(&config);

    for (key, env_var) in config.env_overrides.all() {
        tracing::debug!(setting = %key, env = %env_var, "Setting overridden by environment");
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        base_url = %config.api.base_url,
        "Starting buddy"
    );

    let client = BuddyClient::from_config(&config)?;
    let navigator = Arc::new(|to: &str| println!("-> {to}"));
    let client_auth = client.auth().clone().with_navigator(navigator);

    if let Some(err) = client.session().storage_error() {
        println!("note: {err}");
        client.session().clear_storage_error();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"buddy> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let rest: Vec<&str> = words.collect();

        match command {
            "quit" | "exit" => break,
            "help" => println!("{COMMANDS}"),
            "login" => match rest.as_slice() {
                [email, password] => {
                    match client_auth.login(&AuthRequest::new(*email, *password)).await {
                        Ok(session) => {
                            print_session(&session);
                            if let Some(err) = session.storage_error {
                                println!("note: {err}");
                            }
                        }
                        Err(err) => println!("login failed: {err}"),
                    }
                }
                _ => println!("usage: login <email> <password>"),
            },
            "logout" => {
                let options = match rest.first() {
                    Some(to) => LogoutOptions::redirect(*to),
                    None => LogoutOptions::default(),
                };
                match client_auth.logout(options).await {
                    Ok(()) => println!("logged out"),
                    Err(err) => println!("logged out locally (server said: {err})"),
                }
            }
            "whoami" => print_session(&client.session().snapshot()),
            "get" => match rest.first() {
                Some(path) => match client
                    .api()
                    .send_cached(ResourceKey::from_path(path), ApiRequest::get(*path))
                    .await
                {
                    Ok(response) => println!("{} {}", response.status(), response.text()),
                    Err(err) => println!("error ({}): {err}", err.kind()),
                },
                None => println!("usage: get <path>"),
            },
            "pets" => {
                let (query, page, size) = parse_pet_query(&rest);
                match client.search_pets(&query, page, size).await {
                    Ok(result) => {
                        for pet in &result.pets {
                            println!("{}  {} ({}, {})", pet.id, pet.name, pet.specie, pet.gender);
                        }
                        match result.next_page {
                            Some(next) => println!("page {} (next: {next})", result.current_page),
                            None => println!("page {} (last)", result.current_page),
                        }
                    }
                    Err(err) => println!("error ({}): {err}", err.kind()),
                }
            }
            "pet" => match rest.first() {
                Some(id) => match client.pet(id).await {
                    Ok(Some(pet)) => println!(
                        "{}  {} ({}, {}, {} kg) {}",
                        pet.id, pet.name, pet.specie, pet.gender, pet.weight, pet.location
                    ),
                    Ok(None) => println!("no pet with id {id}"),
                    Err(err) => println!("error ({}): {err}", err.kind()),
                },
                None => println!("usage: pet <id>"),
            },
            other => println!("unknown command: {other} (try help)"),
        }
    }

    client.session().teardown();
    Ok(())
}

fn print_session(session: &buddy_client::auth::Session) {
    match &session.user {
        Some(user) => {
            for profile in &user.profiles {
                println!("{} [{:?}] {}", profile.name, profile.profile_type, profile.description);
            }
        }
        None => println!("not logged in"),
    }
}

fn parse_pet_query(args: &[&str]) -> (PetQuery, u32, u32) {
    let mut query = PetQuery::default();
    let mut page = 0;
    let mut size = buddy_client::api::pets::DEFAULT_PAGE_SIZE;

    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            println!("ignoring '{arg}' (expected key=value)");
            continue;
        };
        match key {
            "species" => query.species = Some(value.to_string()),
            "gender" => query.gender = Some(value.to_string()),
            "ageRange" => query.age_range = Some(value.to_string()),
            "weightRange" => query.weight_range = Some(value.to_string()),
            "page" => page = value.parse().unwrap_or(page),
            "size" => size = value.parse().unwrap_or(size),
            other => println!("ignoring unknown filter '{other}'"),
        }
    }
    (query, page, size)
}

fn init_tracing(config: &Config) {
    // RUST_LOG env var takes precedence over config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("buddy_client={level},buddy={level},warn"))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
