//! adtlink - command line browser for ABAP repositories over ADT.
//!
//! Logs in, runs one command against the repository tree or the object
//! search, prints the result and logs out again.

mod config;
mod format;

use std::io;

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adtlink_core::search::DEFAULT_MAX_RESULTS;
use adtlink_core::{AdtClient, CredentialStore, Facet, FacetQuery};

// ============================================================================
// Constants
// ============================================================================

/// Pattern used when `tree` is called without `--pattern`
const DEFAULT_PATTERN: &str = "*";

/// Log file written when ADTLINK_LOG_DIR is set
const LOG_FILE_NAME: &str = "adtlink.log";

const USAGE: &str = "\
Usage: adtlink [--save-password] <command> [options]

Commands:
  login                         Log in, print the session and remember the server
  tree [options]                List virtual folders and objects
      --package P | --group G | --type T | --api A
      --expand FACET            Also list children of the same facet
      --pattern P               Object name pattern (default *)
  search PATTERN [--max N]      Quick search for objects by name
  forget                        Remove the saved password from the keychain

Environment: ADT_URL, ADT_CLIENT, ADT_USER, ADT_PASSWORD, ADT_LANGUAGE";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard must be held for the file layer to flush.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=adtlink_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var("ADTLINK_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

// ============================================================================
// Argument parsing
// ============================================================================

#[derive(Debug, PartialEq)]
enum Command {
    Login,
    Tree { query: FacetQuery, pattern: String },
    Search { pattern: String, max: u32 },
    Forget,
    Help,
}

#[derive(Debug, PartialEq)]
struct Options {
    save_password: bool,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut save_password = false;
    let mut rest = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--save-password" => save_password = true,
            _ => rest.push(arg.as_str()),
        }
    }

    let command = match rest.split_first() {
        None => Command::Help,
        Some((&"help", _)) | Some((&"--help", _)) | Some((&"-h", _)) => Command::Help,
        Some((&"login", [])) => Command::Login,
        Some((&"login", extra)) => bail!("Unexpected argument for login: {}", extra[0]),
        Some((&"forget", [])) => Command::Forget,
        Some((&"forget", extra)) => bail!("Unexpected argument for forget: {}", extra[0]),
        Some((&"tree", flags)) => parse_tree(flags)?,
        Some((&"search", flags)) => parse_search(flags)?,
        Some((other, _)) => bail!("Unknown command: {}", other),
    };

    Ok(Options { save_password, command })
}

fn parse_tree(flags: &[&str]) -> Result<Command> {
    let mut query = FacetQuery::new();
    let mut expand = Vec::new();
    let mut pattern = DEFAULT_PATTERN.to_string();

    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .map(|v| v.to_string())
                .ok_or_else(|| anyhow!("Missing value for {}", flag))
        };
        match *flag {
            "--package" => query.set(Facet::Package, value()?, false),
            "--group" => query.set(Facet::Group, value()?, false),
            "--type" => query.set(Facet::Type, value()?, false),
            "--api" => query.set(Facet::Api, value()?, false),
            "--expand" => {
                let facet: Facet = value()?.parse().map_err(|e: String| anyhow!(e))?;
                expand.push(facet);
            }
            "--pattern" => pattern = value()?,
            other => bail!("Unknown option for tree: {}", other),
        }
    }

    for facet in expand {
        let current = query
            .get(facet)
            .cloned()
            .ok_or_else(|| anyhow!("--expand {} needs a value for that facet", facet))?;
        query.set(facet, current.value, true);
    }

    Ok(Command::Tree { query, pattern })
}

fn parse_search(flags: &[&str]) -> Result<Command> {
    let mut pattern = None;
    let mut max = DEFAULT_MAX_RESULTS;

    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        match *flag {
            "--max" => {
                let raw = iter.next().ok_or_else(|| anyhow!("Missing value for --max"))?;
                max = raw
                    .parse()
                    .with_context(|| format!("Invalid --max value: {}", raw))?;
            }
            other if other.starts_with("--") => bail!("Unknown option for search: {}", other),
            other if pattern.is_none() => pattern = Some(other.to_string()),
            other => bail!("Unexpected argument for search: {}", other),
        }
    }

    let pattern = pattern.ok_or_else(|| anyhow!("search needs a PATTERN"))?;
    Ok(Command::Search { pattern, max })
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    if options.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = config::Config::load().context("Failed to load config")?;
    config.apply_env();

    if options.command == Command::Forget {
        let (user, server) = (config.user()?, config.server()?);
        CredentialStore::delete(user, server).context("Failed to remove saved password")?;
        println!("Removed saved password for {}@{}", user, server);
        return Ok(());
    }
    let password = resolve_password(&config, options.save_password)?;

    let client = AdtClient::new(config.to_client_config(password)?)?;
    info!(server = %client.config().base_url, "adtlink starting");

    let remember_config = options.command == Command::Login;
    let result = run(&client, options.command).await;
    if result.is_ok() && remember_config {
        if let Err(e) = config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    if client.is_authenticated().await {
        if let Err(e) = client.logout().await {
            warn!(error = %e, "Logout failed");
        }
    }
    client.dispose().await;

    result
}

/// Password lookup order: environment, keychain, interactive prompt.
fn resolve_password(config: &config::Config, save: bool) -> Result<String> {
    let user = config.user()?;
    let server = config.server()?;

    let password = match config.password.clone() {
        Some(password) => password,
        None => match CredentialStore::get_password(user, server) {
            Ok(password) => password,
            Err(_) => rpassword::prompt_password(format!("Password for {}@{}: ", user, server))
                .context("Failed to read password")?,
        },
    };

    if save {
        CredentialStore::store(user, server, &password)?;
        info!(user, server, "Password saved to keychain");
    }
    Ok(password)
}

async fn run(client: &AdtClient, command: Command) -> Result<()> {
    let session = client.login().await.context("Login failed")?;

    match command {
        Command::Login => {
            println!(
                "Logged in as {} (session {}, expires in {} min)",
                session.username,
                session.session_id,
                session.minutes_until_expiry()
            );
        }
        Command::Tree { query, pattern } => {
            let result = client.discover(&query, &pattern).await?;
            if result.is_empty() {
                println!("(empty)");
            }
            for folder in &result.folders {
                println!("{}", format::format_folder(folder));
            }
            for object in &result.objects {
                println!("{}", format::format_object(object));
            }
        }
        Command::Search { pattern, max } => {
            let objects = client.search_objects(&pattern, max).await?;
            if objects.is_empty() {
                println!("No objects match {}", pattern);
            }
            for object in &objects {
                println!("{}", format::format_object(object));
            }
        }
        Command::Forget | Command::Help => println!("{}", USAGE),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_args_is_help() {
        let options = parse_args(&[]).unwrap();
        assert_eq!(options.command, Command::Help);
    }

    #[test]
    fn test_login_with_save_password() {
        let options = parse_args(&args(&["--save-password", "login"])).unwrap();
        assert!(options.save_password);
        assert_eq!(options.command, Command::Login);
    }

    #[test]
    fn test_tree_with_expansion() {
        let options =
            parse_args(&args(&["tree", "--package", "BASIS", "--expand", "package", "--pattern", "Z*"])).unwrap();
        let Command::Tree { query, pattern } = options.command else {
            panic!("expected tree command");
        };
        assert_eq!(pattern, "Z*");
        assert!(query.is_expanded(Facet::Package));
        assert_eq!(query.get(Facet::Package).unwrap().value, "BASIS");
        assert!(!query.is_specified(Facet::Group));
    }

    #[test]
    fn test_tree_defaults_pattern() {
        let options = parse_args(&args(&["tree"])).unwrap();
        assert_eq!(
            options.command,
            Command::Tree { query: FacetQuery::new(), pattern: "*".to_string() }
        );
    }

    #[test]
    fn test_expand_requires_facet_value() {
        assert!(parse_args(&args(&["tree", "--expand", "group"])).is_err());
        assert!(parse_args(&args(&["tree", "--expand", "color"])).is_err());
    }

    #[test]
    fn test_search_arguments() {
        let options = parse_args(&args(&["search", "ZCL_*", "--max", "5"])).unwrap();
        assert_eq!(
            options.command,
            Command::Search { pattern: "ZCL_*".to_string(), max: 5 }
        );
        assert!(parse_args(&args(&["search"])).is_err());
        assert!(parse_args(&args(&["search", "A", "--max", "x"])).is_err());
    }

    #[test]
    fn test_search_default_max() {
        let options = parse_args(&args(&["search", "Z*"])).unwrap();
        assert_eq!(
            options.command,
            Command::Search { pattern: "Z*".to_string(), max: DEFAULT_MAX_RESULTS }
        );
    }

    #[test]
    fn test_forget_command() {
        let options = parse_args(&args(&["forget"])).unwrap();
        assert_eq!(options.command, Command::Forget);
        assert!(parse_args(&args(&["forget", "now"])).is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse_args(&args(&["frobnicate"])).is_err());
        assert!(parse_args(&args(&["tree", "--color", "red"])).is_err());
    }
}
