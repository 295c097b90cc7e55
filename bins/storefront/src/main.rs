//! Storefront CLI
//!
//! Browse the catalog, manage the cart and sign in against the storefront API.

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use storefront_cli::output::{print_app_error, print_json};
use storefront_cli::OutputFormat;
use storefront_core::forms::organize_form_errors;
use storefront_core::{exit_codes, AppError};
use storefront_telemetry::{TelemetryConfig, Timer};

mod commands;
mod context;

use commands::{auth, cart, products, reviews};
use context::Context;

/// Storefront command-line client
#[derive(Parser)]
#[command(name = "storefront")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (defaults to ./storefront.toml or ./.storefront.toml)
    #[arg(long, global = true, env = "STOREFRONT_CONFIG")]
    config: Option<PathBuf>,

    /// Where the signed-in session is kept
    #[arg(long, global = true, env = "STOREFRONT_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: products::ProductsCommand,
    },

    /// Inspect and edit the cart
    Cart {
        #[command(subcommand)]
        action: cart::CartCommand,
    },

    /// Read and write product reviews
    Reviews {
        #[command(subcommand)]
        action: reviews::ReviewsCommand,
    },

    /// Sign in with email and password
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and sign in
    Signup {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password (8 to 72 characters)
        #[arg(short, long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,

        /// Display name
        #[arg(short, long)]
        name: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_verbosity(cli.verbose);
    if cli.log_json {
        telemetry = telemetry.json();
    }
    if let Err(e) = storefront_telemetry::init_with_config(telemetry) {
        eprintln!("{} {e:#}", "Warning:".yellow());
    }

    let format = cli.format;
    let result = run(cli).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = report(&e, format);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let timer = Timer::start(cli.command.name());

    // Offline; needs neither config nor session
    if let Commands::Cart {
        action: cart::CartCommand::Totals { lines },
    } = &cli.command
    {
        let result = cart::totals(lines, cli.format);
        timer.stop();
        return result;
    }

    let ctx = Context::load(cli.config.as_deref(), cli.session_file, cli.format)?;

    let result = match cli.command {
        Commands::Products { action } => products::run(&ctx, action).await,
        Commands::Cart { action } => cart::run(&ctx, action).await,
        Commands::Reviews { action } => reviews::run(&ctx, action).await,
        Commands::Login { email, password } => auth::login(&ctx, email, password).await,
        Commands::Signup {
            email,
            password,
            name,
        } => auth::signup(&ctx, email, password, name).await,
        Commands::Logout => auth::logout(&ctx).await,
        Commands::Whoami => auth::whoami(&ctx).await,
    };
    timer.stop();
    result
}

impl Commands {
    /// Name used for timing logs
    fn name(&self) -> &'static str {
        match self {
            Self::Products { action } => match action {
                products::ProductsCommand::List { .. } => "products list",
                products::ProductsCommand::Show { .. } => "products show",
            },
            Self::Cart { action } => match action {
                cart::CartCommand::Show => "cart show",
                cart::CartCommand::Add { .. } => "cart add",
                cart::CartCommand::Update { .. } => "cart update",
                cart::CartCommand::Remove { .. } => "cart remove",
                cart::CartCommand::Totals { .. } => "cart totals",
            },
            Self::Reviews { action } => match action {
                reviews::ReviewsCommand::List { .. } => "reviews list",
                reviews::ReviewsCommand::Add { .. } => "reviews add",
            },
            Self::Login { .. } => "login",
            Self::Signup { .. } => "signup",
            Self::Logout => "logout",
            Self::Whoami => "whoami",
        }
    }
}

/// Print `error` and pick the exit code
fn report(error: &anyhow::Error, format: OutputFormat) -> i32 {
    let Some(app_error) = error.downcast_ref::<AppError>() else {
        eprintln!("{} {error:#}", "Error:".red().bold());
        return exit_codes::FAILURE;
    };

    let split = organize_form_errors(app_error);
    match format {
        OutputFormat::Json => {
            let payload = serde_json::json!({ "error": app_error, "form": split });
            if print_json(&payload).is_err() {
                print_app_error(app_error, &split);
            }
        }
        OutputFormat::Text => print_app_error(app_error, &split),
    }
    app_error.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        let cli = Cli::parse_from(["storefront", "cart", "totals", "1x5"]);
        assert_eq!(cli.command.name(), "cart totals");

        let cli = Cli::parse_from(["storefront", "-vv", "products", "show", "3"]);
        assert_eq!(cli.command.name(), "products show");
        assert_eq!(cli.verbose, 2);
    }
}
