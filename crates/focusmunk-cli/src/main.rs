use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focusmunk", version, about = "Focusmunk navigation blocker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair this client with an existing configuration
    Pair {
        /// Configuration id (e.g. ABCD-1234)
        id: String,
    },
    /// Create a configuration on the server and pair with it
    Setup(commands::pairing::SetupArgs),
    /// Forget the paired configuration and all cached policy
    Unpair,
    /// Show pairing, sync and free-time status
    Status {
        /// Print the state report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Refresh the policy from the server now
    Sync,
    /// Evaluate a URL against the cached policy
    Check {
        url: String,
        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },
    /// Free-time session control
    FreeTime {
        #[command(subcommand)]
        action: commands::session::FreeTimeAction,
    },
    /// Suspend blocking for a number of hours
    Disable {
        #[arg(long)]
        hours: f64,
        #[arg(long)]
        password: String,
    },
    /// Cancel a temporary disable
    Enable,
    /// Check the settings password
    Verify {
        #[arg(long)]
        password: String,
    },
    /// Policy settings stored on the server
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run the background service, speaking JSON lines on stdin/stdout
    Daemon,
}

fn init_tracing(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FOCUSMUNK_LOG")
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(match cli.command {
        Commands::Daemon => "info",
        _ => "warn",
    });

    let result = match cli.command {
        Commands::Pair { id } => commands::pairing::pair(&id),
        Commands::Setup(args) => commands::pairing::setup(args),
        Commands::Unpair => commands::pairing::unpair(),
        Commands::Status { json } => commands::status::run(json),
        Commands::Sync => commands::status::sync(),
        Commands::Check { url, json } => commands::check::run(&url, json),
        Commands::FreeTime { action } => commands::session::free_time(action),
        Commands::Disable { hours, password } => commands::session::disable(hours, &password),
        Commands::Enable => commands::session::enable(),
        Commands::Verify { password } => commands::session::verify(&password),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Daemon => commands::daemon::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
