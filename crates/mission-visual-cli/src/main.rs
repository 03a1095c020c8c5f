use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mission-visual", version, about = "Mission Visual CLI")]
struct Cli {
    /// User whose challenges are managed
    #[arg(long, global = true, env = "MISSION_VISUAL_USER", default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Challenge management
    Challenge {
        #[command(subcommand)]
        action: commands::challenge::ChallengeAction,
    },
    /// Daily check-ins
    Day {
        #[command(subcommand)]
        action: commands::day::DayAction,
    },
    /// Make-up days and compensation
    Makeup {
        #[command(subcommand)]
        action: commands::makeup::MakeupAction,
    },
    /// Session start-up tasks
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Per-user settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MISSION_VISUAL_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let ctx = commands::Context::new(cli.user);
    let result = match cli.command {
        Commands::Challenge { action } => commands::challenge::run(action, &ctx),
        Commands::Day { action } => commands::day::run(action, &ctx),
        Commands::Makeup { action } => commands::makeup::run(action, &ctx),
        Commands::Session { action } => commands::session::run(action, &ctx),
        Commands::Settings { action } => commands::settings::run(action, &ctx),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
