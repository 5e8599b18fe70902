pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use referral_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "referral",
    about = "Referral program registration CLI",
    long_about = "Submit agent registrations, render signature images, and inspect configuration.",
    after_help = "Examples:\n  referral submit --applicant agent.toml --signature sig.json\n  referral sign --script sig.json --out signature.png\n  referral config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Validate an applicant file and submit it to the registration endpoint")]
    Submit(SubmitArgs),
    #[command(about = "Replay a recorded signature and write the resulting PNG")]
    Sign {
        #[arg(long, help = "Signature script (JSON surface plus strokes)")]
        script: PathBuf,
        #[arg(long, help = "Destination PNG path")]
        out: PathBuf,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

#[derive(Debug, Clone, Args)]
pub struct SubmitArgs {
    #[arg(long, help = "TOML file keyed by form input names")]
    pub applicant: PathBuf,
    #[arg(long, help = "Signature script drawn onto the signature pad")]
    pub signature: Option<PathBuf>,
    #[arg(long, help = "Supporting document (image or PDF)")]
    pub attachment: Option<PathBuf>,
    #[arg(long, help = "Assemble and validate without contacting the endpoint")]
    pub dry_run: bool,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        logging::init(&config.logging);
    }

    let result = match cli.command {
        Command::Submit(args) => commands::submit::run(&args),
        Command::Sign { script, out } => commands::sign::run(&script, &out),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
