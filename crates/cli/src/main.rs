use anyhow::Result;
use cfdrive_core::DEFAULT_PREFIX;
use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::Shell;
use color_eyre::config::HookBuilder;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod clipboard;
mod handlers;
mod progress;

/// cfdrive - upload a file to Cloudflare R2 and get a permanent link
#[derive(Parser, Debug)]
#[command(name = "cfdrive")]
#[command(version)]
#[command(about = "Upload a file to Cloudflare R2 and print its download URL", long_about = None)]
struct Cli {
    /// Local file to upload
    #[arg(required_unless_present = "completions")]
    file: Option<PathBuf>,

    /// Destination prefix in the bucket ("" uploads to the bucket root)
    #[arg(short = 'p', long = "path", value_name = "PREFIX", default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Custom base name (the file's extension is kept)
    #[arg(short, long)]
    name: Option<String>,

    /// Don't add a random token to the key (same key overwrites)
    #[arg(short, long)]
    strict: bool,

    /// Don't copy the URL to the clipboard
    #[arg(long)]
    no_copy: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Don't show the progress bar
    #[arg(long)]
    no_progress: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL", exclusive = true)]
    completions: Option<Shell>,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup error handling
    if let Err(e) = HookBuilder::default().install() {
        eprintln!("Warning: Failed to install error handler: {}", e);
    }

    // Parse CLI arguments
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(shell) = cli.completions {
        return handlers::handle_completion(shell, &mut Cli::command());
    }

    let Some(file) = cli.file else {
        anyhow::bail!("A file to upload is required");
    };

    handlers::handle_upload(handlers::UploadOptions {
        file,
        prefix: cli.prefix,
        name: cli.name,
        strict: cli.strict,
        copy: !cli.no_copy,
        json: cli.json,
        progress: !cli.no_progress && !cli.json,
    })
    .await
}
