//! Command handlers for the cfdrive CLI

use crate::clipboard::copy_to_clipboard;
use crate::progress::{hidden_bar, upload_bar};
use anyhow::Result;
use cfdrive_core::{Config, R2Client, UploadProgress, UploadRequest, UploadResult, Uploader};
use clap::Command;
use clap_complete::{generate, Shell};
use console::style;
use serde::Serialize;
use std::path::PathBuf;

/// Options of a single upload invocation
#[derive(Debug)]
pub struct UploadOptions {
    pub file: PathBuf,
    pub prefix: String,
    pub name: Option<String>,
    pub strict: bool,
    pub copy: bool,
    pub json: bool,
    pub progress: bool,
}

#[derive(Serialize)]
struct UploadOutput<'a> {
    key: &'a str,
    url: &'a str,
    bucket: &'a str,
    size: u64,
    copied: bool,
}

/// Handle an upload
pub async fn handle_upload(options: UploadOptions) -> Result<()> {
    let config = Config::load()?;

    // Without a public URL there is nothing useful to hand back, so don't
    // start the transfer at all.
    let public_url = config.require_public_url()?.to_string();

    let store = R2Client::from_config(&config);
    let mut uploader = Uploader::new(store, Some(public_url));

    let mut request = UploadRequest::new(&options.file)
        .with_prefix(options.prefix.as_str())
        .strict(options.strict);
    if let Some(name) = &options.name {
        request = request.with_name(name.as_str());
    }

    let bar = if options.progress {
        upload_bar()?
    } else {
        hidden_bar()
    };
    let on_progress = |p: UploadProgress| {
        bar.set_length(p.total);
        bar.set_position(p.transferred);
    };

    let outcome = uploader.upload_and_link(&request, &on_progress).await;
    bar.finish_and_clear();
    let UploadResult { key, download_url } = outcome?;
    let size = bar.length().unwrap_or(0);

    let copied = options.copy
        && match copy_to_clipboard(&download_url) {
            Ok(tool) => {
                tracing::debug!(tool, "copied URL to clipboard");
                true
            }
            Err(e) => {
                tracing::warn!("Could not copy to clipboard: {:#}", e);
                false
            }
        };

    if options.json {
        let output = UploadOutput {
            key: key.as_str(),
            url: &download_url,
            bucket: &config.bucket,
            size,
            copied,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "✅ Uploaded {} ({})",
        options.file.display(),
        format_bytes(size)
    );
    println!("  Key: {}", style(key.as_str()).bold());
    println!();
    println!("Permanent Download URL:");
    println!("{}", style(&download_url).cyan());
    if copied {
        println!();
        println!("  📋 Copied to clipboard");
    }

    Ok(())
}

/// Format bytes to human-readable size
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Handle shell completion generation
pub fn handle_completion(shell: Shell, cmd: &mut Command) -> Result<()> {
    // Script goes to stdout, instructions to stderr so the output can be
    // redirected straight into a completions file.
    generate(shell, cmd, "cfdrive", &mut std::io::stdout());

    match shell {
        Shell::Bash => {
            eprintln!("# Add to your ~/.bashrc:");
            eprintln!("#   source <(cfdrive --completions bash)");
        }
        Shell::Zsh => {
            eprintln!("# Save as a completion file:");
            eprintln!("#   cfdrive --completions zsh > ~/.zsh/completion/_cfdrive");
            eprintln!("# then add to ~/.zshrc:");
            eprintln!("#   fpath=(~/.zsh/completion $fpath)");
            eprintln!("#   autoload -U compinit && compinit");
        }
        Shell::Fish => {
            eprintln!("#   cfdrive --completions fish > ~/.config/fish/completions/cfdrive.fish");
        }
        Shell::PowerShell => {
            eprintln!("#   cfdrive --completions powershell | Out-String | Invoke-Expression");
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(10), "10 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }
}
