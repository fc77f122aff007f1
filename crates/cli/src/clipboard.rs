//! Best-effort clipboard support
//!
//! Pipes the text into whichever platform clipboard tool is installed.

use anyhow::{anyhow, Context, Result};
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

/// Clipboard tool and its arguments
struct Tool {
    program: &'static str,
    args: &'static [&'static str],
}

#[cfg(target_os = "macos")]
fn candidates() -> Vec<Tool> {
    vec![Tool { program: "pbcopy", args: &[] }]
}

#[cfg(target_os = "windows")]
fn candidates() -> Vec<Tool> {
    vec![Tool { program: "clip", args: &[] }]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn candidates() -> Vec<Tool> {
    let mut tools = Vec::new();
    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        tools.push(Tool { program: "wl-copy", args: &[] });
    }
    tools.push(Tool { program: "xclip", args: &["-selection", "clipboard"] });
    tools.push(Tool { program: "xsel", args: &["--clipboard", "--input"] });
    tools
}

/// Copy `text` to the system clipboard, returning the tool that did it
pub fn copy_to_clipboard(text: &str) -> Result<&'static str> {
    for tool in candidates() {
        match run(&tool, text) {
            Ok(()) => return Ok(tool.program),
            Err(e) if is_not_found(&e) => {
                tracing::debug!(tool = tool.program, "clipboard tool not installed");
            }
            Err(e) => return Err(e),
        }
    }

    Err(anyhow!("no clipboard tool available"))
}

fn run(tool: &Tool, text: &str) -> Result<()> {
    let mut child = Command::new(tool.program)
        .args(tool.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .with_context(|| format!("failed to write to {}", tool.program))?;
    }

    let status = child.wait()?;
    if !status.success() {
        return Err(anyhow!("{} exited with {}", tool.program, status));
    }
    Ok(())
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == ErrorKind::NotFound)
}
