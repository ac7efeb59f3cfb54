//! Environment checks run before anything is spawned

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use std::process::Stdio;
use tokio::process::Command;

/// Check every precondition, in order, stopping at the first failure
///
/// 1. the toolchain variable is set and non-empty
/// 2. the compiler is on the search path and `--version` succeeds
/// 3. the backend entry and CLI scripts exist
///
/// # Errors
/// The [`HarnessError`] describing the first unmet precondition
pub async fn check(config: &HarnessConfig) -> Result<(), HarnessError> {
    check_toolchain(config)?;
    check_compiler(&config.compiler).await?;
    check_backend_files(config)?;
    tracing::debug!("preconditions satisfied");
    Ok(())
}

fn check_toolchain(config: &HarnessConfig) -> Result<(), HarnessError> {
    match &config.toolchain_path {
        Some(path) if !path.as_os_str().is_empty() => {
            tracing::debug!(var = %config.toolchain_var, path = %path.display(), "toolchain located");
            Ok(())
        }
        _ => Err(HarnessError::MissingToolchain {
            var: config.toolchain_var.clone(),
        }),
    }
}

async fn check_compiler(compiler: &str) -> Result<(), HarnessError> {
    let status = Command::new(compiler)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HarnessError::CompilerNotFound {
                    compiler: compiler.to_string(),
                }
            } else {
                HarnessError::Io(e)
            }
        })?;

    if !status.success() {
        return Err(HarnessError::CompilerFailed {
            compiler: compiler.to_string(),
            status,
        });
    }
    Ok(())
}

fn check_backend_files(config: &HarnessConfig) -> Result<(), HarnessError> {
    for path in [config.backend.entry_script_path(), config.backend.cli_script_path()] {
        if !path.is_file() {
            return Err(HarnessError::MissingBackendFile { path });
        }
    }
    Ok(())
}
