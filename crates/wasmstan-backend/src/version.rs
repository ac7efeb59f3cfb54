//! Backend version banner
//!
//! The banner is part of every model identity, so two different backends
//! never share compiled-model names.

use crate::config::BackendConfig;
use crate::error::BackendError;
use std::process::Stdio;
use tokio::process::Command;

/// Version bytes for identity computation
///
/// Uses `config.version` when set; otherwise runs
/// `<runtime> <cli-script> --version` in the backend root and returns its
/// stdout minus one trailing newline.
///
/// # Errors
/// - [`BackendError::ExecutableNotFound`] if the runtime is missing
/// - [`BackendError::VersionProbe`] if the probe exits unsuccessfully
pub async fn backend_version(config: &BackendConfig) -> Result<Vec<u8>, BackendError> {
    if let Some(version) = &config.version {
        return Ok(version.as_bytes().to_vec());
    }

    let output = Command::new(&config.runtime)
        .arg(config.cli_script_path())
        .arg("--version")
        .current_dir(&config.root)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| BackendError::from_spawn(config.runtime.clone(), e))?;

    if !output.status.success() {
        return Err(BackendError::VersionProbe {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let mut banner = output.stdout;
    if banner.last() == Some(&b'\n') {
        banner.pop();
    }
    tracing::debug!(banner = %String::from_utf8_lossy(&banner), "backend version probed");
    Ok(banner)
}
