//! Toggle the Windows default audio output between the configured device
//! pair, or list the active render endpoints with `--list`.
//!
//! Exit status is zero only if every device role was reassigned.

use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(windows)]
fn run() -> anyhow::Result<ExitCode> {
    use anyhow::Context;
    use audio_switcher_rs::audio::{ComGuard, DeviceEnumerator, PolicyConfigBinder};
    use audio_switcher_rs::switch::{SwitchConfig, SwitchController};
    use tracing::{info, warn};

    let list_only = std::env::args().any(|arg| arg == "--list");

    // The guard scopes COM to this one operation; it drops after every
    // other COM object, the policy handle included.
    let _com = ComGuard::new().context("COM initialization failed")?;
    let enumerator = DeviceEnumerator::new().context("audio service unreachable")?;

    if list_only {
        return list_endpoints(&enumerator);
    }

    let controller = SwitchController::new(SwitchConfig::default());
    let outcome = controller
        .run(&enumerator, &PolicyConfigBinder)
        .context("switch failed")?;

    info!("default output set to '{}'", outcome.target.name);
    for role_outcome in &outcome.roles {
        match &role_outcome.result {
            Ok(()) => info!("{} role updated", role_outcome.role),
            Err(err) => warn!("{err}"),
        }
    }

    Ok(if outcome.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(windows)]
fn list_endpoints(
    enumerator: &audio_switcher_rs::audio::DeviceEnumerator,
) -> anyhow::Result<ExitCode> {
    use anyhow::Context;
    use audio_switcher_rs::switch::EndpointDirectory;

    let default_id = enumerator.default_endpoint().ok().map(|e| e.id);

    for endpoint in enumerator
        .endpoints()
        .context("failed to enumerate render endpoints")?
    {
        let marker = if Some(&endpoint.id) == default_id.as_ref() {
            "  (default)"
        } else {
            ""
        };
        println!("{}{}  [{}]", endpoint.name, marker, endpoint.id);
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(not(windows))]
fn run() -> anyhow::Result<ExitCode> {
    anyhow::bail!("this utility only runs on Windows")
}
