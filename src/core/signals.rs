//! # OS termination signals.
//!
//! [`shutdown_signal`] completes when the process is asked to stop and
//! reports which signal it saw, so the harness can log it.
//!
//! - Unix: `SIGINT`, `SIGTERM` (Kubernetes pod termination), `SIGQUIT`
//! - Elsewhere: Ctrl-C

/// Waits for a termination signal and returns its name.
///
/// Fails only if a listener cannot be registered.
#[cfg(unix)]
pub async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut int = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = int.recv() => "SIGINT",
        _ = term.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for a termination signal and returns its name.
#[cfg(not(unix))]
pub async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
