//! Entry point for the `hearthd` server binary.

use std::process::ExitCode;

fn main() -> ExitCode {
    match hearthd::run_server() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Telemetry is not installed when configuration fails to load.
            hearthd::initialise_fallback();
            tracing::error!(
                target: "hearthd::process",
                error = %error,
                "server terminated with an error"
            );
            ExitCode::FAILURE
        }
    }
}
