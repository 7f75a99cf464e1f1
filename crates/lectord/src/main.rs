use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use lectord::{CommandEngineProvider, StructuredHealthReporter, SystemConfigLoader, bootstrap_with};

fn main() -> ExitCode {
    let reporter = Arc::new(StructuredHealthReporter::new());
    let worker = match bootstrap_with(&SystemConfigLoader, reporter, &CommandEngineProvider) {
        Ok(worker) => worker,
        Err(error) => {
            // Telemetry may not be installed yet, so write the cause directly.
            let _ = writeln!(io::stderr(), "lectord: {error}");
            return ExitCode::FAILURE;
        }
    };

    match worker.run(io::stdin().lock(), io::stdout().lock()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
