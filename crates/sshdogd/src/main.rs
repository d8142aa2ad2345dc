use std::process::ExitCode;

use sshdogd::LaunchError;

fn main() -> ExitCode {
    match sshdogd::run() {
        Ok(report) if report.failed() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(LaunchError::Arguments { source }) => source.exit(),
        Err(_) => ExitCode::FAILURE,
    }
}
