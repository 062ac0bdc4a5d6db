use std::io;
use std::process::ExitCode;

use ldvst::{probe_all, NativeLoader, Options, ReportFormat, EXIT_USAGE, USAGE};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ldvst=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .try_init()
        .ok();

    let options = match Options::parse(std::env::args_os().skip(1)) {
        Ok(options) => options,
        Err(_) => {
            println!("{USAGE}");
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };

    let mut sink = ReportFormat::from_env().sink(io::stdout());
    let mut loader = NativeLoader;

    match probe_all(&options, &mut loader, sink.as_mut()) {
        Ok(summary) => {
            tracing::info!(
                modules = summary.modules.len(),
                unload_failures = summary.unload_failures(),
                "probe finished"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => match err.exit_code() {
            Some(code) => {
                tracing::debug!(error = %err, "probe stopped");
                Ok(ExitCode::from(code))
            }
            None => Err(err.into()),
        },
    }
}
