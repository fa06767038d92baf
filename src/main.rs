use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use weather_stats::app::{self, Cli, Outcome};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = app::run(&cli, &mut out).and_then(|outcome| {
        out.flush()?;
        Ok(outcome)
    });

    match result {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::NotFound) => ExitCode::from(2),
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
