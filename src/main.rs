use std::env;
use std::process::ExitCode;

use log::LevelFilter;

use epinet::config::Config;
use epinet::error::EpinetError;
use epinet::log::enable_logging;
use epinet::report::CsvRecorder;
use epinet::simulation::Simulation;

fn run() -> Result<(), EpinetError> {
    let mut args = env::args().skip(1);
    let config_path = args
        .next()
        .ok_or_else(|| EpinetError::Config("usage: epinet <config.json> [output-dir]".into()))?;
    let output_dir = args.next().unwrap_or_else(|| "results".to_string());

    let config = Config::load(&config_path)?;
    let mut simulation = Simulation::from_config(&config)?;
    let mut recorder = CsvRecorder::create(&output_dir)?;
    simulation.run(&mut recorder)?;
    recorder.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    enable_logging(LevelFilter::Info);
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            ExitCode::FAILURE
        }
    }
}
