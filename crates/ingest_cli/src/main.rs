//! CLI smoke entry point.
//!
//! Prints core linkage info and the filter chain built from an optional
//! JSON config file: `ingest_cli [config.json]`.

use ingest_core::{Pipeline, PipelineConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("ingest_core ping={}", ingest_core::ping());
    println!("ingest_core version={}", ingest_core::core_version());

    let config = match std::env::args().nth(1) {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(message) => {
                eprintln!("ingest_cli config error: {message}");
                return ExitCode::FAILURE;
            }
        },
        None => PipelineConfig::default(),
    };

    let pipeline = Pipeline::standard(&config);
    println!("ingest_core conflict_mode={:?}", config.conflict_mode);
    for (index, name) in pipeline.filter_names().iter().enumerate() {
        println!("filter[{index}]={name}");
    }
    ExitCode::SUCCESS
}

fn load_config(path: &str) -> Result<PipelineConfig, String> {
    let raw = std::fs::read_to_string(path).map_err(|err| format!("cannot read `{path}`: {err}"))?;
    PipelineConfig::from_json_str(&raw).map_err(|err| err.to_string())
}
