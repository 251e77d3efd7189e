use clap::Parser;
use scarif_cli::config::{Cli, ConvertConfig};
use scarif_cli::convert;
use scarif_logger::LogSeverity::{Fatal, Info};
use scarif_logger::{log, set_min_severity};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(severity) = cli.log_level {
        set_min_severity(severity);
    }

    let config = match ConvertConfig::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            log(err.to_string(), Fatal);
            return ExitCode::from(2);
        }
    };

    log("Scarif init".to_owned(), Info);
    match convert::run(config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            log(format!("Conversion failed: {}", err), Fatal);
            ExitCode::FAILURE
        }
    }
}
