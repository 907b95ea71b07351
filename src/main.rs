//! picdupe - duplicate image finder
//!
//! Entry point for the picdupe CLI application.

use clap::Parser;
use picdupe::{
    cli::Cli,
    error::{ExitCode, StructuredError},
};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    match picdupe::run_app(cli) {
        Ok(code) => code.into(),
        Err(err) => {
            let exit_code = ExitCode::GeneralError;
            if json_errors {
                match StructuredError::new(&err, exit_code).to_json() {
                    Ok(json) => eprintln!("{}", json),
                    Err(_) => eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err),
                }
            } else {
                eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
            }
            exit_code.into()
        }
    }
}
