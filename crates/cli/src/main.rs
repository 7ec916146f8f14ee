use std::process::ExitCode;

fn main() -> ExitCode {
    snoozy_cli::run()
}
