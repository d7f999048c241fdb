use std::process::ExitCode;

fn main() -> ExitCode {
    bloodlink_cli::run()
}
