use std::process::ExitCode;

fn main() -> ExitCode {
    mainline_cli::run()
}
