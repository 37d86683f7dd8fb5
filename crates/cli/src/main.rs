use std::process::ExitCode;

fn main() -> ExitCode {
    rfqmatch_cli::run()
}
