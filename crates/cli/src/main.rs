use std::process::ExitCode;

fn main() -> ExitCode {
    referral_cli::run()
}
