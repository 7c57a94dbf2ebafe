use std::process::ExitCode;

fn main() -> ExitCode {
    mcpm_lib::run()
}
