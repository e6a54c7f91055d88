use std::process::ExitCode;

fn main() -> ExitCode {
    match driver::main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(driver::Error::Arguments(error)) => ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(2)),
        Err(_) => ExitCode::FAILURE,
    }
}
