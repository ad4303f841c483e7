use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    match jmpd::run_daemon(Arc::new(jmpd::builtin_routes())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Bootstrap can fail before the log sink exists.
            eprintln!("jmpd: {error}");
            ExitCode::FAILURE
        }
    }
}
