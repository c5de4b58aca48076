use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match thia_cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            thia_cli::print_error(&err.to_string());
            ExitCode::from(err.exit_code())
        }
    }
}
