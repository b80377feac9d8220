mod cli;
mod runner;

/// Exit codes are spec.md §6's contract: 0 clean, 1 a failing issue at/above threshold, 2 any
/// setup failure (bad flags, unreadable file, malformed OpenAPI document, ...).
#[tokio::main]
async fn main() {
    let cli = cli::parse_cli();
    match runner::run_from_cli(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(2);
        }
    }
}
