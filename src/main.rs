mod cli;
mod runner;

#[tokio::main]
async fn main() {
    let cli = cli::parse_cli();
    if let Err(e) = runner::run_from_cli(cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
