use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = idgate::cli::Cli::parse();
    if let Err(e) = idgate::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
