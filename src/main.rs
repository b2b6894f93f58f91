use clap::Parser;
use poolcast::cli::Cli;

mod main_dispatch;
mod main_runtime;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = main_dispatch::run(&cli).await;
    std::process::exit(code);
}
