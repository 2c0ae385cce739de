use std::process;

use clap::Parser;
use orq::commands::ask::{self, AskArgs};
use orq::ui;

#[derive(Debug, Parser)]
#[command(
    name = "orask",
    about = "Ask a question to an OpenRouter-hosted model",
    disable_version_flag = true
)]
struct Cli {
    #[command(flatten)]
    ask: AskArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = ask::run(cli.ask).await {
        ui::error(&err);
        process::exit(1);
    }
}
