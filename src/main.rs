use std::io;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};
use orq::commands::ask::{self, AskArgs};
use orq::commands::config::{self, ConfigArgs};
use orq::ui;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("ORQ_GIT_SHA"),
    ", built ",
    env!("ORQ_BUILD_TS"),
    ")"
);

const ROOT_HELP_EXAMPLES: &str = "Examples:\n  orq ask --model openrouter/auto \"2+2?\"\n  echo \"2+2?\" | orq ask --model liquid/lfm-40b:free --stream\n  orq ask --model openrouter/auto --context report.docx --context-type docx \"Summarize the report\"\n  orq config check\n  orq completion bash > ~/.local/share/bash-completion/completions/orq";

const ASK_HELP_EXAMPLES: &str = "Examples:\n  orq ask --model openrouter/auto \"2+2?\"\n  orq ask --model openrouter/auto --context a.txt,b.txt \"What do these files have in common?\"\n  orq ask --model openrouter/auto --context example.com --context-type html --compress \"Summarize this page\"\n  orq ask --model openrouter/auto --dry-run --temperature 0.2 \"Explain transforms\"";

#[derive(Debug, Parser)]
#[command(
    name = "orq",
    version = VERSION,
    about = "Ask OpenRouter-hosted models, with document or web-page context",
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Ask a question to a model", after_help = ASK_HELP_EXAMPLES)]
    Ask(AskArgs),
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, "orq", &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, "orq", &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, "orq", &mut io::stdout()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ask(args) => ask::run(args).await,
        Commands::Config(args) => config::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        ui::error(&err);
        process::exit(1);
    }
}
