use std::env;
use std::io::{self, Read};

use clap::{Args, ValueEnum};

use crate::config::{self, ProfileConfig};
use crate::context::{self, ContextSpec, SourceKind};
use crate::openrouter::client::{ChatRequest, CompletionError, OpenRouterClient, wrap_answer};
use crate::openrouter::params::SamplingParams;
use crate::ui::{self, Ui};

const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
const MODEL_ENV: &str = "ORQ_MODEL";

/// Where the context blob is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContextTarget {
    System,
    User,
}

#[derive(Debug, Args, Clone)]
pub struct AskArgs {
    /// Question to send; read from stdin when omitted.
    prompt: Option<String>,

    /// Model identifier, e.g. openrouter/auto.
    #[arg(long)]
    model: Option<String>,

    /// System prompt.
    #[arg(long)]
    system: Option<String>,

    /// Comma-separated context sources (file paths or URLs).
    #[arg(long)]
    context: Option<String>,

    /// Context source type (txt, html, docx, odt, odp, ods, pdf, pptx, xlsx).
    #[arg(long, value_parser = SourceKind::parse)]
    context_type: Option<SourceKind>,

    /// Append the context blob to the system prompt or the user prompt.
    #[arg(long, value_enum, default_value_t = ContextTarget::System)]
    context_to: ContextTarget,

    /// Stream the answer incrementally instead of printing one block.
    #[arg(long)]
    stream: bool,

    /// Ask the service to compress the prompt to fit the model's context
    /// window (middle-out transform).
    #[arg(long)]
    compress: bool,

    /// API key override; defaults to the OPENROUTER_API_KEY environment
    /// variable.
    #[arg(long)]
    api_key: Option<String>,

    /// Named profile from the config file.
    #[arg(long)]
    profile: Option<String>,

    /// Sampling temperature, range [0, 2].
    #[arg(long)]
    temperature: Option<f32>,

    /// Nucleus sampling, range (0, 1].
    #[arg(long)]
    top_p: Option<f32>,

    /// Top-k sampling, 0 or greater.
    #[arg(long)]
    top_k: Option<u32>,

    /// Frequency penalty, range [-2, 2].
    #[arg(long)]
    frequency_penalty: Option<f32>,

    /// Presence penalty, range [-2, 2].
    #[arg(long)]
    presence_penalty: Option<f32>,

    /// Repetition penalty, range (0, 2].
    #[arg(long)]
    repetition_penalty: Option<f32>,

    /// Print the assembled request as JSON and exit without calling the API.
    #[arg(long)]
    dry_run: bool,

    /// Suppress progress output; fatal errors stay visible.
    #[arg(long)]
    quiet: bool,

    /// Print the resolved request settings before sending.
    #[arg(long)]
    verbose: bool,
}

pub async fn run(args: AskArgs) -> Result<(), String> {
    let profile = match &args.profile {
        Some(name) => config::load_profile(name)?,
        None => ProfileConfig::default(),
    };
    let ui = Ui::new(args.quiet);

    let model = args
        .model
        .clone()
        .or_else(|| env_value(MODEL_ENV))
        .or_else(|| profile.model.clone())
        .ok_or_else(|| format!("No model provided. Use --model or set {MODEL_ENV}."))?;

    let prompt = resolve_prompt(args.prompt.clone())?;
    let system = args.system.clone().or_else(|| profile.system.clone());

    let params = SamplingParams {
        temperature: args.temperature.or(profile.temperature),
        top_p: args.top_p.or(profile.top_p),
        top_k: args.top_k.or(profile.top_k),
        frequency_penalty: args.frequency_penalty.or(profile.frequency_penalty),
        presence_penalty: args.presence_penalty.or(profile.presence_penalty),
        repetition_penalty: args.repetition_penalty.or(profile.repetition_penalty),
    };
    params.validate().map_err(|err| err.to_string())?;

    let stream = args.stream || profile.stream.unwrap_or(false);
    let compress = args.compress || profile.compress.unwrap_or(false);

    let context_type = match (args.context_type, &profile.context_type) {
        (Some(kind), _) => kind,
        (None, Some(name)) => SourceKind::parse(name).map_err(|err| err.to_string())?,
        (None, None) => SourceKind::Txt,
    };

    // The credential is resolved before any context read or network
    // activity; a dry run never needs one.
    let api_key = if args.dry_run {
        None
    } else {
        Some(resolve_api_key(args.api_key.clone())?)
    };

    let (system, prompt) = match &args.context {
        Some(sources) => {
            let spec = ContextSpec {
                sources: sources.clone(),
                kind: context_type,
            };
            let blob = context::read_context(&spec, &ui)
                .await
                .map_err(|err| err.to_string())?;
            inject_context(system, prompt, blob, args.context_to)
        }
        None => (system, prompt),
    };

    let request = ChatRequest::new(&model, system.as_deref(), &prompt, stream, compress, params);

    if args.verbose {
        ui.info(&format!(
            "model={model} stream={stream} compress={compress} context_to={:?}",
            args.context_to
        ));
    }

    if args.dry_run {
        let body = serde_json::json!({
            "dry_run": true,
            "model": model,
            "request": request,
        });
        let rendered = serde_json::to_string(&body)
            .map_err(|err| format!("Failed to render dry-run request: {err}"))?;
        println!("{rendered}");
        return Ok(());
    }

    let client = OpenRouterClient::new(api_key.unwrap_or_default());

    ui.blank();
    if stream {
        client
            .complete_stream(&request, |text| ui.answer_fragment(text))
            .await
            .map_err(describe_completion_error)?;
    } else {
        let content = client
            .complete(&request)
            .await
            .map_err(describe_completion_error)?;
        ui.answer(&wrap_answer(&content));
    }
    ui.blank();
    ui.success("Completed successfully");

    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn resolve_api_key(flag: Option<String>) -> Result<String, String> {
    flag.filter(|value| !value.trim().is_empty())
        .or_else(|| env_value(OPENROUTER_API_KEY_ENV))
        .ok_or_else(|| {
            format!("{OPENROUTER_API_KEY_ENV} is not set in the environment. Use --api-key or export it.")
        })
}

fn resolve_prompt(arg: Option<String>) -> Result<String, String> {
    if let Some(prompt) = arg {
        let trimmed = prompt.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| format!("Failed to read prompt from stdin: {err}"))?;
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Err("No prompt provided. Pass it as an argument or on stdin.".to_string());
    }
    Ok(trimmed.to_string())
}

/// Appends the context blob to the system or user prompt, one space between
/// the existing text and the blob.
fn inject_context(
    system: Option<String>,
    prompt: String,
    blob: String,
    target: ContextTarget,
) -> (Option<String>, String) {
    match target {
        ContextTarget::System => {
            let combined = match system {
                Some(base) if !base.trim().is_empty() => format!("{base} {blob}"),
                _ => blob,
            };
            (Some(combined), prompt)
        }
        ContextTarget::User => (system, format!("{prompt} {blob}")),
    }
}

fn describe_completion_error(err: CompletionError) -> String {
    if let CompletionError::Api { status, body, .. } = &err {
        ui::error(&format!("status: {status}"));
        ui::error(&format!("data: {body}"));
    }
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_appends_to_system_prompt_by_default() {
        let (system, prompt) = inject_context(
            Some("You are terse.".to_string()),
            "question".to_string(),
            "blob".to_string(),
            ContextTarget::System,
        );
        assert_eq!(system.as_deref(), Some("You are terse. blob"));
        assert_eq!(prompt, "question");
    }

    #[test]
    fn context_becomes_the_system_prompt_when_none_was_given() {
        let (system, prompt) = inject_context(
            None,
            "question".to_string(),
            "blob".to_string(),
            ContextTarget::System,
        );
        assert_eq!(system.as_deref(), Some("blob"));
        assert_eq!(prompt, "question");
    }

    #[test]
    fn context_can_target_the_user_prompt() {
        let (system, prompt) = inject_context(
            Some("sys".to_string()),
            "question".to_string(),
            "blob".to_string(),
            ContextTarget::User,
        );
        assert_eq!(system.as_deref(), Some("sys"));
        assert_eq!(prompt, "question blob");
    }
}
