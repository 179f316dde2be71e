//! Encarta command-line client
//!
//! Sends prompts to the configured chat-completions endpoint. In interactive
//! mode each new line supersedes the request still in flight.

use clap::Parser;
use encarta::chat::{BoardUpdate, ChatSession, HttpChatClient, PendingReply, ReplyBoard};
use encarta::cli::{Cli, Command, generate_config_template, submitted_prompt};
use encarta::config::Config;
use encarta::error::{AppError, AppResult, ChatError};
use encarta::metrics::Metrics;
use encarta::speech::{SpeechSynthesizer, TracingSynthesizer, VoiceCommand, VoiceSettings};
use encarta::telemetry;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const FAILURE_INDICATOR: &str = "No se pudo obtener una respuesta.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Config { output } => write_template(output.as_deref())?,
        Command::Ask { prompt } => {
            let config = startup(&cli.config)?;
            run_ask(&config, &prompt.join(" ")).await?;
        }
        Command::Voice { transcript } => {
            let config = startup(&cli.config)?;
            run_voice(&config, &transcript.join(" "));
        }
        Command::Chat => {
            let config = startup(&cli.config)?;
            run_chat(&config).await?;
        }
    }

    Ok(())
}

fn write_template(output: Option<&str>) -> AppResult<()> {
    let template = generate_config_template();
    match output {
        Some(path) => {
            std::fs::write(path, template)?;
            eprintln!("Configuration template written to {}", path);
        }
        None => print!("{}", template),
    }
    Ok(())
}

/// Load configuration and initialize telemetry
fn startup(config_path: &str) -> AppResult<Config> {
    let config = Config::load_or_default(config_path)?;
    telemetry::init(&config.observability.log_level);
    Ok(config)
}

fn build_session(config: &Config) -> AppResult<(ChatSession<HttpChatClient>, Arc<Metrics>)> {
    let client = HttpChatClient::new(&config.api, config.api_key()?)?;
    let metrics = Arc::new(Metrics::new()?);

    tracing::info!(
        endpoint = %client.endpoint(),
        model = %config.chat.model,
        timeout_seconds = config.api.request_timeout_seconds,
        "Chat client ready"
    );

    let session = ChatSession::new(client, config.chat.clone()).with_metrics(Arc::clone(&metrics));
    Ok((session, metrics))
}

async fn run_ask(config: &Config, prompt: &str) -> AppResult<()> {
    let Some(prompt) = submitted_prompt(prompt) else {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    };

    let (mut session, _metrics) = build_session(config)?;
    let reply = session.send(prompt).await?;
    println!("{}", reply);
    Ok(())
}

fn run_voice(config: &Config, transcript: &str) {
    let command = VoiceCommand::classify(transcript);
    tracing::debug!(transcript = %transcript, ?command, "Classified transcript");

    let response = command.response();
    println!("{}", response);
    TracingSynthesizer.speak(VoiceSettings::from_config(&config.speech).utterance(response));
}

async fn run_chat(config: &Config) -> AppResult<()> {
    let (mut session, metrics) = build_session(config)?;
    let mut board = ReplyBoard::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Option<PendingReply> = None;

    eprintln!("Ingrese su pregunta (Ctrl-D para salir):");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(prompt) = submitted_prompt(&line) else {
                    continue;
                };
                pending = Some(session.send(prompt));
            }
            outcome = settle(&mut pending), if pending.is_some() => {
                pending = None;
                render(&mut board, outcome);
            }
        }
    }

    // Input closed: let the last request finish before exiting
    if let Some(reply) = pending.take() {
        render(&mut board, reply.await);
    }

    match metrics.gather_text() {
        Ok(text) => tracing::debug!(metrics = %text, "Session metrics"),
        Err(e) => tracing::warn!(error = %e, "Failed to gather metrics"),
    }

    Ok(())
}

async fn settle(pending: &mut Option<PendingReply>) -> Result<String, ChatError> {
    match pending.as_mut() {
        Some(reply) => reply.await,
        None => std::future::pending().await,
    }
}

fn render(board: &mut ReplyBoard, outcome: Result<String, ChatError>) {
    match board.apply(outcome) {
        BoardUpdate::Replaced => println!("{}", board.text()),
        BoardUpdate::Failed => eprintln!("{}", FAILURE_INDICATOR),
        BoardUpdate::Ignored => {}
    }
}
