//! Command-line interface for Encarta
//!
//! Provides argument parsing and subcommand handling for the Encarta binary.

use clap::{Parser, Subcommand};

/// Chat-completion client with voice command classification
#[derive(Parser)]
#[command(name = "encarta")]
#[command(version)]
#[command(about = "Chat-completion client with voice command classification")]
#[command(
    long_about = "Encarta sends prompts to an OpenAI-compatible chat-completions endpoint. \
    In interactive mode every new line supersedes the request still in flight, so only the \
    latest answer is ever printed. The API key is read from the environment variable named \
    in the configuration (OPENAI_API_KEY by default)."
)]
pub struct Cli {
    /// Path to configuration file (built-in defaults are used if it does not exist)
    #[arg(short, long, default_value = "encarta.toml", global = true)]
    pub config: String,

    /// Subcommand to run (defaults to interactive chat)
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Send a single prompt and print the reply
    Ask {
        /// Prompt text, sent as given (words joined by single spaces)
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Interactive chat: one prompt per line, newer lines supersede pending ones
    ///
    /// Blank lines are skipped. Other lines are sent as typed.
    Chat,

    /// Classify a transcript as a voice command and print the response line
    Voice {
        /// Final transcript text
        #[arg(required = true, num_args = 1..)]
        transcript: Vec<String>,
    },

    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Prompt to send for a line of user input, or `None` when it is blank
///
/// Non-blank input is passed through untouched, surrounding whitespace included.
pub fn submitted_prompt(input: &str) -> Option<&str> {
    if input.trim().is_empty() {
        None
    } else {
        Some(input)
    }
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Encarta Configuration
# ======================
#
# Every value below is the built-in default. Delete any line to keep it.
# The API key itself never goes in this file: export it in the environment
# variable named by api.api_key_env.

# ─────────────────────────────────────────────────────────────────────────────
# API
# ─────────────────────────────────────────────────────────────────────────────

[api]
# OpenAI-compatible chat-completions URL
endpoint = "https://api.openai.com/v1/chat/completions"

# Environment variable holding the bearer token
api_key_env = "OPENAI_API_KEY"

# Request timeout in seconds (1-300). A timeout is reported as a transport error.
request_timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# CHAT
# ─────────────────────────────────────────────────────────────────────────────

[chat]
model = "gpt-3.5-turbo"
system_prompt = "Estás hablando con un asistente de inteligencia artificial. ¿En qué puedo ayudarte hoy?"

# Appended verbatim to every prompt
prompt_suffix = ". Limita tu respuesta a 50 palabras o menos"

# Completion token cap (must be > 0)
max_tokens = 150

# ─────────────────────────────────────────────────────────────────────────────
# TEXT RECOGNITION
# ─────────────────────────────────────────────────────────────────────────────

[vision]
# Recognized text must equal this exactly to count as a match
reference_text = "Valclan"

# ─────────────────────────────────────────────────────────────────────────────
# SPEECH
# ─────────────────────────────────────────────────────────────────────────────

[speech]
recognition_locale = "es-ES"
voice_language = "es-MX"

# Speaking rate (0.0-1.0)
voice_rate = 0.55

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG overrides)
log_level = "info"
"#
}
