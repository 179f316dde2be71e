//! Voice command recognition and speech synthesis
//!
//! Transcription and synthesis engines are platform collaborators; this module
//! only defines their seams ([`Transcriber`], [`SpeechSynthesizer`]) and the
//! logic around them: recording state, final-result handling and command
//! classification.

use crate::config::SpeechConfig;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from the speech recognition collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("Speech recognition is not authorized ({0:?})")]
    NotAuthorized(Authorization),

    #[error("Failed to start transcription: {0}")]
    StartFailed(String),
}

/// Speech recognition permission as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Authorized,
    Denied,
    Restricted,
    NotDetermined,
}

/// Event emitted by a running transcription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    Partial(String),
    Final(String),
    Failed(String),
}

/// Streaming speech-to-text engine
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn request_authorization(&self) -> Authorization;

    /// Start capturing audio and stream transcript events for `locale`
    async fn start(&self, locale: &str) -> Result<mpsc::Receiver<TranscriptEvent>, SpeechError>;

    /// Stop capturing audio; the engine emits its final result afterwards
    fn stop(&self);
}

/// A phrase to be spoken
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub language: String,
    pub rate: f32,
}

/// Voice used for every utterance
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    language: String,
    rate: f32,
}

impl VoiceSettings {
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self {
            language: config.voice_language.clone(),
            rate: config.voice_rate,
        }
    }

    pub fn utterance(&self, text: impl Into<String>) -> Utterance {
        Utterance {
            text: text.into(),
            language: self.language.clone(),
            rate: self.rate,
        }
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self::from_config(&SpeechConfig::default())
    }
}

/// Text-to-speech engine, fire-and-forget
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, utterance: Utterance);
}

/// Synthesizer that only logs what it would say
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSynthesizer;

impl SpeechSynthesizer for TracingSynthesizer {
    fn speak(&self, utterance: Utterance) {
        tracing::info!(
            language = %utterance.language,
            rate = utterance.rate,
            text = %utterance.text,
            "Speaking"
        );
    }
}

/// Commands understood by the voice screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    PlaySound,
    StopPlayback,
    SumNumbers,
    Unknown,
}

impl VoiceCommand {
    /// Classify a final transcript
    ///
    /// Matching is exact apart from surrounding whitespace.
    pub fn classify(transcript: &str) -> Self {
        match transcript.trim() {
            "Reproduce el sonido" => VoiceCommand::PlaySound,
            "Detener la reproducción" => VoiceCommand::StopPlayback,
            "Suma dos números" | "Suma los números" => VoiceCommand::SumNumbers,
            _ => VoiceCommand::Unknown,
        }
    }

    /// Line reported back for this command
    pub fn response(&self) -> &'static str {
        match self {
            VoiceCommand::PlaySound => "Reproduciendo...",
            VoiceCommand::StopPlayback => "La reproducción se ha detenido",
            VoiceCommand::SumNumbers => "Sumando números...",
            VoiceCommand::Unknown => "Hola mucho gusto, soy el señor salchicha",
        }
    }
}

/// Recording state shown on the voice screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
    Analyzed,
}

impl RecordingState {
    pub fn status_text(&self) -> &'static str {
        match self {
            RecordingState::Idle => "Presione el botón para iniciar la grabación",
            RecordingState::Recording => "Grabando...",
            RecordingState::Analyzed => "Audio analizado.",
        }
    }

    pub fn button_title(&self) -> &'static str {
        match self {
            RecordingState::Recording => "Detener grabación",
            _ => "Iniciar grabación",
        }
    }
}

/// Record-button driven transcription session
///
/// Only final transcripts are classified; partial results are ignored.
pub struct VoiceSession<T: Transcriber> {
    transcriber: T,
    locale: String,
    state: RecordingState,
    events: Option<mpsc::Receiver<TranscriptEvent>>,
}

impl<T: Transcriber> VoiceSession<T> {
    pub fn new(transcriber: T, config: &SpeechConfig) -> Self {
        Self {
            transcriber,
            locale: config.recognition_locale.clone(),
            state: RecordingState::Idle,
            events: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Start recording when idle, stop when recording
    ///
    /// Starting discards any transcription left over from a previous run.
    pub async fn toggle(&mut self) -> Result<RecordingState, SpeechError> {
        if self.state == RecordingState::Recording {
            self.transcriber.stop();
            self.state = RecordingState::Analyzed;
            tracing::debug!("Recording stopped");
            return Ok(self.state);
        }

        self.events = None;
        let authorization = self.transcriber.request_authorization().await;
        if authorization != Authorization::Authorized {
            tracing::warn!(?authorization, "Speech recognition not authorized");
            return Err(SpeechError::NotAuthorized(authorization));
        }

        let events = self.transcriber.start(&self.locale).await?;
        self.events = Some(events);
        self.state = RecordingState::Recording;
        tracing::debug!(locale = %self.locale, "Recording started");
        Ok(self.state)
    }

    /// Wait for the final transcript of the current recording and classify it
    ///
    /// Returns `None` if recognition fails, the stream ends without a final
    /// result, or nothing is being transcribed. The session is finished in
    /// every case.
    pub async fn next_command(&mut self) -> Option<(String, VoiceCommand)> {
        let events = self.events.as_mut()?;

        let result = loop {
            match events.recv().await {
                Some(TranscriptEvent::Partial(text)) => {
                    tracing::trace!(text = %text, "Ignoring partial transcript");
                }
                Some(TranscriptEvent::Final(text)) => {
                    let command = VoiceCommand::classify(&text);
                    tracing::info!(
                        transcript = %text,
                        ?command,
                        response = command.response(),
                        "Voice command recognized"
                    );
                    break Some((text, command));
                }
                Some(TranscriptEvent::Failed(reason)) => {
                    tracing::warn!(reason = %reason, "Transcription failed");
                    break None;
                }
                None => break None,
            }
        };

        if self.state == RecordingState::Recording {
            self.transcriber.stop();
        }
        self.events = None;
        self.state = RecordingState::Analyzed;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedTranscriber {
        authorization: Authorization,
        script: Mutex<Option<Vec<TranscriptEvent>>>,
        stops: AtomicUsize,
    }

    impl ScriptedTranscriber {
        fn new(authorization: Authorization, script: Vec<TranscriptEvent>) -> Self {
            Self {
                authorization,
                script: Mutex::new(Some(script)),
                stops: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transcriber for ScriptedTranscriber {
        async fn request_authorization(&self) -> Authorization {
            self.authorization
        }

        async fn start(
            &self,
            locale: &str,
        ) -> Result<mpsc::Receiver<TranscriptEvent>, SpeechError> {
            assert_eq!(locale, "es-ES");
            let script = self
                .script
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| SpeechError::StartFailed("already started".to_string()))?;
            let (tx, rx) = mpsc::channel(script.len().max(1));
            for event in script {
                tx.try_send(event).unwrap();
            }
            Ok(rx)
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_classify_known_phrases() {
        assert_eq!(
            VoiceCommand::classify("Reproduce el sonido"),
            VoiceCommand::PlaySound
        );
        assert_eq!(
            VoiceCommand::classify("Detener la reproducción"),
            VoiceCommand::StopPlayback
        );
        assert_eq!(
            VoiceCommand::classify("Suma dos números"),
            VoiceCommand::SumNumbers
        );
        assert_eq!(
            VoiceCommand::classify("Suma los números"),
            VoiceCommand::SumNumbers
        );
    }

    #[test]
    fn test_classify_is_exact() {
        assert_eq!(
            VoiceCommand::classify("reproduce el sonido"),
            VoiceCommand::Unknown
        );
        assert_eq!(
            VoiceCommand::classify("Reproduce el sonido por favor"),
            VoiceCommand::Unknown
        );
        assert_eq!(
            VoiceCommand::classify("  Suma dos números "),
            VoiceCommand::SumNumbers
        );
    }

    #[test]
    fn test_unknown_command_response() {
        assert_eq!(
            VoiceCommand::Unknown.response(),
            "Hola mucho gusto, soy el señor salchicha"
        );
    }

    #[test]
    fn test_voice_settings_build_utterance() {
        let utterance = VoiceSettings::default().utterance("Valclan");
        assert_eq!(utterance.text, "Valclan");
        assert_eq!(utterance.language, "es-MX");
        assert!((utterance.rate - 0.55).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_final_transcript_is_classified() {
        let transcriber = ScriptedTranscriber::new(
            Authorization::Authorized,
            vec![
                TranscriptEvent::Partial("Suma".to_string()),
                TranscriptEvent::Final("Suma dos números".to_string()),
            ],
        );
        let mut session = VoiceSession::new(transcriber, &SpeechConfig::default());

        assert_eq!(session.toggle().await.unwrap(), RecordingState::Recording);
        assert_eq!(session.state().button_title(), "Detener grabación");

        let (text, command) = session.next_command().await.unwrap();
        assert_eq!(text, "Suma dos números");
        assert_eq!(command, VoiceCommand::SumNumbers);
        assert_eq!(session.state(), RecordingState::Analyzed);
        assert_eq!(session.transcriber.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_ends_session_without_command() {
        let transcriber = ScriptedTranscriber::new(
            Authorization::Authorized,
            vec![TranscriptEvent::Failed("no speech".to_string())],
        );
        let mut session = VoiceSession::new(transcriber, &SpeechConfig::default());

        session.toggle().await.unwrap();
        assert!(session.next_command().await.is_none());
        assert_eq!(session.state(), RecordingState::Analyzed);
        assert!(session.next_command().await.is_none());
    }

    #[tokio::test]
    async fn test_toggle_twice_stops_recording() {
        let transcriber = ScriptedTranscriber::new(Authorization::Authorized, vec![]);
        let mut session = VoiceSession::new(transcriber, &SpeechConfig::default());

        session.toggle().await.unwrap();
        assert_eq!(session.toggle().await.unwrap(), RecordingState::Analyzed);
        assert_eq!(session.state().status_text(), "Audio analizado.");
        assert_eq!(session.transcriber.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_does_not_start() {
        let transcriber = ScriptedTranscriber::new(Authorization::Denied, vec![]);
        let mut session = VoiceSession::new(transcriber, &SpeechConfig::default());

        let err = session.toggle().await.unwrap_err();
        assert_eq!(err, SpeechError::NotAuthorized(Authorization::Denied));
        assert_eq!(session.state(), RecordingState::Idle);
    }
}
