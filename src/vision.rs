//! Label scanning: capture, text recognition and reference matching
//!
//! The camera and the OCR engine are platform collaborators ([`ImageSource`],
//! [`TextRecognizer`]). `MedicineScanner` wires them together, checks the
//! recognized text against the configured reference and reads it aloud.

use crate::config::VisionConfig;
use crate::speech::{SpeechSynthesizer, VoiceSettings};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors from the text recognition pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VisionError {
    #[error("Text recognition failed: {0}")]
    Recognition(String),

    #[error("Recognition task did not complete: {0}")]
    TaskFailed(String),
}

/// One region of recognized text with its ranked candidates, best first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Observation {
    candidates: Vec<String>,
}

impl Observation {
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    pub fn top_candidate(&self) -> Option<&str> {
        self.candidates.first().map(String::as_str)
    }
}

/// Join the top candidate of every observation with single spaces
///
/// Observations without candidates are skipped.
pub fn join_observations(observations: &[Observation]) -> String {
    observations
        .iter()
        .filter_map(Observation::top_candidate)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Optical character recognition engine
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<Vec<Observation>, VisionError>;
}

/// Camera or image picker
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Returns `None` when the user dismisses the picker
    async fn capture(&self) -> Option<Vec<u8>>;
}

/// Exact comparison against a reference label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMatcher {
    reference: String,
}

impl ReferenceMatcher {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }

    pub fn from_config(config: &VisionConfig) -> Self {
        Self::new(config.reference_text.clone())
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn matches(&self, text: &str) -> bool {
        text == self.reference
    }
}

/// Text recognized from one captured image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub text: String,
    pub matched: bool,
}

impl ScanResult {
    /// Caption displayed under the captured image
    pub fn label(&self) -> String {
        format!("Medicamento: {}", self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// User closed the picker without taking a picture
    Dismissed,
    Recognized(ScanResult),
}

/// Capture → recognize → match → speak
pub struct MedicineScanner<S, R, V>
where
    S: ImageSource,
    R: TextRecognizer + 'static,
    V: SpeechSynthesizer,
{
    source: S,
    recognizer: Arc<R>,
    synthesizer: V,
    matcher: ReferenceMatcher,
    voice: VoiceSettings,
}

impl<S, R, V> MedicineScanner<S, R, V>
where
    S: ImageSource,
    R: TextRecognizer + 'static,
    V: SpeechSynthesizer,
{
    pub fn new(source: S, recognizer: R, synthesizer: V, matcher: ReferenceMatcher) -> Self {
        Self {
            source,
            recognizer: Arc::new(recognizer),
            synthesizer,
            matcher,
            voice: VoiceSettings::default(),
        }
    }

    pub fn with_voice(mut self, voice: VoiceSettings) -> Self {
        self.voice = voice;
        self
    }

    /// Run one scan
    ///
    /// Recognition runs on its own task so the caller's context stays free;
    /// the result comes back here before any state is produced. Non-empty
    /// text is spoken once.
    pub async fn scan(&self) -> Result<ScanOutcome, VisionError> {
        let Some(image) = self.source.capture().await else {
            tracing::debug!("Image capture dismissed");
            return Ok(ScanOutcome::Dismissed);
        };

        let recognizer = Arc::clone(&self.recognizer);
        let observations = tokio::spawn(async move { recognizer.recognize(&image).await })
            .await
            .map_err(|e| VisionError::TaskFailed(e.to_string()))??;

        let text = join_observations(&observations);
        let matched = self.matcher.matches(&text);
        tracing::info!(
            text = %text,
            matched,
            reference = %self.matcher.reference(),
            "Text recognized"
        );

        if !text.is_empty() {
            self.synthesizer.speak(self.voice.utterance(text.clone()));
        }

        Ok(ScanOutcome::Recognized(ScanResult { text, matched }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::Utterance;
    use std::sync::Mutex;

    struct FixedSource(Option<Vec<u8>>);

    #[async_trait]
    impl ImageSource for FixedSource {
        async fn capture(&self) -> Option<Vec<u8>> {
            self.0.clone()
        }
    }

    struct FixedRecognizer(Result<Vec<Observation>, VisionError>);

    #[async_trait]
    impl TextRecognizer for FixedRecognizer {
        async fn recognize(&self, image: &[u8]) -> Result<Vec<Observation>, VisionError> {
            assert!(!image.is_empty());
            self.0.clone()
        }
    }

    #[derive(Default, Clone)]
    struct RecordingSynthesizer(Arc<Mutex<Vec<Utterance>>>);

    impl SpeechSynthesizer for RecordingSynthesizer {
        fn speak(&self, utterance: Utterance) {
            self.0.lock().unwrap().push(utterance);
        }
    }

    fn obs(candidates: &[&str]) -> Observation {
        Observation::new(candidates.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn test_join_uses_top_candidates() {
        let observations = vec![obs(&["Val", "VaI"]), obs(&[]), obs(&["clan"])];
        assert_eq!(join_observations(&observations), "Val clan");
        assert_eq!(join_observations(&[]), "");
    }

    #[test]
    fn test_reference_matcher_is_exact() {
        let matcher = ReferenceMatcher::from_config(&VisionConfig::default());
        assert!(matcher.matches("Valclan"));
        assert!(!matcher.matches("valclan"));
        assert!(!matcher.matches("Valclan 500mg"));
    }

    #[tokio::test]
    async fn test_scan_recognizes_matches_and_speaks() {
        let speech = RecordingSynthesizer::default();
        let scanner = MedicineScanner::new(
            FixedSource(Some(vec![1, 2, 3])),
            FixedRecognizer(Ok(vec![obs(&["Valclan"])])),
            speech.clone(),
            ReferenceMatcher::new("Valclan"),
        );

        let outcome = scanner.scan().await.unwrap();
        let ScanOutcome::Recognized(result) = outcome else {
            panic!("expected a recognized scan");
        };
        assert!(result.matched);
        assert_eq!(result.label(), "Medicamento: Valclan");

        let spoken = speech.0.lock().unwrap();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, "Valclan");
        assert_eq!(spoken[0].language, "es-MX");
    }

    #[tokio::test]
    async fn test_scan_dismissed_does_nothing() {
        let speech = RecordingSynthesizer::default();
        let scanner = MedicineScanner::new(
            FixedSource(None),
            FixedRecognizer(Ok(vec![obs(&["Valclan"])])),
            speech.clone(),
            ReferenceMatcher::new("Valclan"),
        );

        assert_eq!(scanner.scan().await.unwrap(), ScanOutcome::Dismissed);
        assert!(speech.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_recognition_failure_is_surfaced() {
        let speech = RecordingSynthesizer::default();
        let scanner = MedicineScanner::new(
            FixedSource(Some(vec![9])),
            FixedRecognizer(Err(VisionError::Recognition("blurry".to_string()))),
            speech.clone(),
            ReferenceMatcher::new("Valclan"),
        );

        assert_eq!(
            scanner.scan().await.unwrap_err(),
            VisionError::Recognition("blurry".to_string())
        );
        assert!(speech.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_empty_text_is_not_spoken() {
        let speech = RecordingSynthesizer::default();
        let scanner = MedicineScanner::new(
            FixedSource(Some(vec![9])),
            FixedRecognizer(Ok(vec![])),
            speech.clone(),
            ReferenceMatcher::new("Valclan"),
        );

        let outcome = scanner.scan().await.unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Recognized(ScanResult {
                text: String::new(),
                matched: false,
            })
        );
        assert!(speech.0.lock().unwrap().is_empty());
    }
}
