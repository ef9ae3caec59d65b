//! One capture attempt: grab pixels, then extract → translate → analyse.
//!
//! Everything here runs off the UI thread. Every error is folded into an
//! [`AnalysisOutcome`] before it leaves this module.

use crate::analysis::{format_report, AnalysisClient, ServiceError};
use crate::capture::{CaptureError, CaptureService, ScreenRect};
use crate::config::{ConfigError, Credential, API_KEY_VAR};
use std::sync::Arc;
use std::time::Instant;

/// Everything a background task needs. Fixed once built.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    rect: ScreenRect,
    credential: Credential,
}

impl CaptureRequest {
    pub fn new(rect: ScreenRect, credential: Credential) -> Self {
        Self { rect, credential }
    }

    pub fn rect(&self) -> ScreenRect {
        self.rect
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// The terminal result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Success(String),
    Failure(String),
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success(_))
    }

    /// Text for the result window.
    pub fn display_text(&self) -> String {
        match self {
            AnalysisOutcome::Success(text) | AnalysisOutcome::Failure(text) => text.clone(),
        }
    }
}

impl From<PipelineError> for AnalysisOutcome {
    fn from(e: PipelineError) -> Self {
        AnalysisOutcome::Failure(e.display_message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStage {
    Idle,
    Capturing,
    Analyzing,
    Succeeded,
    Failed,
}

/// Messages from the background task to the UI thread.
#[derive(Debug)]
pub enum PipelineEvent {
    Stage(CaptureStage),
    Finished(AnalysisOutcome),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("Erro durante a captura: {0}")]
    Capture(#[from] CaptureError),

    #[error("Não foi possível extrair texto ou a resposta da API não contém texto.")]
    NoText,

    #[error(
        "Ocorreu um erro ao chamar a API Google Generative AI: {0}\n\
         Verifique sua chave de API, sua conexão com a internet e se o modelo está habilitado."
    )]
    Service(ServiceError),

    #[error("A tarefa de análise foi interrompida: {0}")]
    Interrupted(String),
}

impl PipelineError {
    /// Capture and worker failures get the generic prefix. Service and
    /// configuration messages are complete sentences and shown as is.
    pub fn display_message(&self) -> String {
        match self {
            PipelineError::Capture(_) | PipelineError::Interrupted(_) => {
                format!("Ocorreu um erro:\n{}", self)
            }
            _ => self.to_string(),
        }
    }
}

impl From<ServiceError> for PipelineError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NoText => PipelineError::NoText,
            other => PipelineError::Service(other),
        }
    }
}

/// Runs one attempt to completion. Never fails: errors become `Failure`.
///
/// `report` receives stage changes as they happen.
pub async fn run_pipeline<C, A>(
    request: CaptureRequest,
    capture: Arc<C>,
    analysis: Arc<A>,
    report: impl Fn(CaptureStage) + Send,
) -> AnalysisOutcome
where
    C: CaptureService,
    A: AnalysisClient,
{
    let start = Instant::now();
    let rect = request.rect();

    let grabbed = tauri::async_runtime::spawn_blocking(move || capture.capture(rect)).await;
    let image = match grabbed {
        Ok(Ok(image)) => image,
        Ok(Err(e)) => return failure(PipelineError::Capture(e)),
        Err(e) => return failure(PipelineError::Capture(CaptureError::Interrupted(e.to_string()))),
    };

    report(CaptureStage::Analyzing);

    let outcome = match analyze(analysis.as_ref(), request.credential(), &image).await {
        Ok(text) => AnalysisOutcome::Success(text),
        Err(e) => failure(e),
    };

    log::info!(
        "[PIPELINE] Finished in {}ms (success={})",
        start.elapsed().as_millis(),
        outcome.is_success()
    );
    outcome
}

async fn analyze<A: AnalysisClient>(
    analysis: &A,
    credential: &Credential,
    image: &image::DynamicImage,
) -> Result<String, PipelineError> {
    if !credential.is_present() {
        return Err(ConfigError::MissingCredential { var: API_KEY_VAR }.into());
    }

    let original = analysis.extract_text(credential, image).await?;
    log::info!("[PIPELINE] Extracted {} chars", original.len());

    let translation = allow_empty(analysis.translate(credential, &original).await)?;
    let keywords = allow_empty(analysis.extract_keywords(credential, &original).await)?;

    Ok(format_report(&original, &translation, &keywords))
}

/// Only extraction must produce text; a silent translator or analyst
/// leaves its section blank.
fn allow_empty(result: Result<String, ServiceError>) -> Result<String, ServiceError> {
    match result {
        Err(ServiceError::NoText) => Ok(String::new()),
        other => other,
    }
}

fn failure(e: PipelineError) -> AnalysisOutcome {
    log::error!("[PIPELINE] {}", e);
    AnalysisOutcome::from(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_failure_gets_generic_prefix() {
        let e = PipelineError::from(CaptureError::CaptureFailed("permission denied".into()));
        let outcome = AnalysisOutcome::from(e);
        assert_eq!(
            outcome.display_text(),
            "Ocorreu um erro:\nErro durante a captura: Screen capture failed: permission denied"
        );
        let outcome = AnalysisOutcome::Success("ok".to_string());
        assert_eq!(outcome.display_text(), "ok");
    }

    #[test]
    fn service_failure_is_shown_once() {
        let outcome = AnalysisOutcome::from(PipelineError::from(ServiceError::Http(
            "timed out".into(),
        )));
        let text = outcome.display_text();
        assert!(text.starts_with("Ocorreu um erro ao chamar a API Google Generative AI: "));
        assert_eq!(text.matches("Ocorreu um erro").count(), 1);

        let outcome = AnalysisOutcome::from(PipelineError::NoText);
        assert_eq!(
            outcome.display_text(),
            "Não foi possível extrair texto ou a resposta da API não contém texto."
        );
    }

    #[test]
    fn interrupted_task_gets_generic_prefix() {
        let outcome = AnalysisOutcome::from(PipelineError::Interrupted("panicked".into()));
        assert!(outcome.display_text().starts_with("Ocorreu um erro:\n"));
    }

    #[test]
    fn no_text_maps_to_its_own_message() {
        let e = PipelineError::from(ServiceError::NoText);
        assert!(matches!(e, PipelineError::NoText));
        let e = PipelineError::from(ServiceError::Http("timed out".into()));
        assert!(e.to_string().contains("timed out"));
        assert!(e.to_string().starts_with("Ocorreu um erro ao chamar a API"));
    }

    #[test]
    fn capture_error_keeps_cause() {
        let e = PipelineError::from(CaptureError::CaptureFailed("permission denied".into()));
        assert_eq!(
            e.to_string(),
            "Erro durante a captura: Screen capture failed: permission denied"
        );
    }

    #[test]
    fn missing_credential_message_names_variable() {
        let e = PipelineError::from(ConfigError::MissingCredential { var: API_KEY_VAR });
        assert!(e.to_string().contains("'GOOGLE_API_KEY'"));
    }

    #[test]
    fn blank_translation_is_tolerated() {
        assert_eq!(allow_empty(Err(ServiceError::NoText)).unwrap(), "");
        assert!(allow_empty(Err(ServiceError::Http("x".into()))).is_err());
    }
}
