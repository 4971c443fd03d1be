use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use opentelemetry::trace::TraceContextExt;
use serde::Serialize;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::Config;
use crate::error::AppError;
use crate::llm::LlmClient;
use crate::telemetry::metrics::ANALYSIS_DURATION;

use super::specialist::Role;
use super::{fanout, report, synthesize};

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub report: String,
    pub roles_consulted: Vec<&'static str>,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
    pub trace_id: String,
}

/// Full analysis of one uploaded document: fan the document out to every
/// specialist, synthesize their joined results, then format, sanitize, and
/// persist the final report. Nothing is written when any stage fails.
#[tracing::instrument(
    name = "pipeline analysis",
    skip(llm_client, config, document),
    fields(
        analysis.document_bytes = document.len(),
        analysis.duration_ms,
    )
)]
pub async fn run_analysis(
    llm_client: &Arc<LlmClient>,
    config: &Config,
    document: &str,
) -> Result<Analysis, AppError> {
    let start = std::time::Instant::now();

    let span = tracing::Span::current();
    let context = span.context();
    let otel_span = context.span();
    let trace_id = otel_span.span_context().trace_id().to_string();

    // Stage 1: consult all specialists concurrently
    let results = fanout::consult_all(llm_client, config, document).await?;

    // Stage 2: reconcile the complete result set into one diagnosis
    let diagnosis = synthesize::synthesize(llm_client, config, &results).await?;

    // Stage 3: format and persist
    let final_report = report::sanitize(&report::format_final(&diagnosis));
    report::write_report(Path::new(&config.result_path), &final_report).await?;

    let duration = start.elapsed();
    ANALYSIS_DURATION.record(duration.as_secs_f64(), &[]);
    span.record("analysis.duration_ms", duration.as_millis() as u64);

    Ok(Analysis {
        report: final_report,
        roles_consulted: Role::ALL.iter().map(|r| r.as_str()).collect(),
        duration_ms: duration.as_millis() as u64,
        completed_at: Utc::now(),
        trace_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerateRequest, GenerateResponse, Provider};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers each role with a fixed string and counts synthesizer calls.
    struct ScriptedProvider {
        fail_stage: Option<&'static str>,
        synth_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Provider for ScriptedProvider {
        async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            if self.fail_stage == Some(req.stage.as_str()) {
                anyhow::bail!("backend unavailable for {}", req.stage);
            }
            let content = match req.stage.as_str() {
                "cardiologist" => "Cardio: OK",
                "psychologist" => "Psych: OK",
                "pulmonologist" => "Pulmo: OK",
                "synthesize" => {
                    self.synth_calls.fetch_add(1, Ordering::SeqCst);
                    "Combined: stable"
                }
                other => anyhow::bail!("unexpected stage {other}"),
            };
            Ok(GenerateResponse {
                content: content.to_string(),
                model: req.model.clone(),
                input_tokens: 1,
                output_tokens: 1,
                cost_usd: 0.0,
                finish_reason: "stop".to_string(),
                provider: String::new(),
            })
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn test_config(result_name: &str) -> Config {
        let result_path = std::env::temp_dir()
            .join(format!("mediscan-{}-{}", std::process::id(), result_name))
            .to_string_lossy()
            .into_owned();
        Config {
            port: 0,
            environment: "test".to_string(),
            groq_api_key: "gsk_test".to_string(),
            llm_model: "stub-model".to_string(),
            upload_dir: "uploads".to_string(),
            result_path,
            otel_service_name: "mediscan".to_string(),
            otel_exporter_endpoint: "http://localhost:4317".to_string(),
            default_temperature: 0.3,
            default_max_tokens: 256,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_persists_and_returns_final_report() {
        let provider = Arc::new(ScriptedProvider {
            fail_stage: None,
            synth_calls: AtomicUsize::new(0),
        });
        let client = Arc::new(LlmClient::new(provider.clone()));
        let config = test_config("e2e.txt");

        let document = "Patient reports mild chest pain and shortness of breath.";
        let analysis = run_analysis(&client, &config, document).await.unwrap();

        let expected = "### 🧾 Final Diagnosis\n\nCombined: stable";
        assert_eq!(analysis.report, expected);
        assert_eq!(
            analysis.roles_consulted,
            vec!["cardiologist", "psychologist", "pulmonologist"]
        );

        let persisted = tokio::fs::read_to_string(&config.result_path).await.unwrap();
        assert_eq!(persisted, expected);

        assert_eq!(provider.synth_calls.load(Ordering::SeqCst), 1);
        tokio::fs::remove_file(&config.result_path).await.unwrap();
    }

    #[tokio::test]
    async fn test_specialist_failure_skips_synthesizer_and_persists_nothing() {
        let provider = Arc::new(ScriptedProvider {
            fail_stage: Some("pulmonologist"),
            synth_calls: AtomicUsize::new(0),
        });
        let client = Arc::new(LlmClient::new(provider.clone()));
        let config = test_config("failed.txt");

        let err = run_analysis(&client, &config, "report text")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));

        assert_eq!(
            provider.synth_calls.load(Ordering::SeqCst),
            0,
            "synthesizer must not run on a failed fan-out"
        );
        assert!(!Path::new(&config.result_path).exists());
    }

    #[tokio::test]
    async fn test_synthesizer_failure_persists_nothing() {
        let provider = Arc::new(ScriptedProvider {
            fail_stage: Some("synthesize"),
            synth_calls: AtomicUsize::new(0),
        });
        let client = Arc::new(LlmClient::new(provider));
        let config = test_config("synth-failed.txt");

        let err = run_analysis(&client, &config, "report text")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
        assert!(!Path::new(&config.result_path).exists());
    }
}
