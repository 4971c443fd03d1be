use std::collections::HashMap;

use crate::config::Config;
use crate::error::AppError;
use crate::llm::{GenerateRequest, LlmClient};

use super::specialist::Role;

const SYNTH_SYSTEM: &str =
    "You are a multidisciplinary team of physicians reconciling independent \
    specialist assessments of one patient. Integrate the three perspectives into \
    a single coherent diagnosis: identify agreements and conflicts, the most \
    likely health issues, and concrete recommended next steps. Respond in \
    Markdown.";

/// One request that reconciles the three specialist texts into a single
/// diagnosis. Requires a complete result set; a missing role is a pipeline bug
/// and is rejected before any network call.
#[tracing::instrument(
    name = "pipeline_stage synthesize",
    skip(llm_client, config, results),
    fields(
        pipeline.stage = "synthesize",
        synthesize.response_chars,
    )
)]
pub async fn synthesize(
    llm_client: &LlmClient,
    config: &Config,
    results: &HashMap<Role, String>,
) -> Result<String, AppError> {
    let mut sections = Vec::with_capacity(Role::ALL.len());
    for role in Role::ALL {
        let text = results.get(&role).ok_or_else(|| {
            AppError::Pipeline(format!("missing {} result before synthesis", role.as_str()))
        })?;
        sections.push(format!("## {} report\n{text}", capitalize(role.as_str())));
    }

    let prompt = format!(
        "Independent specialist assessments of the same patient:\n\n{}\n\n\
        Provide the team's integrated final diagnosis.",
        sections.join("\n\n")
    );

    let resp = llm_client
        .generate(&GenerateRequest {
            model: config.llm_model.clone(),
            system: SYNTH_SYSTEM.to_string(),
            prompt,
            temperature: config.default_temperature as f32,
            max_tokens: config.default_max_tokens,
            stage: "synthesize".to_string(),
        })
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    let span = tracing::Span::current();
    span.record("synthesize.response_chars", resp.content.chars().count());

    Ok(resp.content)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerateResponse, Provider};
    use std::sync::{Arc, Mutex};

    struct CapturingProvider {
        requests: Mutex<Vec<GenerateRequest>>,
    }

    #[async_trait::async_trait]
    impl Provider for CapturingProvider {
        async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            self.requests.lock().unwrap().push(req.clone());
            Ok(GenerateResponse {
                content: "integrated diagnosis".to_string(),
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

    fn test_config() -> Config {
        Config {
            port: 0,
            environment: "test".to_string(),
            groq_api_key: "gsk_test".to_string(),
            llm_model: "stub-model".to_string(),
            upload_dir: "uploads".to_string(),
            result_path: "results/final_diagnosis.txt".to_string(),
            otel_service_name: "mediscan".to_string(),
            otel_exporter_endpoint: "http://localhost:4317".to_string(),
            default_temperature: 0.3,
            default_max_tokens: 256,
        }
    }

    fn complete_results() -> HashMap<Role, String> {
        HashMap::from([
            (Role::Cardiologist, "cardiac findings".to_string()),
            (Role::Psychologist, "psychological findings".to_string()),
            (Role::Pulmonologist, "respiratory findings".to_string()),
        ])
    }

    #[tokio::test]
    async fn test_prompt_includes_all_three_reports_once() {
        let provider = Arc::new(CapturingProvider {
            requests: Mutex::new(Vec::new()),
        });
        let client = LlmClient::new(provider.clone());

        let out = synthesize(&client, &test_config(), &complete_results())
            .await
            .unwrap();
        assert_eq!(out, "integrated diagnosis");

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1, "exactly one synthesizer call");

        let prompt = &requests[0].prompt;
        for text in [
            "cardiac findings",
            "psychological findings",
            "respiratory findings",
        ] {
            assert_eq!(prompt.matches(text).count(), 1, "{text} appears once");
        }
    }

    #[tokio::test]
    async fn test_incomplete_result_set_is_rejected_before_any_call() {
        let provider = Arc::new(CapturingProvider {
            requests: Mutex::new(Vec::new()),
        });
        let client = LlmClient::new(provider.clone());

        let mut results = complete_results();
        results.remove(&Role::Psychologist);

        let err = synthesize(&client, &test_config(), &results)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Pipeline(_)));
        assert!(provider.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("cardiologist"), "Cardiologist");
        assert_eq!(capitalize(""), "");
    }
}
