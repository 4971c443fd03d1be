use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::config::Config;
use crate::error::AppError;
use crate::llm::LlmClient;

use super::specialist::{self, Role};

/// Consults every specialist concurrently against the same document and joins
/// the results into a role-keyed map.
///
/// Fail-fast: the first specialist error aborts the whole fan-out and partial
/// results are discarded (dropping the `JoinSet` aborts the remaining tasks).
/// On success the map contains exactly the roles in [`Role::ALL`].
#[tracing::instrument(
    name = "pipeline_stage fanout",
    skip(llm_client, config, document),
    fields(
        pipeline.stage = "fanout",
        fanout.specialists = Role::ALL.len(),
    )
)]
pub async fn consult_all(
    llm_client: &Arc<LlmClient>,
    config: &Config,
    document: &str,
) -> Result<HashMap<Role, String>, AppError> {
    let document: Arc<str> = Arc::from(document);

    let mut tasks = JoinSet::new();
    for role in Role::ALL {
        let client = Arc::clone(llm_client);
        let config = config.clone();
        let document = Arc::clone(&document);
        tasks.spawn(async move {
            let text = specialist::consult(&client, &config, role, &document).await?;
            Ok::<(Role, String), AppError>((role, text))
        });
    }

    // Results land keyed by role as tasks finish, so completion order is
    // irrelevant.
    let mut results = HashMap::with_capacity(Role::ALL.len());
    while let Some(joined) = tasks.join_next().await {
        let (role, text) =
            joined.map_err(|e| AppError::Pipeline(format!("specialist task failed: {e}")))??;
        results.insert(role, text);
    }

    if results.len() != Role::ALL.len() {
        return Err(AppError::Pipeline(format!(
            "expected {} specialist results, got {}",
            Role::ALL.len(),
            results.len()
        )));
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GenerateRequest, GenerateResponse, Provider};
    use std::time::Duration;

    struct DelayedProvider {
        delays_ms: HashMap<&'static str, u64>,
        fail_stage: Option<&'static str>,
    }

    #[async_trait::async_trait]
    impl Provider for DelayedProvider {
        async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            if let Some(delay) = self.delays_ms.get(req.stage.as_str()) {
                tokio::time::sleep(Duration::from_millis(*delay)).await;
            }
            if self.fail_stage == Some(req.stage.as_str()) {
                anyhow::bail!("backend unavailable for {}", req.stage);
            }
            Ok(GenerateResponse {
                content: format!("{} findings", req.stage),
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

    fn client_with(provider: DelayedProvider) -> Arc<LlmClient> {
        Arc::new(LlmClient::new(Arc::new(provider)))
    }

    #[tokio::test]
    async fn test_result_set_has_all_roles_regardless_of_completion_order() {
        // Two runs with opposite delay orderings must produce the same key set.
        let orderings: [HashMap<&'static str, u64>; 2] = [
            HashMap::from([("cardiologist", 30), ("psychologist", 5), ("pulmonologist", 15)]),
            HashMap::from([("cardiologist", 5), ("psychologist", 30), ("pulmonologist", 1)]),
        ];

        for delays_ms in orderings {
            let client = client_with(DelayedProvider {
                delays_ms,
                fail_stage: None,
            });
            let results = consult_all(&client, &test_config(), "chest pain")
                .await
                .unwrap();

            assert_eq!(results.len(), 3);
            for role in Role::ALL {
                assert_eq!(
                    results.get(&role).unwrap(),
                    &format!("{} findings", role.as_str())
                );
            }
        }
    }

    #[tokio::test]
    async fn test_single_failure_aborts_fanout() {
        let client = client_with(DelayedProvider {
            delays_ms: HashMap::from([("cardiologist", 20), ("pulmonologist", 20)]),
            fail_stage: Some("psychologist"),
        });

        let err = consult_all(&client, &test_config(), "chest pain")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
        assert!(err.to_string().contains("psychologist"));
    }

    #[tokio::test]
    async fn test_same_document_reaches_every_specialist() {
        struct CapturingProvider {
            prompts: std::sync::Mutex<Vec<String>>,
        }

        #[async_trait::async_trait]
        impl Provider for CapturingProvider {
            async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
                self.prompts.lock().unwrap().push(req.prompt.clone());
                Ok(GenerateResponse {
                    content: "ok".to_string(),
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

        let provider = Arc::new(CapturingProvider {
            prompts: std::sync::Mutex::new(Vec::new()),
        });
        let client = Arc::new(LlmClient::new(provider.clone()));

        consult_all(&client, &test_config(), "unique document text")
            .await
            .unwrap();

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        for prompt in prompts.iter() {
            assert!(prompt.contains("unique document text"));
        }
    }
}
