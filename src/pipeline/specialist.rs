use serde::Serialize;

use crate::config::Config;
use crate::error::AppError;
use crate::llm::{GenerateRequest, LlmClient};

/// The closed set of specialists consulted for every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Cardiologist,
    Psychologist,
    Pulmonologist,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Cardiologist, Role::Psychologist, Role::Pulmonologist];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Cardiologist => "cardiologist",
            Role::Psychologist => "psychologist",
            Role::Pulmonologist => "pulmonologist",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Role::Cardiologist => {
                "You are a cardiologist reviewing a patient's medical report. \
                Focus on the cardiac workup: symptoms, ECG and echo findings, blood \
                pressure, and cardiac history. Identify possible cardiac causes for \
                the patient's presentation and recommend next steps such as further \
                testing or monitoring. Be specific and concise."
            }
            Role::Psychologist => {
                "You are a psychologist reviewing a patient's medical report. \
                Assess the patient for psychological factors such as anxiety, panic \
                disorder, stress, or depression that could explain or contribute to \
                the reported symptoms. Provide a psychological assessment and \
                recommend next steps such as counseling or further evaluation. Be \
                specific and concise."
            }
            Role::Pulmonologist => {
                "You are a pulmonologist reviewing a patient's medical report. \
                Focus on the respiratory findings: breathing difficulties, oxygen \
                saturation, imaging, and pulmonary history. Identify possible \
                respiratory causes for the patient's presentation and recommend next \
                steps such as pulmonary function testing or imaging. Be specific and \
                concise."
            }
        }
    }
}

/// One request per role: the role prompt as the system instruction, the
/// uploaded report as the user message. Errors bubble to the caller untouched.
#[tracing::instrument(
    name = "pipeline_stage specialist",
    skip(llm_client, config, document),
    fields(
        pipeline.stage = "specialist",
        specialist.role = role.as_str(),
        specialist.response_chars,
    )
)]
pub async fn consult(
    llm_client: &LlmClient,
    config: &Config,
    role: Role,
    document: &str,
) -> Result<String, AppError> {
    let resp = llm_client
        .generate(&GenerateRequest {
            model: config.llm_model.clone(),
            system: role.system_prompt().to_string(),
            prompt: format!("Medical Report:\n{document}"),
            temperature: config.default_temperature as f32,
            max_tokens: config.default_max_tokens,
            stage: role.as_str().to_string(),
        })
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    let span = tracing::Span::current();
    span.record("specialist.response_chars", resp.content.chars().count());

    Ok(resp.content)
}
