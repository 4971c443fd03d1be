use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy)]
pub struct PriceEntry {
    /// USD per million input tokens.
    pub input: f64,
    /// USD per million output tokens.
    pub output: f64,
}

// Groq list prices. Unknown models cost $0.00 rather than failing the call.
pub static PRICING: LazyLock<HashMap<&'static str, PriceEntry>> = LazyLock::new(|| {
    HashMap::from([
        (
            "llama-3.3-70b-versatile",
            PriceEntry {
                input: 0.59,
                output: 0.79,
            },
        ),
        (
            "llama-3.1-8b-instant",
            PriceEntry {
                input: 0.05,
                output: 0.08,
            },
        ),
        (
            "openai/gpt-oss-120b",
            PriceEntry {
                input: 0.15,
                output: 0.60,
            },
        ),
    ])
});

pub fn calculate_cost(model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
    match PRICING.get(model) {
        Some(entry) => {
            (f64::from(input_tokens) * entry.input / 1_000_000.0)
                + (f64::from(output_tokens) * entry.output / 1_000_000.0)
        }
        None => 0.0,
    }
}

pub const PROVIDER_SERVER: &str = "api.groq.com";
pub const PROVIDER_PORT: i64 = 443;
