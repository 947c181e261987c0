//! Text generation for the itinerary and deal suggestion features.
//!
//! The rest of the crate talks to a `Generator`, which turns a prompt and a JSON schema into a JSON
//! value that follows the schema. `HttpGenerator` calls an OpenAI-compatible chat completions
//! endpoint. `CannedGenerator` answers from built-in data so that the whole program can be run and
//! tested offline.

mod canned;
mod http;
mod suggest;

pub(crate) use canned::CannedGenerator;
pub(crate) use http::HttpGenerator;
pub use suggest::{DealSuggestion, ItinerarySuggestion};
pub(crate) use suggest::{suggest_deals, suggest_itinerary};

use crate::config::GeneratorSettings;
use crate::error::Res;
use serde_json::Value;
use tracing::debug;

/// The environment variable that switches the program into `Mode::Testing`.
pub const TEST_MODE_VAR: &str = "TRIP_PACT_IN_TEST_MODE";

/// Whether external services are really called.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    /// Use the configured text-generation service.
    #[default]
    Live,
    /// Use canned responses and never touch the network.
    Testing,
}

impl Mode {
    /// `Mode::Testing` when `TRIP_PACT_IN_TEST_MODE` is set to a non-empty value, otherwise
    /// `Mode::Live`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_VAR) {
            Ok(value) if !value.is_empty() => Mode::Testing,
            _ => Mode::Live,
        }
    }
}

/// Produces structured output for a prompt.
#[async_trait::async_trait]
pub(crate) trait Generator: Send + Sync {
    /// Returns a JSON value that is expected, but not guaranteed, to follow `schema`.
    async fn generate(&self, prompt: &str, schema: Value) -> Res<Value>;
}

/// Creates the generator to use for `mode`.
pub(crate) fn generator(settings: &GeneratorSettings, mode: Mode) -> Res<Box<dyn Generator>> {
    match mode {
        Mode::Live => {
            debug!("Using the text generator at {}", settings.endpoint);
            Ok(Box::new(HttpGenerator::new(settings)?))
        }
        Mode::Testing => {
            debug!("Test mode, using canned generator output");
            Ok(Box::new(CannedGenerator))
        }
    }
}

/// The `title` of a root schema, which names the type it was generated from.
fn schema_title(schema: &Value) -> Option<&str> {
    schema.get("title").and_then(Value::as_str)
}
