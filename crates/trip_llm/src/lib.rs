pub mod protocol;
pub mod provider;
pub mod providers;

pub use provider::{GenerationClient, LLMError, Result};
pub use providers::GeminiProvider;
