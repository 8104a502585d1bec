//! Codepane assistant providers
//!
//! Provider profiles, their layered configuration, and a code generation adapter that
//! speaks both OpenAI-style and Anthropic-style backends through one contract.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use codepane_providers::{AssistantSession, CodeGenAdapter, ConfigurationManager};
//!
//! # async fn run() -> Result<(), codepane_providers::ProviderError> {
//! let mut config = ConfigurationManager::new();
//! config.load_with_precedence()?;
//! config.validate()?;
//!
//! let session = AssistantSession::new(config.build_registry(), CodeGenAdapter::default());
//! let generation = session.generate("Draw a spiral on the canvas").await?;
//! println!("{}", generation.code);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod providers;
pub mod redaction;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use adapter::{extract_code_snippet, join_url, CodeGenAdapter, GenerationRequest};
pub use config::{AssistantConfig, ConfigurationManager};
pub use error::ProviderError;
pub use models::{
    InsertMode, ProfileField, ProfileOverrides, ProviderProfile, WireFormat, DEFAULT_MAX_TOKENS,
    DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE,
};
pub use provider::{PersistedState, ProviderRegistry, StoredProfile};
pub use providers::{parse_response, Extraction, WireBody};
pub use redaction::{redact, redact_headers};
pub use session::{AssistantSession, Generation};
pub use transport::{HttpTransport, ReqwestTransport, TransportError, TransportResponse};
