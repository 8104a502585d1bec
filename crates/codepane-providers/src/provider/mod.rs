//! Provider registry and persisted state

pub mod registry;
pub mod snapshot;

pub use registry::ProviderRegistry;
pub use snapshot::{PersistedState, StoredProfile};
