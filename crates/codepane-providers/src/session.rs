//! Per-widget assistant session

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::adapter::CodeGenAdapter;
use crate::error::ProviderError;
use crate::models::InsertMode;
use crate::provider::ProviderRegistry;

/// Code produced by one generation request
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub code: String,
    pub provider_id: String,
    pub provider_label: String,
    /// How the host should place `code` into the editor
    pub insert_mode: InsertMode,
}

impl Generation {
    pub fn status_line(&self) -> String {
        format!("Inserted code from {}.", self.provider_label)
    }
}

/// Clears the busy flag when a generation finishes, however it finishes
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A widget's registry and adapter, allowing one outstanding request at a time
#[derive(Debug)]
pub struct AssistantSession {
    registry: Mutex<ProviderRegistry>,
    adapter: CodeGenAdapter,
    busy: AtomicBool,
    status: Mutex<Option<String>>,
}

impl AssistantSession {
    pub fn new(registry: ProviderRegistry, adapter: CodeGenAdapter) -> Self {
        Self {
            registry: Mutex::new(registry),
            adapter,
            busy: AtomicBool::new(false),
            status: Mutex::new(None),
        }
    }

    pub fn with_registry<R>(&self, f: impl FnOnce(&ProviderRegistry) -> R) -> R {
        f(&self.registry.lock())
    }

    pub fn with_registry_mut<R>(&self, f: impl FnOnce(&mut ProviderRegistry) -> R) -> R {
        f(&mut self.registry.lock())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Latest user-facing status text
    pub fn status(&self) -> Option<String> {
        self.status.lock().clone()
    }

    fn set_status(&self, text: impl Into<String>) {
        *self.status.lock() = Some(text.into());
    }

    /// Generate code for `prompt` with the active provider
    ///
    /// The active profile is read once at call start; later registry edits do not affect
    /// an outstanding request. Failures are also recorded as the status line.
    pub async fn generate(&self, prompt: &str) -> Result<Generation, ProviderError> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(ProviderError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let (profile, insert_mode) = {
            let mut registry = self.registry.lock();
            let profile = registry.get_active().cloned();
            (profile, registry.insert_mode())
        };
        let Some(profile) = profile else {
            self.set_status(ProviderError::NoActiveProvider.to_string());
            return Err(ProviderError::NoActiveProvider);
        };

        self.set_status(format!("Generating with {}...", profile.display_name()));
        let outcome = self
            .adapter
            .send(&profile, prompt)
            .await
            .and_then(|code| {
                if code.is_empty() {
                    Err(ProviderError::EmptyResponse)
                } else {
                    Ok(code)
                }
            });

        match outcome {
            Ok(code) => {
                let generation = Generation {
                    code,
                    provider_id: profile.id.clone(),
                    provider_label: profile.display_name().to_string(),
                    insert_mode,
                };
                info!("Generated code with provider '{}'", profile.id);
                self.set_status(generation.status_line());
                Ok(generation)
            }
            Err(err) => {
                warn!("Generation with provider '{}' failed: {}", profile.id, err);
                self.set_status(err.to_string());
                Err(err)
            }
        }
    }
}
