//! Retrieval settings shared by the builder, the expander and the evaluation harness.

use kgqa_core::error::{KgError, Result};
use kgqa_core::sanitize::SanitizePolicy;
use serde::{Deserialize, Serialize};

/// How graph construction and context expansion behave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// First radius examined around the anchor.
    #[serde(default = "default_start_radius")]
    pub start_radius: usize,
    /// Hard ceiling on the radius. `None` leaves stall detection as the only bound.
    #[serde(default)]
    pub max_radius: Option<usize>,
    /// Treatment of apostrophes inside generated string literals.
    #[serde(default)]
    pub sanitize: SanitizePolicy,
    /// Translate the corpus to English before extraction.
    #[serde(default)]
    pub translate: bool,
    /// Questions evaluated at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_start_radius() -> usize {
    1
}

fn default_concurrency() -> usize {
    4
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            start_radius: default_start_radius(),
            max_radius: None,
            sanitize: SanitizePolicy::default(),
            translate: false,
            concurrency: default_concurrency(),
        }
    }
}

impl RetrievalConfig {
    pub fn with_start_radius(mut self, radius: usize) -> Self {
        self.start_radius = radius;
        self
    }

    pub fn with_max_radius(mut self, radius: usize) -> Self {
        self.max_radius = Some(radius);
        self
    }

    pub fn with_sanitize(mut self, policy: SanitizePolicy) -> Self {
        self.sanitize = policy;
        self
    }

    pub fn with_translation(mut self, translate: bool) -> Self {
        self.translate = translate;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Reject settings the expansion loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.start_radius == 0 {
            return Err(KgError::invalid_config(
                "retrieval.start_radius",
                "0",
                "radius starts at 1",
            ));
        }
        if let Some(max) = self.max_radius {
            if max < self.start_radius {
                return Err(KgError::invalid_config(
                    "retrieval.max_radius",
                    max.to_string(),
                    format!("must be at least start_radius ({})", self.start_radius),
                ));
            }
        }
        if self.concurrency == 0 {
            return Err(KgError::invalid_config(
                "retrieval.concurrency",
                "0",
                "at least one question must run at a time",
            ));
        }
        Ok(())
    }
}
