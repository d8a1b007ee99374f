//! Service-account token provider for authenticated backend calls.
//!
//! Prometheus and Cryostat sit behind the cluster's auth proxy, so every
//! query carries the pod's service-account token as a bearer header. The
//! token is read from the standard mount path once and cached for the
//! lifetime of the process; running outside a cluster degrades to an
//! empty token so local use keeps working against unauthenticated
//! backends.

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::{info, warn};

/// Standard path where Kubernetes mounts the service-account token.
const TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Once-initialized bearer token handle.
///
/// The first read wins and is never re-fetched; concurrent readers all
/// observe the same value.
#[derive(Debug)]
pub struct TokenProvider {
    path: PathBuf,
    cached: OnceLock<String>,
}

impl TokenProvider {
    /// Create a provider reading from the standard in-cluster mount path.
    #[must_use]
    pub fn new() -> Self {
        Self::with_path(TOKEN_PATH)
    }

    /// Create a provider reading from a custom path.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: OnceLock::new(),
        }
    }

    /// The token in `Bearer <token>` form, or an empty string when the
    /// token file cannot be read.
    pub fn bearer(&self) -> &str {
        self.cached.get_or_init(|| match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                info!("Service account token loaded");
                format!("Bearer {}", raw.trim())
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Service account token not readable, using empty token"
                );
                String::new()
            }
        })
    }
}

impl Default for TokenProvider {
    fn default() -> Self {
        Self::new()
    }
}
