//! Version information for lotkeeper.

/// Lotkeeper version from Cargo.toml
pub const LOTKEEPER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version information for the running server.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VersionInfo {
    pub lotkeeper: &'static str,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            lotkeeper: LOTKEEPER_VERSION,
        }
    }
}

impl VersionInfo {
    pub fn new() -> Self {
        Self::default()
    }
}
