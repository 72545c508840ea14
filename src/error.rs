use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `snapward`.
///
/// Only cycle-fatal failures live here. A delete that fails for one snapshot
/// is data on the run outcome, not an error, so sibling deletions and the
/// cycle itself keep going.
#[derive(Debug, Error)]
pub enum BackupError {
    // ── Config / policy validation ───────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Snapshot creation (aborts the cycle; pruning never runs) ─────────
    #[error("snapshot create failed: {0}")]
    Create(#[source] ServiceError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("API token not set; pass --token or export DIGITALOCEAN_TOKEN")]
    MissingToken,
}

// ─── Remote service errors ───────────────────────────────────────────────────

/// Failures talking to the snapshot service. `Api` carries the status and the
/// service's own message so operators see what the provider saw.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, BackupError>;
