use crate::types::LandRecord;
use thiserror::Error;

/// A single read against the remote ledger's view of one plot. The
/// gateway implements this for real; tests substitute fakes.
pub trait LandSource: Send + Sync {
    fn land(
        &self,
        id: u64,
    ) -> impl Future<Output = Result<LandRecord, ReadError>> + Send;
}

/// The one write this crate issues itself: asking the ledger to re-derive
/// idle status for cooled-down plots. The transition does not become
/// externally visible on wall-clock passage alone.
pub trait IdleStatusWriter: Send + Sync {
    fn recompute_idle_status(&self) -> impl Future<Output = Result<(), ReadError>> + Send;
}

#[derive(Debug, Error)]
pub enum ReadError {
    /// HTTP 429 equivalent; the scheduler must not retry immediately.
    #[error("rate limited by the remote gateway")]
    RateLimited,
    #[error("land {0} not found")]
    NotFound(u64),
    #[error("gateway responded with {status}: {body}")]
    Gateway { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
}

impl ReadError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ReadError::RateLimited)
    }
}
