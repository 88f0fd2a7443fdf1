//! Health probe trait.

/// Liveness check for a backing service.
///
/// Used only by background health polling; the ticket service never consults
/// health state and stays correct when it is stale.
pub trait HealthProbe: Send + Sync {
    /// Name reported in logs and health responses (e.g. `"database"`).
    fn component(&self) -> &'static str;

    /// Round-trip to the backing service.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure if the service is unreachable.
    fn ping(&self) -> impl std::future::Future<Output = Result<(), String>> + Send;
}
