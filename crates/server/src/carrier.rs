//! Carrier status lookups.
//!
//! The production integration with the carrier API is still pending; the MVP
//! ships with a simulated provider that always reports a pickup-required
//! status. The monitor only sees the trait, so swapping in a real client is
//! a construction-time change.

use crate::error::CarrierError;
use async_trait::async_trait;

#[async_trait]
pub trait CarrierProvider: Send + Sync {
    /// Fetch the current raw status string for a tracking code.
    async fn status(&self, tracking_code: &str) -> Result<String, CarrierError>;
}

/// Simulated carrier used until the real integration lands. Always returns a
/// known exception status so the alert pipeline can be exercised end to end.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimulatedCarrier;

pub const SIMULATED_STATUS: &str = "AGUARDANDO RETIRADA";

#[async_trait]
impl CarrierProvider for SimulatedCarrier {
    async fn status(&self, _tracking_code: &str) -> Result<String, CarrierError> {
        Ok(SIMULATED_STATUS.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_carrier_reports_pickup_required() {
        let status = SimulatedCarrier.status("BR123").await.unwrap();
        assert_eq!(status, "AGUARDANDO RETIRADA");
    }
}
