//! Outbound messaging: gateways and subscriber fan-out

pub mod dispatcher;
pub mod line;

pub use dispatcher::*;
pub use line::*;

use hcfd_core::{DeliveryResult, MessageGateway};
use tracing::info;

/// Gateway that only logs messages, for dry runs
#[derive(Debug, Default)]
pub struct LogGateway;

#[async_trait::async_trait]
impl MessageGateway for LogGateway {
    fn name(&self) -> &str {
        "log"
    }

    async fn send_text(&self, recipient: &str, text: &str) -> DeliveryResult<()> {
        info!(%recipient, "Dry-run message:\n{}", text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_gateway_accepts_everything() {
        let gateway = LogGateway;
        assert_eq!(gateway.name(), "log");
        assert!(gateway.send_text("U1", "【新竹市】豪雨特報\n").await.is_ok());
    }
}
