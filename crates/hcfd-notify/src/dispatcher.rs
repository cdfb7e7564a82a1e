//! Subscriber fan-out with per-recipient failure isolation

use hcfd_core::MessageGateway;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// One (fragment, recipient) send that did not go through
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryFailure {
    pub fragment_index: usize,
    pub recipient: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl DispatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    fn record(&mut self, fragment_index: usize, recipient: &str, result: Result<(), String>) {
        self.attempted += 1;
        match result {
            Ok(()) => self.delivered += 1,
            Err(error) => self.failures.push(DeliveryFailure {
                fragment_index,
                recipient: recipient.to_string(),
                error,
            }),
        }
    }
}

/// Sends every fragment to every recipient through the gateway
#[derive(Clone)]
pub struct Dispatcher {
    gateway: Arc<dyn MessageGateway>,
    concurrency: usize,
}

impl Dispatcher {
    /// `concurrency` bounds in-flight sends per fragment; 1 sends sequentially
    pub fn new(gateway: Arc<dyn MessageGateway>, concurrency: usize) -> Self {
        Self {
            gateway,
            concurrency: concurrency.max(1),
        }
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    /// Fragments go out in order; a failed send never stops the others
    pub async fn dispatch(&self, fragments: &[String], recipients: &[String]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (index, fragment) in fragments.iter().enumerate() {
            if self.concurrency == 1 {
                for recipient in recipients {
                    let result = self.send(index, fragment, recipient).await;
                    report.record(index, recipient, result);
                }
            } else {
                self.fan_out(index, fragment, recipients, &mut report).await;
            }
        }

        info!(
            gateway = self.gateway.name(),
            fragments = fragments.len(),
            recipients = recipients.len(),
            delivered = report.delivered,
            failed = report.failed(),
            "Dispatch finished"
        );
        report
    }

    async fn send(&self, index: usize, fragment: &str, recipient: &str) -> Result<(), String> {
        send_logged(self.gateway.as_ref(), index, fragment, recipient).await
    }

    async fn fan_out(
        &self,
        index: usize,
        fragment: &str,
        recipients: &[String],
        report: &mut DispatchReport,
    ) {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let fragment: Arc<str> = Arc::from(fragment);
        let mut tasks = JoinSet::new();

        for recipient in recipients {
            let gateway = Arc::clone(&self.gateway);
            let permits = Arc::clone(&permits);
            let fragment = Arc::clone(&fragment);
            let recipient = recipient.clone();
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => send_logged(gateway.as_ref(), index, &fragment, &recipient).await,
                    Err(e) => Err(e.to_string()),
                };
                (recipient, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((recipient, result)) => report.record(index, &recipient, result),
                Err(e) => {
                    warn!(fragment = index, error = %e, "Send task aborted");
                    report.record(index, "<unknown>", Err(e.to_string()));
                }
            }
        }
    }
}

async fn send_logged(
    gateway: &dyn MessageGateway,
    index: usize,
    fragment: &str,
    recipient: &str,
) -> Result<(), String> {
    match gateway.send_text(recipient, fragment).await {
        Ok(()) => {
            debug!(%recipient, fragment = index, "Delivered alert");
            Ok(())
        }
        Err(e) => {
            warn!(
                %recipient,
                fragment = index,
                headline = fragment.lines().next().unwrap_or_default(),
                error = %e,
                "Failed to deliver alert"
            );
            Err(e.to_string())
        }
    }
}
