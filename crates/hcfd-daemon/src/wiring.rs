//! Builds production dependencies from configuration

use anyhow::{Context, Result};
use hcfd_config::{AppConfig, FeedConfig, GatewayConfig, GatewayKind, StoreConfig, StoreKind};
use hcfd_core::{Clock, MessageGateway, StoreConnector, TelemetryClient};
use hcfd_feed::{CwbClient, FeedEndpoint, HazardEvaluator, RainThresholds, RainfallEvaluator};
use hcfd_notify::{Dispatcher, LineGateway, LogGateway};
use hcfd_store::{DbClient, MemoryStore, PoolSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cycle::PollCycle;

pub fn build_telemetry(config: &FeedConfig) -> Result<Arc<dyn TelemetryClient>> {
    let auth_key = config
        .auth_key
        .clone()
        .context("feed.auth_key (CWB_AUTH_KEY) not set")?;
    let client = CwbClient::new(FeedEndpoint {
        base_url: config.base_url.clone(),
        rainfall_dataset: config.rainfall_dataset.clone(),
        hazard_dataset: config.hazard_dataset.clone(),
        auth_key,
        timeout: Duration::from_secs(config.timeout_secs),
    })
    .context("Failed to build feed client")?;
    Ok(Arc::new(client))
}

pub async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn StoreConnector>> {
    match config.kind {
        StoreKind::Mysql => {
            let url = config
                .url
                .as_deref()
                .context("store.url (DATABASE_URL) not set")?;
            let settings = PoolSettings {
                max_connections: config.max_connections,
                acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
            };
            let db = DbClient::connect(url, settings)
                .await
                .context("Failed to connect to database")?;
            db.ping().await.context("Database ping failed")?;
            db.ensure_schema()
                .await
                .context("Failed to prepare set storage")?;
            info!("Connected to database");
            Ok(Arc::new(db))
        }
        StoreKind::Memory => {
            warn!("Using in-memory store; subscribers and tokens are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub fn build_gateway(config: &GatewayConfig) -> Result<Arc<dyn MessageGateway>> {
    match config.kind {
        GatewayKind::Line => {
            let token = config
                .channel_token
                .clone()
                .context("gateway.channel_token (LINE_CHANNEL_TOKEN) not set")?;
            let gateway = LineGateway::new(
                config.endpoint.clone(),
                token,
                Duration::from_secs(config.timeout_secs),
            )
            .context("Failed to build LINE gateway")?;
            Ok(Arc::new(gateway))
        }
        GatewayKind::Log => Ok(Arc::new(LogGateway)),
    }
}

/// Assemble a poll cycle from configuration and injected collaborators
pub fn build_cycle(
    config: &AppConfig,
    telemetry: Arc<dyn TelemetryClient>,
    store: Arc<dyn StoreConnector>,
    gateway: Arc<dyn MessageGateway>,
    clock: Arc<dyn Clock>,
) -> Result<PollCycle> {
    let tz = config.timezone().context("Invalid time zone")?;
    let rainfall = RainfallEvaluator::new(
        config.rainfall.targets.clone(),
        RainThresholds {
            ten_minute_mm: config.rainfall.ten_minute_mm,
            hourly_mm: config.rainfall.hourly_mm,
        },
        tz,
    );
    let hazard = HazardEvaluator::new(config.hazard.targets.clone(), tz);
    let dispatcher = Dispatcher::new(gateway, config.gateway.dispatch_concurrency);

    Ok(
        PollCycle::new(telemetry, store, dispatcher, rainfall, hazard, clock)
            .with_policy(config.poll.dedup_failure_policy),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_selection() {
        let mut config = GatewayConfig::default();
        assert!(build_gateway(&config).is_err());

        config.channel_token = Some("line-token".to_string());
        assert_eq!(build_gateway(&config).unwrap().name(), "line");

        config.kind = GatewayKind::Log;
        config.channel_token = None;
        assert_eq!(build_gateway(&config).unwrap().name(), "log");
    }

    #[test]
    fn test_telemetry_requires_key() {
        let mut config = FeedConfig::default();
        assert!(build_telemetry(&config).is_err());

        config.auth_key = Some("CWB-1234".to_string());
        assert!(build_telemetry(&config).is_ok());
    }

    #[tokio::test]
    async fn test_memory_store_connects() {
        let config = StoreConfig {
            kind: StoreKind::Memory,
            ..Default::default()
        };
        let store = connect_store(&config).await.unwrap();
        let session = store.open().await.unwrap();
        assert_eq!(session.count("user").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mysql_store_requires_url() {
        let config = StoreConfig::default();
        assert!(connect_store(&config).await.is_err());
    }
}
