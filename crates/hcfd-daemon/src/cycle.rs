//! Single poll cycle: fetch, evaluate, dedup-check, dispatch, record

use hcfd_config::DedupFailurePolicy;
use hcfd_core::{
    ChangeToken, Clock, Evaluation, FeedSource, FetchError, ParseError, SetStore, StoreConnector,
    StoreError, StoreResult, TelemetryClient,
};
use hcfd_feed::{HazardEvaluator, RainfallEvaluator};
use hcfd_notify::{DispatchReport, Dispatcher};
use hcfd_store::{DedupStore, SubscriberRegistry};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Failures that abandon one source for the current cycle
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse failed: {0}")]
    Parse(#[from] ParseError),
}

/// What happened to one feed source during a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    FetchFailed(String),
    ParseFailed(String),
    /// Empty token; nothing relevant in the document
    NothingObserved,
    StoreUnavailable(String),
    AlreadySeen {
        token: ChangeToken,
    },
    /// Seen-check failed under the fail-closed policy
    Suppressed {
        token: ChangeToken,
    },
    /// Subscriber read failed; token left unrecorded for a retry
    SubscribersUnavailable {
        token: ChangeToken,
    },
    Dispatched {
        token: ChangeToken,
        report: DispatchReport,
        recorded: bool,
    },
}

impl SourceOutcome {
    pub fn dispatched(&self) -> Option<&DispatchReport> {
        match self {
            SourceOutcome::Dispatched { report, .. } => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub rainfall: SourceOutcome,
    pub hazard: SourceOutcome,
}

impl CycleReport {
    pub fn outcome(&self, source: FeedSource) -> &SourceOutcome {
        match source {
            FeedSource::Rainfall => &self.rainfall,
            FeedSource::Hazard => &self.hazard,
        }
    }
}

/// Everything one poll cycle needs, injected
pub struct PollCycle {
    telemetry: Arc<dyn TelemetryClient>,
    store: Arc<dyn StoreConnector>,
    dispatcher: Dispatcher,
    rainfall: RainfallEvaluator,
    hazard: HazardEvaluator,
    clock: Arc<dyn Clock>,
    policy: DedupFailurePolicy,
}

impl PollCycle {
    pub fn new(
        telemetry: Arc<dyn TelemetryClient>,
        store: Arc<dyn StoreConnector>,
        dispatcher: Dispatcher,
        rainfall: RainfallEvaluator,
        hazard: HazardEvaluator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            telemetry,
            store,
            dispatcher,
            rainfall,
            hazard,
            clock,
            policy: DedupFailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DedupFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run both sources once; the store session is dropped before returning
    pub async fn run_once(&self) -> CycleReport {
        info!("=== Poll cycle start ===");
        let mut session = None;

        let rainfall = self.run_source(FeedSource::Rainfall, &mut session).await;
        let hazard = self.run_source(FeedSource::Hazard, &mut session).await;
        drop(session);

        info!(rainfall = ?rainfall, hazard = ?hazard, "=== Poll cycle end ===");
        CycleReport { rainfall, hazard }
    }

    /// Fetch and evaluate one source without touching the store
    #[instrument(skip(self))]
    pub async fn evaluate(&self, source: FeedSource) -> Result<Evaluation, SourceError> {
        let bytes = self.telemetry.fetch(source).await?;
        let evaluation = match source {
            FeedSource::Rainfall => self.rainfall.evaluate(&bytes)?,
            FeedSource::Hazard => self.hazard.evaluate(&bytes, self.clock.now())?,
        };
        debug!(
            fragments = evaluation.fragments.len(),
            token = %evaluation.token,
            "Evaluated feed"
        );
        Ok(evaluation)
    }

    async fn run_source(
        &self,
        source: FeedSource,
        session: &mut Option<Box<dyn SetStore>>,
    ) -> SourceOutcome {
        let Evaluation { fragments, token } = match self.evaluate(source).await {
            Ok(evaluation) => evaluation,
            Err(SourceError::Fetch(e)) => {
                error!(%source, error = %e, "Feed fetch failed");
                return SourceOutcome::FetchFailed(e.to_string());
            }
            Err(SourceError::Parse(e)) => {
                error!(%source, error = %e, "Feed document rejected");
                return SourceOutcome::ParseFailed(e.to_string());
            }
        };

        if token.is_empty() {
            debug!(%source, "Nothing observed");
            return SourceOutcome::NothingObserved;
        }

        let store = match self.session(session).await {
            Ok(store) => store,
            Err(e) => {
                error!(%source, error = %e, "Store session unavailable");
                return SourceOutcome::StoreUnavailable(e.to_string());
            }
        };
        let dedup = DedupStore::new(store);

        let seen = match dedup.seen(source, &token).await {
            Ok(seen) => seen,
            Err(e) => match self.policy {
                DedupFailurePolicy::FailOpen => {
                    warn!(%source, %token, error = %e, "Seen-check failed, treating token as new");
                    false
                }
                DedupFailurePolicy::FailClosed => {
                    warn!(%source, %token, error = %e, "Seen-check failed, suppressing dispatch");
                    return SourceOutcome::Suppressed { token };
                }
            },
        };
        if seen {
            info!(%source, %token, "Already processed");
            return SourceOutcome::AlreadySeen { token };
        }

        let report = if fragments.is_empty() {
            DispatchReport::default()
        } else {
            match SubscriberRegistry::new(store).all().await {
                Ok(recipients) => self.dispatcher.dispatch(&fragments, &recipients).await,
                Err(e) => {
                    error!(%source, %token, error = %e, "Subscriber read failed");
                    return SourceOutcome::SubscribersUnavailable { token };
                }
            }
        };

        let recorded = match dedup.mark_seen(source, &token).await {
            Ok(()) => true,
            Err(e) => {
                error!(%source, %token, error = %e, "Token write failed, alert may repeat");
                false
            }
        };

        info!(
            %source,
            %token,
            gateway = self.dispatcher.gateway_name(),
            fragments = fragments.len(),
            delivered = report.delivered,
            failed = report.failed(),
            "New feed content processed"
        );
        SourceOutcome::Dispatched {
            token,
            report,
            recorded,
        }
    }

    /// Open the cycle's store session on first use
    async fn session<'s>(
        &self,
        slot: &'s mut Option<Box<dyn SetStore>>,
    ) -> StoreResult<&'s dyn SetStore> {
        if slot.is_none() {
            *slot = Some(self.store.open().await?);
        }
        let slot: &'s Option<Box<dyn SetStore>> = slot;
        slot.as_deref()
            .ok_or_else(|| StoreError::Unavailable("session not opened".to_string()))
    }
}
