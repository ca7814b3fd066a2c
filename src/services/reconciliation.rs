//! Periodic reconciliation against the backend's REST API. Optimistic
//! operator transitions are applied locally without waiting for the
//! channel, so this refetch is what brings the view back in line with the
//! backend when an emit was lost or a feed event never arrived.

use log::{debug, warn};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};
use crate::models::wire::BackendPayment;
use crate::services::feed_client::ChannelSession;
use crate::services::intake_store::{IntakeCommand, IntakeStore};

pub struct ReconciliationService {
    client: reqwest::Client,
    base_url: String,
    session: ChannelSession,
    store: IntakeStore,
    interval: Duration,
}

impl ReconciliationService {
    pub fn new(
        base_url: String,
        session: ChannelSession,
        store: IntakeStore,
        interval: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            session,
            store,
            interval,
        }
    }

    /// Fetch the backend's authoritative list of live payment requests.
    pub async fn fetch_live_payments(&self) -> AppResult<Vec<BackendPayment>> {
        let url = format!("{}/api/payments/live", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.session.bearer())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::External(format!(
                "Backend returned {} for {}",
                status, url
            )));
        }

        let payments = response.json::<Vec<BackendPayment>>().await?;
        debug!("Fetched {} live payments for reconciliation", payments.len());
        Ok(payments)
    }

    /// Run one reconciliation pass every interval. Fetch failures are
    /// logged and skipped; the next cycle retries.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match self.fetch_live_payments().await {
                    Ok(payments) => {
                        if self
                            .store
                            .command(IntakeCommand::Reconcile(payments))
                            .is_err()
                        {
                            debug!("Intake reducer gone, stopping reconciliation");
                            break;
                        }
                    }
                    Err(e) => warn!("Reconciliation pass skipped: {}", e),
                }
            }
        })
    }
}
