//! Partner notification fan-out.
//!
//! Notification is best-effort: a booking is never failed or rolled back
//! because a partner could not be told about it. Every failure here is traced
//! and swallowed.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::SequenceId;
use domain::booking::PartnerId;
use futures_util::StreamExt;
use futures_util::stream;

use crate::error::FulfillmentError;
use crate::services::{PartnerDirectory, PushSender};

const DEFAULT_FANOUT_CONCURRENCY: usize = 8;
const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// What a notification is about, driving its title and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A cash-on-delivery booking was taken in.
    CodBooking,
    /// A gateway-paid booking was created after reconciliation.
    PaidBooking,
}

impl NotificationKind {
    pub fn title(&self) -> &'static str {
        match self {
            NotificationKind::CodBooking => "New booking",
            NotificationKind::PaidBooking => "New paid booking",
        }
    }

    fn message(&self, sequence_id: &SequenceId) -> String {
        match self {
            NotificationKind::CodBooking => {
                format!("Booking {} is ready to pick", sequence_id.as_str())
            }
            NotificationKind::PaidBooking => {
                format!("Paid booking {} is ready to pick", sequence_id.as_str())
            }
        }
    }
}

/// A notification recorded for one partner.
#[derive(Debug, Clone)]
pub struct Notification {
    pub partner_id: PartnerId,
    pub booking_id: AggregateId,
    pub sequence_id: SequenceId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Trait for the notification inbox partners read from.
#[async_trait::async_trait]
pub trait NotificationLog: Send + Sync {
    /// Records a notification for a partner.
    async fn record(&self, notification: Notification) -> Result<(), FulfillmentError>;
}

#[derive(Debug, Default)]
struct InMemoryLogState {
    notifications: Vec<Notification>,
    fail_on_record: bool,
}

/// In-memory notification log for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationLog {
    state: Arc<RwLock<InMemoryLogState>>,
}

impl InMemoryNotificationLog {
    /// Creates a new in-memory log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the log to fail every record call.
    pub fn set_fail_on_record(&self, fail: bool) {
        self.state.write().unwrap().fail_on_record = fail;
    }

    /// Returns all notifications recorded for a partner.
    pub fn notifications_for(&self, partner_id: PartnerId) -> Vec<Notification> {
        self.state
            .read()
            .unwrap()
            .notifications
            .iter()
            .filter(|n| n.partner_id == partner_id)
            .cloned()
            .collect()
    }

    /// Returns the total number of notifications recorded.
    pub fn notification_count(&self) -> usize {
        self.state.read().unwrap().notifications.len()
    }
}

#[async_trait::async_trait]
impl NotificationLog for InMemoryNotificationLog {
    async fn record(&self, notification: Notification) -> Result<(), FulfillmentError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_record {
            return Err(FulfillmentError::Gateway("notification log down".to_string()));
        }
        state.notifications.push(notification);
        Ok(())
    }
}

/// Fans a booking notification out to every on-duty partner.
pub struct NotificationDispatcher<P, L, Push> {
    partners: Arc<P>,
    log: Arc<L>,
    push: Arc<Push>,
    concurrency: usize,
    push_timeout: Duration,
}

impl<P, L, Push> Clone for NotificationDispatcher<P, L, Push> {
    fn clone(&self) -> Self {
        Self {
            partners: Arc::clone(&self.partners),
            log: Arc::clone(&self.log),
            push: Arc::clone(&self.push),
            concurrency: self.concurrency,
            push_timeout: self.push_timeout,
        }
    }
}

impl<P, L, Push> NotificationDispatcher<P, L, Push>
where
    P: PartnerDirectory,
    L: NotificationLog,
    Push: PushSender,
{
    /// Creates a dispatcher with default concurrency and push timeout.
    pub fn new(partners: Arc<P>, log: Arc<L>, push: Arc<Push>) -> Self {
        Self {
            partners,
            log,
            push,
            concurrency: DEFAULT_FANOUT_CONCURRENCY,
            push_timeout: DEFAULT_PUSH_TIMEOUT,
        }
    }

    /// Overrides the fan-out concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Overrides the per-push timeout.
    pub fn with_push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = timeout;
        self
    }

    /// Notifies every on-duty partner about a booking.
    ///
    /// One partner's failure never blocks another's notification, and no
    /// failure here propagates to the caller.
    #[tracing::instrument(skip(self), fields(kind = ?kind, sequence_id = %sequence_id))]
    pub async fn notify(
        &self,
        kind: NotificationKind,
        booking_id: AggregateId,
        sequence_id: SequenceId,
    ) {
        let partners = match self.partners.on_duty_partners().await {
            Ok(partners) => partners,
            Err(error) => {
                tracing::warn!(%error, "Failed to list on-duty partners, skipping fan-out");
                metrics::counter!("notification_failures_total", "stage" => "directory")
                    .increment(1);
                return;
            }
        };

        if partners.is_empty() {
            tracing::debug!("No partners on duty, nothing to notify");
            return;
        }

        let message = kind.message(&sequence_id);
        let started = std::time::Instant::now();

        stream::iter(partners)
            .for_each_concurrent(Some(self.concurrency), |partner| {
                let message = message.clone();
                let sequence_id = sequence_id.clone();
                async move {
                    let notification = Notification {
                        partner_id: partner.id,
                        booking_id,
                        sequence_id,
                        message,
                        created_at: Utc::now(),
                    };
                    let message = notification.message.clone();

                    if let Err(error) = self.log.record(notification).await {
                        tracing::warn!(partner_id = %partner.id, %error, "Failed to record notification");
                        metrics::counter!("notification_failures_total", "stage" => "record")
                            .increment(1);
                        return;
                    }

                    let Some(token) = partner.push_token.as_deref() else {
                        metrics::counter!("notifications_sent_total").increment(1);
                        return;
                    };

                    let push = self.push.send(token, kind.title(), &message);
                    match tokio::time::timeout(self.push_timeout, push).await {
                        Ok(Ok(())) => {
                            metrics::counter!("notifications_sent_total").increment(1);
                        }
                        Ok(Err(error)) => {
                            tracing::warn!(partner_id = %partner.id, %error, "Push delivery failed");
                            metrics::counter!("notification_failures_total", "stage" => "push")
                                .increment(1);
                        }
                        Err(_) => {
                            tracing::warn!(partner_id = %partner.id, "Push delivery timed out");
                            metrics::counter!("notification_failures_total", "stage" => "timeout")
                                .increment(1);
                        }
                    }
                }
            })
            .await;

        metrics::histogram!("notification_fanout_duration_seconds")
            .record(started.elapsed().as_secs_f64());
    }
}
