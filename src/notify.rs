use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::Result;
use crate::types::{Domain, Member, Outcome, Status};

/// outbound template kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateKind {
    ApprovalNotice,
    RejectionNotice,
}

/// payload handed to the notification adapter, keyed by transaction id
/// so the receiving side can deduplicate repeats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub transaction_id: String,
    pub member_id: String,
    pub email: String,
    pub member_name: String,
    pub domain: Domain,
    pub status: Status,
    pub amount_display: String,
    pub decided_display: String,
    pub reason: Option<String>,
}

/// adapter response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub ok: bool,
}

/// what the dispatcher reports back; never an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered,
    Failed { message: String },
}

impl DeliveryResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryResult::Delivered)
    }
}

/// outbound notification adapter
///
/// Implementations own their transport and timeout; the dispatcher
/// places no retry obligation on them.
pub trait NotificationSender: Send + Sync {
    fn send(&self, kind: TemplateKind, payload: &NotificationPayload) -> Result<DeliveryReceipt>;
}

/// best-effort side channel invoked after the engine durably commits
///
/// Failures are logged and swallowed: the financial operation already
/// succeeded, so nothing here may block or fail the caller. Dispatching
/// the same outcome more than once is safe; payloads are keyed by
/// transaction id.
pub struct NotificationDispatcher<N: NotificationSender> {
    sender: N,
}

impl<N: NotificationSender> NotificationDispatcher<N> {
    pub fn new(sender: N) -> Self {
        Self { sender }
    }

    pub fn dispatch(&self, outcome: &Outcome, member: &Member) -> DeliveryResult {
        let status = outcome.application.header.status;
        let kind = match status {
            Status::Approved => TemplateKind::ApprovalNotice,
            Status::Rejected => TemplateKind::RejectionNotice,
            Status::Pending => {
                return DeliveryResult::Failed {
                    message: "unresolved outcome".to_string(),
                }
            }
        };
        let payload = NotificationPayload {
            transaction_id: outcome.transaction_id().to_string(),
            member_id: outcome.member_id().to_string(),
            email: member.email.clone(),
            member_name: member.name.clone(),
            domain: outcome.domain(),
            status,
            amount_display: outcome.application.header.amount.display_currency(),
            decided_display: outcome.resolution.date_display.clone(),
            reason: outcome
                .resolution
                .rejection_reason
                .as_ref()
                .map(|r| r.to_string()),
        };

        match self.sender.send(kind, &payload) {
            Ok(DeliveryReceipt { ok: true }) => {
                info!(
                    transaction = %payload.transaction_id,
                    member = %payload.member_id,
                    "notification delivered"
                );
                DeliveryResult::Delivered
            }
            Ok(DeliveryReceipt { ok: false }) => {
                warn!(
                    transaction = %payload.transaction_id,
                    "notification adapter declined delivery"
                );
                DeliveryResult::Failed {
                    message: "adapter declined delivery".to_string(),
                }
            }
            Err(e) => {
                warn!(
                    transaction = %payload.transaction_id,
                    error = %e,
                    "notification delivery failed"
                );
                DeliveryResult::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}

/// sender that drops everything; useful where no adapter is wired up
#[derive(Debug, Default)]
pub struct NullSender;

impl NotificationSender for NullSender {
    fn send(&self, _kind: TemplateKind, _payload: &NotificationPayload) -> Result<DeliveryReceipt> {
        Ok(DeliveryReceipt { ok: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::types::{
        Application, ApplicationHeader, Channel, DomainPayload, RejectionReason, Resolution,
    };
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingSender {
        calls: AtomicUsize,
        fail: bool,
    }

    impl RecordingSender {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl NotificationSender for RecordingSender {
        fn send(
            &self,
            _kind: TemplateKind,
            _payload: &NotificationPayload,
        ) -> crate::errors::Result<DeliveryReceipt> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(crate::errors::LedgerError::Delivery {
                    message: "smtp timeout".to_string(),
                })
            } else {
                Ok(DeliveryReceipt { ok: true })
            }
        }
    }

    fn member() -> Member {
        Member {
            member_id: "m-001".to_string(),
            name: "Ana Reyes".to_string(),
            email: "ana@example.com".to_string(),
            balance: Money::from_major(1_000),
            loan_interest: None,
        }
    }

    fn outcome(status: Status) -> Outcome {
        Outcome {
            application: Application {
                header: ApplicationHeader {
                    member_id: "m-001".to_string(),
                    transaction_id: "111111".to_string(),
                    amount: Money::from_major(500),
                    channel: Channel::EWallet,
                    channel_account_name: "Ana Reyes".to_string(),
                    channel_account_number: "09170000001".to_string(),
                    submitted_at: NaiveDate::from_ymd_opt(2025, 8, 20)
                        .unwrap()
                        .and_hms_opt(9, 0, 0)
                        .unwrap(),
                    submitted_display: "August 20, 2025".to_string(),
                    status,
                },
                payload: DomainPayload::Deposit { proof_url: None },
            },
            resolution: Resolution {
                decided_by: "staff-01".to_string(),
                decided_at: NaiveDate::from_ymd_opt(2025, 8, 21)
                    .unwrap()
                    .and_hms_opt(10, 15, 0)
                    .unwrap(),
                date_display: "August 21, 2025".to_string(),
                time_display: "10:15".to_string(),
                rejection_reason: match status {
                    Status::Rejected => Some(RejectionReason::IncorrectAmount),
                    _ => None,
                },
            },
        }
    }

    #[test]
    fn test_successful_delivery() {
        let dispatcher = NotificationDispatcher::new(RecordingSender::new(false));
        let result = dispatcher.dispatch(&outcome(Status::Approved), &member());
        assert!(result.is_delivered());
        assert_eq!(dispatcher.sender.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sender_failure_is_swallowed() {
        let dispatcher = NotificationDispatcher::new(RecordingSender::new(true));
        let result = dispatcher.dispatch(&outcome(Status::Approved), &member());
        assert_eq!(
            result,
            DeliveryResult::Failed {
                message: "notification delivery failed: smtp timeout".to_string()
            }
        );
    }

    #[test]
    fn test_repeat_dispatch_is_safe() {
        let dispatcher = NotificationDispatcher::new(RecordingSender::new(false));
        let resolved = outcome(Status::Rejected);
        let m = member();
        assert!(dispatcher.dispatch(&resolved, &m).is_delivered());
        assert!(dispatcher.dispatch(&resolved, &m).is_delivered());
        assert_eq!(dispatcher.sender.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_rejection_carries_reason() {
        struct Capture(std::sync::Mutex<Option<NotificationPayload>>);
        impl NotificationSender for Capture {
            fn send(
                &self,
                _kind: TemplateKind,
                payload: &NotificationPayload,
            ) -> crate::errors::Result<DeliveryReceipt> {
                *self.0.lock().unwrap() = Some(payload.clone());
                Ok(DeliveryReceipt { ok: true })
            }
        }

        let dispatcher = NotificationDispatcher::new(Capture(std::sync::Mutex::new(None)));
        dispatcher.dispatch(&outcome(Status::Rejected), &member());
        let seen = dispatcher.sender.0.lock().unwrap().clone().unwrap();
        assert_eq!(seen.reason.as_deref(), Some("Incorrect amount"));
        assert_eq!(seen.amount_display, "\u{20b1}500.00");
    }
}
