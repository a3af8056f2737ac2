use chrono::{NaiveDate, NaiveDateTime};
use hourglass_rs::SafeTimeProvider;
use tracing::info;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::dates::{format_display_date, format_display_time};
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::ledger;
use crate::listing::{self, ListedRecord, Page};
use crate::loans::LoanTerms;
use crate::penalty::assess_penalty;
use crate::repository;
use crate::store::{BlobStore, Store};
use crate::types::{
    Application, ApplicationHeader, Channel, Domain, DomainPayload, FeedEntry, FundsSource,
    Member, Outcome, RejectionReason, Resolution, Status,
};

/// a submission before the engine stamps id, time and status
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub member_id: String,
    pub amount: Money,
    pub channel: Channel,
    pub channel_account_name: String,
    pub channel_account_number: String,
    pub detail: NewDetail,
}

/// domain-specific submission fields
#[derive(Debug, Clone)]
pub enum NewDetail {
    Deposit {
        proof_url: Option<String>,
    },
    Withdrawal,
    LoanPayment {
        selected_loan_id: String,
        proof_url: String,
    },
    LoanApplication {
        term_months: u32,
        purpose: String,
    },
}

/// orchestrates the lifecycle of one financial application
///
/// The engine is the sole mutator of member balances, the funds pool
/// and loan records. Each operation is a short request-scoped sequence
/// of store reads and writes; resolution is serialized on the outcome
/// key's conditional create, so re-driving a partially failed `approve`
/// is refused rather than double-applied.
pub struct LifecycleEngine<S: Store, B: BlobStore> {
    store: S,
    blobs: B,
    config: EngineConfig,
}

impl<S: Store, B: BlobStore> LifecycleEngine<S, B> {
    pub fn new(store: S, blobs: B, config: EngineConfig) -> Self {
        Self {
            store,
            blobs,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// store proof-of-payment bytes and return the retrieval url
    pub fn upload_proof(&self, member_id: &str, file_name: &str, bytes: &[u8]) -> Result<String> {
        self.blobs
            .upload(&format!("proofs/{member_id}/{file_name}"), bytes)
    }

    /// persist a fresh application with status pending
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] on missing or non-positive fields,
    /// [`LedgerError::NotFound`] when the member or selected loan is
    /// absent.
    pub fn submit(&self, request: NewApplication, time: &SafeTimeProvider) -> Result<Application> {
        if !request.amount.is_positive() {
            return Err(LedgerError::Validation {
                message: "amount must be positive".to_string(),
            });
        }
        // membership is checked up front so a ghost submission never
        // reaches the pending collection
        let member = ledger::load_member(&self.store, &request.member_id)?;

        let now = time.now().naive_utc();
        let payload = self.build_payload(&request, &member, now.date())?;

        const MAX_ID_ATTEMPTS: u32 = 8;
        for _ in 0..MAX_ID_ATTEMPTS {
            let transaction_id = self.generate_transaction_id();
            let application = Application {
                header: ApplicationHeader {
                    member_id: request.member_id.clone(),
                    transaction_id,
                    amount: request.amount,
                    channel: request.channel,
                    channel_account_name: request.channel_account_name.clone(),
                    channel_account_number: request.channel_account_number.clone(),
                    submitted_at: now,
                    submitted_display: format_display_date(now),
                    status: Status::Pending,
                },
                payload: payload.clone(),
            };
            match repository::insert_pending(&self.store, &application) {
                Ok(()) => {
                    info!(
                        domain = application.domain().label(),
                        member = %application.header.member_id,
                        transaction = %application.header.transaction_id,
                        "application submitted"
                    );
                    return Ok(application);
                }
                // id collided within this member's collection; roll again
                Err(LedgerError::Conflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::Store {
            message: "exhausted transaction id attempts".to_string(),
        })
    }

    /// approve a pending application, mutating the ledger
    ///
    /// Notification dispatch is deliberately not part of this
    /// operation; callers invoke the dispatcher after a durable result
    /// comes back, so ledger correctness never depends on delivery.
    pub fn approve(
        &self,
        domain: Domain,
        member_id: &str,
        transaction_id: &str,
        approver: &str,
        time: &SafeTimeProvider,
    ) -> Result<Outcome> {
        let application = self.load_unresolved(domain, member_id, transaction_id)?;
        let mut member = ledger::load_member(&self.store, member_id)?;
        let amount = application.header.amount;
        let now = time.now().naive_utc();

        match &application.payload {
            DomainPayload::Deposit { .. } => {
                if !amount.is_positive() {
                    return Err(LedgerError::Validation {
                        message: "amount must be positive".to_string(),
                    });
                }
                member.balance += amount;
                ledger::save_balance(&self.store, member_id, member.balance)?;
                let pool = ledger::funds_pool(&self.store)? + amount;
                ledger::save_funds_pool(&self.store, pool)?;
            }
            DomainPayload::Withdrawal {} => {
                if amount > member.balance {
                    return Err(LedgerError::InsufficientFunds {
                        source: FundsSource::MemberBalance,
                        available: member.balance,
                        requested: amount,
                    });
                }
                let pool = ledger::funds_pool(&self.store)?;
                if amount > pool {
                    return Err(LedgerError::InsufficientFunds {
                        source: FundsSource::FundsPool,
                        available: pool,
                        requested: amount,
                    });
                }
                member.balance -= amount;
                ledger::save_balance(&self.store, member_id, member.balance)?;
                let remaining = pool - amount;
                ledger::save_funds_pool(&self.store, remaining)?;
                ledger::append_funds_snapshot(&self.store, now, remaining)?;
            }
            DomainPayload::LoanPayment {
                selected_loan_id,
                penalty,
                overdue_days,
                total_due,
                ..
            } => {
                if amount > member.balance {
                    return Err(LedgerError::InsufficientFunds {
                        source: FundsSource::MemberBalance,
                        available: member.balance,
                        requested: amount,
                    });
                }
                // the assessment stamped at submission is authoritative
                if *overdue_days > 0 && amount < *total_due {
                    return Err(LedgerError::Underpayment {
                        monthly_payment: *total_due - *penalty,
                        penalty: *penalty,
                        total_due: *total_due,
                        provided: amount,
                    });
                }
                member.balance -= amount;
                ledger::save_balance(&self.store, member_id, member.balance)?;
                // funds pool intentionally untouched for loan payments
                match ledger::load_loan(&self.store, member_id, selected_loan_id) {
                    Ok(mut loan) => {
                        loan.advance_due(now.date());
                        ledger::save_loan(&self.store, &loan)?;
                    }
                    Err(LedgerError::NotFound { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
            DomainPayload::LoanApplication { term_months, .. } => {
                let terms = LoanTerms::derive(
                    amount,
                    *term_months,
                    self.config.monthly_interest_rate,
                    now.date(),
                );
                let loan = terms.into_loan(
                    transaction_id.to_string(),
                    member_id.to_string(),
                    amount,
                    *term_months,
                );
                ledger::save_loan(&self.store, &loan)?;
            }
        }

        let outcome = self.commit(application, Status::Approved, approver, now, None)?;
        info!(
            domain = domain.label(),
            member = member_id,
            transaction = transaction_id,
            "application approved"
        );
        Ok(outcome)
    }

    /// reject a pending application; no ledger mutation occurs
    pub fn reject(
        &self,
        domain: Domain,
        member_id: &str,
        transaction_id: &str,
        reason: RejectionReason,
        approver: &str,
        time: &SafeTimeProvider,
    ) -> Result<Outcome> {
        if let RejectionReason::Other(text) = &reason {
            if text.trim().is_empty() {
                return Err(LedgerError::Validation {
                    message: "rejection reason is required".to_string(),
                });
            }
        }
        let application = self.load_unresolved(domain, member_id, transaction_id)?;
        let now = time.now().naive_utc();

        let outcome = self.commit(application, Status::Rejected, approver, now, Some(reason))?;
        info!(
            domain = domain.label(),
            member = member_id,
            transaction = transaction_id,
            "application rejected"
        );
        Ok(outcome)
    }

    /// flattened, filterable, paginated view over a collection
    pub fn list(
        &self,
        domain: Domain,
        status: Status,
        filter: &str,
        page: usize,
    ) -> Result<Page<ListedRecord>> {
        listing::list(&self.store, &self.config, domain, status, filter, page)
    }

    /// a member's unified transaction feed, chronological
    pub fn feed(&self, member_id: &str) -> Result<Vec<FeedEntry>> {
        repository::member_feed(&self.store, member_id)
    }

    fn build_payload(
        &self,
        request: &NewApplication,
        member: &Member,
        today: NaiveDate,
    ) -> Result<DomainPayload> {
        match &request.detail {
            NewDetail::Deposit { proof_url } => Ok(DomainPayload::Deposit {
                proof_url: proof_url.clone(),
            }),
            NewDetail::Withdrawal => Ok(DomainPayload::Withdrawal {}),
            NewDetail::LoanPayment {
                selected_loan_id,
                proof_url,
            } => {
                if proof_url.trim().is_empty() {
                    return Err(LedgerError::Validation {
                        message: "proof of payment is required".to_string(),
                    });
                }
                if selected_loan_id.trim().is_empty() {
                    return Err(LedgerError::Validation {
                        message: "a loan must be selected for the payment".to_string(),
                    });
                }
                let loan = ledger::load_loan(&self.store, &request.member_id, selected_loan_id)?;
                let assessment = assess_penalty(
                    &loan,
                    member.loan_interest,
                    today,
                    self.config.penalty_period_days,
                );
                Ok(DomainPayload::LoanPayment {
                    selected_loan_id: selected_loan_id.clone(),
                    proof_url: proof_url.clone(),
                    penalty: assessment.penalty,
                    overdue_days: assessment.overdue_days,
                    total_due: assessment.total_due,
                })
            }
            NewDetail::LoanApplication {
                term_months,
                purpose,
            } => {
                if *term_months == 0 {
                    return Err(LedgerError::Validation {
                        message: "loan term must be at least one month".to_string(),
                    });
                }
                Ok(DomainPayload::LoanApplication {
                    term_months: *term_months,
                    purpose: purpose.clone(),
                })
            }
        }
    }

    /// load a pending application, refusing anything already resolved
    fn load_unresolved(
        &self,
        domain: Domain,
        member_id: &str,
        transaction_id: &str,
    ) -> Result<Application> {
        let application = repository::pending(&self.store, domain, member_id, transaction_id)?;
        if application.header.status.is_terminal()
            || repository::outcome_exists(&self.store, domain, member_id, transaction_id)?
        {
            return Err(LedgerError::AlreadyResolved {
                transaction_id: transaction_id.to_string(),
            });
        }
        Ok(application)
    }

    /// stamp resolution, write outcome + feed, retain the audit record
    fn commit(
        &self,
        mut application: Application,
        status: Status,
        approver: &str,
        now: NaiveDateTime,
        rejection_reason: Option<RejectionReason>,
    ) -> Result<Outcome> {
        application.header.status = status;
        let outcome = Outcome {
            application,
            resolution: Resolution {
                decided_by: approver.to_string(),
                decided_at: now,
                date_display: format_display_date(now),
                time_display: format_display_time(now),
                rejection_reason,
            },
        };
        repository::insert_outcome(&self.store, &outcome)?;
        repository::append_feed(&self.store, &FeedEntry::from_outcome(&outcome))?;
        repository::mark_resolved(&self.store, &outcome)?;
        Ok(outcome)
    }

    fn generate_transaction_id(&self) -> String {
        let bytes = *Uuid::new_v4().as_bytes();
        let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let width = self.config.transaction_id_len as usize;
        let modulus = 10u32.saturating_pow(self.config.transaction_id_len);
        format!("{:0width$}", raw % modulus)
    }
}
