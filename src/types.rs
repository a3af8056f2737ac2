use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::Money;

/// request domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    Deposit,
    Withdrawal,
    LoanPayment,
    LoanApplication,
}

impl Domain {
    /// top-level collection for this domain
    pub fn root(&self) -> &'static str {
        match self {
            Domain::Deposit => "Deposits",
            Domain::Withdrawal => "Withdrawals",
            Domain::LoanPayment => "LoanPayments",
            Domain::LoanApplication => "LoanApplications",
        }
    }

    /// collection of applications awaiting a decision
    pub fn pending_segment(&self) -> &'static str {
        match self {
            Domain::Deposit => "PendingDeposits",
            Domain::Withdrawal => "PendingWithdrawals",
            Domain::LoanPayment => "PendingLoanPayments",
            Domain::LoanApplication => "PendingLoanApplications",
        }
    }

    /// collection of approved outcomes
    pub fn approved_segment(&self) -> &'static str {
        match self {
            Domain::Deposit => "ApprovedDeposits",
            Domain::Withdrawal => "ApprovedWithdrawals",
            Domain::LoanPayment => "ApprovedLoanPayments",
            Domain::LoanApplication => "ApprovedLoanApplications",
        }
    }

    /// collection of rejected outcomes
    pub fn rejected_segment(&self) -> &'static str {
        match self {
            Domain::Deposit => "RejectedDeposits",
            Domain::Withdrawal => "RejectedWithdrawals",
            Domain::LoanPayment => "RejectedLoanPayments",
            Domain::LoanApplication => "RejectedLoanApplications",
        }
    }

    /// lowercase label for messages
    pub fn label(&self) -> &'static str {
        match self {
            Domain::Deposit => "deposit",
            Domain::Withdrawal => "withdrawal",
            Domain::LoanPayment => "loan payment",
            Domain::LoanApplication => "loan application",
        }
    }
}

/// application status
///
/// `Pending -> {Approved, Rejected}`; both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Pending,
    Approved,
    Rejected,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Approved | Status::Rejected)
    }
}

/// payment channel chosen by the member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    Bank,
    EWallet,
    Cash,
}

/// which ledger a funds check ran against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundsSource {
    MemberBalance,
    FundsPool,
}

impl fmt::Display for FundsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundsSource::MemberBalance => write!(f, "member balance"),
            FundsSource::FundsPool => write!(f, "pooled funds"),
        }
    }
}

// thiserror treats the `source`-named field of `LedgerError::InsufficientFunds`
// as the error source, which requires this type to implement `std::error::Error`.
impl std::error::Error for FundsSource {}

/// cooperative member
///
/// `balance` is mutated only by the lifecycle engine and never drops
/// below zero. `loan_interest` is the member-level cached interest
/// figure used as a penalty fallback when a loan record lacks one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: String,
    pub name: String,
    pub email: String,
    pub balance: Money,
    #[serde(default)]
    pub loan_interest: Option<Money>,
}

/// common header shared by every domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationHeader {
    pub member_id: String,
    /// 6-digit string, unique within the member's domain collection
    pub transaction_id: String,
    pub amount: Money,
    pub channel: Channel,
    pub channel_account_name: String,
    pub channel_account_number: String,
    pub submitted_at: NaiveDateTime,
    pub submitted_display: String,
    pub status: Status,
}

/// domain-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DomainPayload {
    Deposit {
        #[serde(default)]
        proof_url: Option<String>,
    },
    Withdrawal {},
    LoanPayment {
        /// the loan this payment applies to; callers must select one
        /// because a member may hold several concurrent loans
        selected_loan_id: String,
        proof_url: String,
        /// assessment stamped at submission time
        penalty: Money,
        overdue_days: u32,
        total_due: Money,
    },
    LoanApplication {
        term_months: u32,
        purpose: String,
    },
}

impl DomainPayload {
    pub fn domain(&self) -> Domain {
        match self {
            DomainPayload::Deposit { .. } => Domain::Deposit,
            DomainPayload::Withdrawal {} => Domain::Withdrawal,
            DomainPayload::LoanPayment { .. } => Domain::LoanPayment,
            DomainPayload::LoanApplication { .. } => Domain::LoanApplication,
        }
    }
}

/// a member-submitted request awaiting a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub header: ApplicationHeader,
    pub payload: DomainPayload,
}

impl Application {
    pub fn domain(&self) -> Domain {
        self.payload.domain()
    }
}

/// staff rejection reason; `Other` carries mandatory custom text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    InvalidProofOfPayment,
    IncorrectAmount,
    DuplicateSubmission,
    Other(String),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::InvalidProofOfPayment => write!(f, "Invalid proof of payment"),
            RejectionReason::IncorrectAmount => write!(f, "Incorrect amount"),
            RejectionReason::DuplicateSubmission => write!(f, "Duplicate submission"),
            RejectionReason::Other(text) => write!(f, "{text}"),
        }
    }
}

/// resolution metadata stamped on a terminal application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub decided_by: String,
    pub decided_at: NaiveDateTime,
    /// `Month D, YYYY`
    pub date_display: String,
    /// `HH:MM`
    pub time_display: String,
    #[serde(default)]
    pub rejection_reason: Option<RejectionReason>,
}

/// the immutable terminal record of an application's resolution
///
/// Approved and rejected outcomes live in disjoint collections; exactly
/// one outcome exists per resolved application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub application: Application,
    pub resolution: Resolution,
}

impl Outcome {
    pub fn domain(&self) -> Domain {
        self.application.domain()
    }

    pub fn member_id(&self) -> &str {
        &self.application.header.member_id
    }

    pub fn transaction_id(&self) -> &str {
        &self.application.header.transaction_id
    }
}

/// denormalized per-member feed entry; display only, not authoritative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub domain: Domain,
    pub member_id: String,
    pub transaction_id: String,
    pub amount: Money,
    pub status: Status,
    pub decided_at: NaiveDateTime,
    pub date_display: String,
}

impl FeedEntry {
    pub fn from_outcome(outcome: &Outcome) -> Self {
        Self {
            domain: outcome.domain(),
            member_id: outcome.member_id().to_string(),
            transaction_id: outcome.transaction_id().to_string(),
            amount: outcome.application.header.amount,
            status: outcome.application.header.status,
            decided_at: outcome.resolution.decided_at,
            date_display: outcome.resolution.date_display.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_collection_names() {
        assert_eq!(Domain::Deposit.root(), "Deposits");
        assert_eq!(Domain::Deposit.pending_segment(), "PendingDeposits");
        assert_eq!(Domain::Withdrawal.approved_segment(), "ApprovedWithdrawals");
        assert_eq!(Domain::LoanPayment.rejected_segment(), "RejectedLoanPayments");
    }

    #[test]
    fn test_status_terminality() {
        assert!(!Status::Pending.is_terminal());
        assert!(Status::Approved.is_terminal());
        assert!(Status::Rejected.is_terminal());
    }

    #[test]
    fn test_payload_round_trip() {
        let payload = DomainPayload::LoanPayment {
            selected_loan_id: "402112".to_string(),
            proof_url: "memory://proofs/m-001/receipt.jpg".to_string(),
            penalty: Money::from_major(40),
            overdue_days: 2,
            total_due: Money::from_major(2_040),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "LoanPayment");
        let back: DomainPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back.domain(), Domain::LoanPayment);
    }

    #[test]
    fn test_rejection_reason_display() {
        assert_eq!(RejectionReason::IncorrectAmount.to_string(), "Incorrect amount");
        assert_eq!(
            RejectionReason::Other("blurred receipt".to_string()).to_string(),
            "blurred receipt"
        );
    }
}
