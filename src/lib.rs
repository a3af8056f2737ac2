pub mod config;
pub mod dates;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod listing;
pub mod loans;
pub mod notify;
pub mod penalty;
pub mod repository;
pub mod store;
pub mod types;

// re-export key types
pub use config::EngineConfig;
pub use dates::{DateInput, ParseStrategy, ParsedDate};
pub use decimal::{Money, Rate};
pub use engine::{LifecycleEngine, NewApplication, NewDetail};
pub use errors::{LedgerError, Result};
pub use listing::{ListedRecord, Page};
pub use loans::{Loan, LoanTerms};
pub use notify::{
    DeliveryReceipt, DeliveryResult, NotificationDispatcher, NotificationPayload,
    NotificationSender, TemplateKind,
};
pub use penalty::{assess_penalty, PenaltyAssessment};
pub use store::{BlobStore, MemoryBlobStore, MemoryStore, Store};
pub use types::{
    Application, ApplicationHeader, Channel, Domain, DomainPayload, FeedEntry, FundsSource,
    Member, Outcome, RejectionReason, Resolution, Status,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
