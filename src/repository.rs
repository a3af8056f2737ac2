use serde_json::{json, Value};

use crate::errors::{LedgerError, Result};
use crate::store::Store;
use crate::types::{Application, Domain, FeedEntry, Outcome, Status};

/// per-domain CRUD over the three logical collections: pending
/// applications, outcomes split by result, and the unified per-member
/// transaction feed.

fn pending_path(domain: Domain, member_id: &str, transaction_id: &str) -> String {
    format!(
        "{}/{}/{member_id}/{transaction_id}",
        domain.root(),
        domain.pending_segment()
    )
}

fn outcome_path(domain: Domain, status: Status, member_id: &str, transaction_id: &str) -> String {
    let segment = match status {
        Status::Approved => domain.approved_segment(),
        Status::Rejected => domain.rejected_segment(),
        Status::Pending => unreachable!("pending is not an outcome"),
    };
    format!("{}/{segment}/{member_id}/{transaction_id}", domain.root())
}

fn feed_path(member_id: &str, transaction_id: &str) -> String {
    format!("TransactionsFeed/{member_id}/{transaction_id}")
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| LedgerError::Store {
        message: format!("unencodable record: {e}"),
    })
}

fn decode<T: serde::de::DeserializeOwned>(path: &str, doc: Value) -> Result<T> {
    serde_json::from_value(doc).map_err(|e| LedgerError::Store {
        message: format!("undecodable record at {path}: {e}"),
    })
}

/// persist a fresh pending application; refuses on transaction id
/// collision within the member's domain collection
pub fn insert_pending(store: &impl Store, application: &Application) -> Result<()> {
    let path = pending_path(
        application.domain(),
        &application.header.member_id,
        &application.header.transaction_id,
    );
    store.create(&path, encode(application)?)
}

/// load one pending application
pub fn pending(
    store: &impl Store,
    domain: Domain,
    member_id: &str,
    transaction_id: &str,
) -> Result<Application> {
    let path = pending_path(domain, member_id, transaction_id);
    match store.get(&path)? {
        Some(doc) => decode(&path, doc),
        None => Err(LedgerError::NotFound {
            entity: "application",
            id: format!("{member_id}/{transaction_id}"),
        }),
    }
}

/// true when an outcome already exists in either terminal collection
pub fn outcome_exists(
    store: &impl Store,
    domain: Domain,
    member_id: &str,
    transaction_id: &str,
) -> Result<bool> {
    let approved = outcome_path(domain, Status::Approved, member_id, transaction_id);
    let rejected = outcome_path(domain, Status::Rejected, member_id, transaction_id);
    Ok(store.get(&approved)?.is_some() || store.get(&rejected)?.is_some())
}

/// conditionally write the outcome record; a conflict here means a
/// concurrent resolution won, surfaced as [`LedgerError::AlreadyResolved`]
pub fn insert_outcome(store: &impl Store, outcome: &Outcome) -> Result<()> {
    let path = outcome_path(
        outcome.domain(),
        outcome.application.header.status,
        outcome.member_id(),
        outcome.transaction_id(),
    );
    match store.create(&path, encode(outcome)?) {
        Err(LedgerError::Conflict { .. }) => Err(LedgerError::AlreadyResolved {
            transaction_id: outcome.transaction_id().to_string(),
        }),
        other => other,
    }
}

/// stamp status and resolution metadata on the retained pending record
///
/// The pending record is never deleted; it stays behind for audit.
pub fn mark_resolved(store: &impl Store, outcome: &Outcome) -> Result<()> {
    let path = pending_path(outcome.domain(), outcome.member_id(), outcome.transaction_id());
    store.update(
        &path,
        json!({
            "header": encode(&outcome.application.header)?,
            "resolution": encode(&outcome.resolution)?,
        }),
    )
}

/// append the denormalized entry to the member's unified feed
pub fn append_feed(store: &impl Store, entry: &FeedEntry) -> Result<()> {
    store.set(
        &feed_path(&entry.member_id, &entry.transaction_id),
        encode(entry)?,
    )
}

/// whole pending subtree for a domain (member id -> txn id -> doc)
pub fn pending_tree(store: &impl Store, domain: Domain) -> Result<Option<Value>> {
    store.get(&format!("{}/{}", domain.root(), domain.pending_segment()))
}

/// whole outcome subtree for a domain and terminal status
pub fn outcome_tree(store: &impl Store, domain: Domain, status: Status) -> Result<Option<Value>> {
    let segment = match status {
        Status::Approved => domain.approved_segment(),
        Status::Rejected => domain.rejected_segment(),
        Status::Pending => {
            return Err(LedgerError::Validation {
                message: "pending is not an outcome status".to_string(),
            })
        }
    };
    store.get(&format!("{}/{segment}", domain.root()))
}

/// a member's feed, newest last
pub fn member_feed(store: &impl Store, member_id: &str) -> Result<Vec<FeedEntry>> {
    let Some(tree) = store.get(&format!("TransactionsFeed/{member_id}"))? else {
        return Ok(Vec::new());
    };
    let Some(entries) = tree.as_object() else {
        return Ok(Vec::new());
    };
    let mut feed: Vec<FeedEntry> = entries
        .values()
        .filter_map(|doc| serde_json::from_value(doc.clone()).ok())
        .collect();
    feed.sort_by_key(|e| e.decided_at);
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::store::MemoryStore;
    use crate::types::{ApplicationHeader, Channel, DomainPayload, Resolution};
    use chrono::NaiveDate;

    fn sample_application(txn: &str) -> Application {
        Application {
            header: ApplicationHeader {
                member_id: "m-001".to_string(),
                transaction_id: txn.to_string(),
                amount: Money::from_major(500),
                channel: Channel::EWallet,
                channel_account_name: "Ana Reyes".to_string(),
                channel_account_number: "09170000001".to_string(),
                submitted_at: NaiveDate::from_ymd_opt(2025, 8, 20)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
                submitted_display: "August 20, 2025".to_string(),
                status: Status::Pending,
            },
            payload: DomainPayload::Deposit { proof_url: None },
        }
    }

    fn resolved(mut application: Application, status: Status) -> Outcome {
        application.header.status = status;
        Outcome {
            application,
            resolution: Resolution {
                decided_by: "staff-01".to_string(),
                decided_at: NaiveDate::from_ymd_opt(2025, 8, 21)
                    .unwrap()
                    .and_hms_opt(10, 15, 0)
                    .unwrap(),
                date_display: "August 21, 2025".to_string(),
                time_display: "10:15".to_string(),
                rejection_reason: None,
            },
        }
    }

    #[test]
    fn test_pending_round_trip() {
        let store = MemoryStore::new();
        let app = sample_application("111111");
        insert_pending(&store, &app).unwrap();
        let loaded = pending(&store, Domain::Deposit, "m-001", "111111").unwrap();
        assert_eq!(loaded, app);
    }

    #[test]
    fn test_duplicate_pending_refused() {
        let store = MemoryStore::new();
        let app = sample_application("111111");
        insert_pending(&store, &app).unwrap();
        assert!(matches!(
            insert_pending(&store, &app).unwrap_err(),
            LedgerError::Conflict { .. }
        ));
    }

    #[test]
    fn test_outcome_exists_checks_both_collections() {
        let store = MemoryStore::new();
        assert!(!outcome_exists(&store, Domain::Deposit, "m-001", "111111").unwrap());

        insert_outcome(&store, &resolved(sample_application("111111"), Status::Approved)).unwrap();
        assert!(outcome_exists(&store, Domain::Deposit, "m-001", "111111").unwrap());

        insert_outcome(&store, &resolved(sample_application("222222"), Status::Rejected)).unwrap();
        assert!(outcome_exists(&store, Domain::Deposit, "m-001", "222222").unwrap());
    }

    #[test]
    fn test_second_outcome_is_already_resolved() {
        let store = MemoryStore::new();
        let outcome = resolved(sample_application("111111"), Status::Approved);
        insert_outcome(&store, &outcome).unwrap();
        let err = insert_outcome(&store, &outcome).unwrap_err();
        assert_eq!(
            err,
            LedgerError::AlreadyResolved {
                transaction_id: "111111".to_string()
            }
        );
    }

    #[test]
    fn test_mark_resolved_retains_pending_record() {
        let store = MemoryStore::new();
        let app = sample_application("111111");
        insert_pending(&store, &app).unwrap();

        let outcome = resolved(app, Status::Approved);
        mark_resolved(&store, &outcome).unwrap();

        let doc = store
            .get("Deposits/PendingDeposits/m-001/111111")
            .unwrap()
            .expect("audit record retained");
        assert_eq!(doc["header"]["status"], "Approved");
        assert_eq!(doc["resolution"]["decided_by"], "staff-01");
    }

    #[test]
    fn test_feed_is_chronological() {
        let store = MemoryStore::new();
        let newer = resolved(sample_application("222222"), Status::Approved);
        let mut older = resolved(sample_application("111111"), Status::Rejected);
        older.resolution.decided_at -= chrono::Duration::hours(3);

        append_feed(&store, &FeedEntry::from_outcome(&newer)).unwrap();
        append_feed(&store, &FeedEntry::from_outcome(&older)).unwrap();

        let feed = member_feed(&store, "m-001").unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].transaction_id, "111111");
        assert_eq!(feed[1].transaction_id, "222222");
    }
}
