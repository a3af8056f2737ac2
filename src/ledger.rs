use chrono::NaiveDateTime;
use serde_json::json;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::loans::Loan;
use crate::store::Store;
use crate::types::Member;

/// typed read/update operations over the money-bearing documents
///
/// Balances and the funds pool are only ever written through here, and
/// only the lifecycle engine calls the writers.

fn member_path(member_id: &str) -> String {
    format!("Members/{member_id}")
}

fn loan_path(member_id: &str, loan_id: &str) -> String {
    format!("Loans/{member_id}/{loan_id}")
}

const FUNDS_POOL_PATH: &str = "Funds/pool";

fn decode<T: serde::de::DeserializeOwned>(path: &str, doc: serde_json::Value) -> Result<T> {
    serde_json::from_value(doc).map_err(|e| LedgerError::Store {
        message: format!("undecodable document at {path}: {e}"),
    })
}

pub fn load_member(store: &impl Store, member_id: &str) -> Result<Member> {
    let path = member_path(member_id);
    match store.get(&path)? {
        Some(doc) => decode(&path, doc),
        None => Err(LedgerError::NotFound {
            entity: "member",
            id: member_id.to_string(),
        }),
    }
}

pub fn save_member(store: &impl Store, member: &Member) -> Result<()> {
    let doc = serde_json::to_value(member).map_err(|e| LedgerError::Store {
        message: format!("unencodable member: {e}"),
    })?;
    store.set(&member_path(&member.member_id), doc)
}

/// write only the balance field, leaving identity fields untouched
pub fn save_balance(store: &impl Store, member_id: &str, balance: Money) -> Result<()> {
    store.update(&member_path(member_id), json!({ "balance": balance }))
}

/// cooperative-wide liquid funds; a missing document reads as zero
pub fn funds_pool(store: &impl Store) -> Result<Money> {
    match store.get(FUNDS_POOL_PATH)? {
        Some(doc) => {
            let amount = doc.get("amount").cloned().unwrap_or(doc);
            decode(FUNDS_POOL_PATH, amount)
        }
        None => Ok(Money::ZERO),
    }
}

pub fn save_funds_pool(store: &impl Store, amount: Money) -> Result<()> {
    store.set(FUNDS_POOL_PATH, json!({ "amount": amount }))
}

/// append-only pool snapshot keyed by timestamp, for later charting
pub fn append_funds_snapshot(store: &impl Store, at: NaiveDateTime, amount: Money) -> Result<()> {
    let key = at.format("%Y%m%d%H%M%S").to_string();
    store.create(
        &format!("Funds/History/{key}"),
        json!({ "amount": amount, "recorded_at": at }),
    )
}

pub fn load_loan(store: &impl Store, member_id: &str, loan_id: &str) -> Result<Loan> {
    let path = loan_path(member_id, loan_id);
    match store.get(&path)? {
        Some(doc) => decode(&path, doc),
        None => Err(LedgerError::NotFound {
            entity: "loan",
            id: format!("{member_id}/{loan_id}"),
        }),
    }
}

pub fn save_loan(store: &impl Store, loan: &Loan) -> Result<()> {
    let doc = serde_json::to_value(loan).map_err(|e| LedgerError::Store {
        message: format!("unencodable loan: {e}"),
    })?;
    store.set(&loan_path(&loan.member_id, &loan.loan_id), doc)
}

/// all loans held by a member, sorted by loan id
pub fn member_loans(store: &impl Store, member_id: &str) -> Result<Vec<Loan>> {
    let Some(tree) = store.get(&format!("Loans/{member_id}"))? else {
        return Ok(Vec::new());
    };
    let Some(entries) = tree.as_object() else {
        return Ok(Vec::new());
    };
    let mut loans: Vec<Loan> = entries
        .values()
        .filter_map(|doc| serde_json::from_value(doc.clone()).ok())
        .collect();
    loans.sort_by(|a: &Loan, b: &Loan| a.loan_id.cmp(&b.loan_id));
    Ok(loans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn member() -> Member {
        Member {
            member_id: "m-001".to_string(),
            name: "Ana Reyes".to_string(),
            email: "ana@example.com".to_string(),
            balance: Money::from_major(1_000),
            loan_interest: None,
        }
    }

    #[test]
    fn test_member_round_trip() {
        let store = MemoryStore::new();
        save_member(&store, &member()).unwrap();
        let loaded = load_member(&store, "m-001").unwrap();
        assert_eq!(loaded, member());
    }

    #[test]
    fn test_missing_member_is_not_found() {
        let store = MemoryStore::new();
        let err = load_member(&store, "ghost").unwrap_err();
        assert_eq!(
            err,
            LedgerError::NotFound {
                entity: "member",
                id: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_save_balance_preserves_identity_fields() {
        let store = MemoryStore::new();
        save_member(&store, &member()).unwrap();
        save_balance(&store, "m-001", Money::from_major(1_500)).unwrap();
        let loaded = load_member(&store, "m-001").unwrap();
        assert_eq!(loaded.balance, Money::from_major(1_500));
        assert_eq!(loaded.name, "Ana Reyes");
    }

    #[test]
    fn test_funds_pool_defaults_to_zero() {
        let store = MemoryStore::new();
        assert_eq!(funds_pool(&store).unwrap(), Money::ZERO);

        save_funds_pool(&store, Money::from_major(50_000)).unwrap();
        assert_eq!(funds_pool(&store).unwrap(), Money::from_major(50_000));
    }

    #[test]
    fn test_funds_snapshots_are_append_only() {
        let store = MemoryStore::new();
        let at = NaiveDate::from_ymd_opt(2025, 8, 22)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        append_funds_snapshot(&store, at, Money::from_major(49_700)).unwrap();
        let err = append_funds_snapshot(&store, at, Money::from_major(49_000)).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));
    }

    #[test]
    fn test_member_loans_sorted() {
        let store = MemoryStore::new();
        for id in ["300002", "100001"] {
            let loan = Loan {
                loan_id: id.to_string(),
                member_id: "m-001".to_string(),
                loan_amount: Money::from_major(10_000),
                interest: Some(Money::from_major(600)),
                total_monthly_payment: Money::from_major(2_000),
                term_months: 6,
                due_date: Some("2025-08-20".into()),
                next_due_date: None,
            };
            save_loan(&store, &loan).unwrap();
        }
        let loans = member_loans(&store, "m-001").unwrap();
        assert_eq!(loans.len(), 2);
        assert_eq!(loans[0].loan_id, "100001");
        assert!(member_loans(&store, "m-404").unwrap().is_empty());
    }
}
