use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::repository;
use crate::store::Store;
use crate::types::{Application, Domain, Outcome, Status};

/// one page of a flattened collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number this slice came from
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// the source collection itself holds no records
    pub empty: bool,
    /// the filter produced zero results from a non-empty source
    pub no_match: bool,
}

/// flattened row for external consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedRecord {
    pub member_id: String,
    pub transaction_id: String,
    pub account_name: String,
    pub amount: Money,
    pub status: Status,
    pub submitted_display: String,
    pub decided_display: Option<String>,
    pub sort_key: NaiveDateTime,
}

impl ListedRecord {
    fn from_application(app: Application) -> Self {
        Self {
            member_id: app.header.member_id,
            transaction_id: app.header.transaction_id,
            account_name: app.header.channel_account_name,
            amount: app.header.amount,
            status: app.header.status,
            submitted_display: app.header.submitted_display,
            decided_display: None,
            sort_key: app.header.submitted_at,
        }
    }

    fn from_outcome(outcome: Outcome) -> Self {
        let mut record = Self::from_application(outcome.application);
        record.decided_display = Some(outcome.resolution.date_display);
        record.sort_key = outcome.resolution.decided_at;
        record
    }

    fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.member_id.to_lowercase().contains(&needle)
            || self.transaction_id.to_lowercase().contains(&needle)
            || self.account_name.to_lowercase().contains(&needle)
    }
}

/// walk a member -> transaction -> document subtree into leaf documents
fn flatten(tree: Option<Value>) -> Vec<Value> {
    let Some(Value::Object(members)) = tree else {
        return Vec::new();
    };
    members
        .into_iter()
        .filter_map(|(_, txns)| match txns {
            Value::Object(txns) => Some(txns),
            _ => None,
        })
        .flat_map(|txns| txns.into_iter().map(|(_, doc)| doc))
        .collect()
}

/// flatten a nested per-member collection into one ordered, filterable,
/// paginated sequence
///
/// Records that fail to decode are skipped; this is a read-only display
/// path and one malformed document must not hide the rest.
pub fn list(
    store: &impl Store,
    config: &EngineConfig,
    domain: Domain,
    status: Status,
    filter: &str,
    page: usize,
) -> Result<Page<ListedRecord>> {
    let docs = match status {
        Status::Pending => flatten(repository::pending_tree(store, domain)?),
        Status::Approved | Status::Rejected => {
            flatten(repository::outcome_tree(store, domain, status)?)
        }
    };

    let mut records: Vec<ListedRecord> = docs
        .into_iter()
        .filter_map(|doc| match status {
            Status::Pending => serde_json::from_value::<Application>(doc)
                .ok()
                .filter(|a| a.header.status == Status::Pending)
                .map(ListedRecord::from_application),
            _ => serde_json::from_value::<Outcome>(doc)
                .ok()
                .map(ListedRecord::from_outcome),
        })
        .collect();
    records.sort_by(|a, b| {
        (a.sort_key, &a.member_id, &a.transaction_id)
            .cmp(&(b.sort_key, &b.member_id, &b.transaction_id))
    });

    let empty = records.is_empty();
    let filter = filter.trim();
    let filtered: Vec<ListedRecord> = if filter.is_empty() {
        records
    } else {
        records.into_iter().filter(|r| r.matches(filter)).collect()
    };
    let no_match = !empty && !filter.is_empty() && filtered.is_empty();

    let total_items = filtered.len();
    let size = config.page_size.max(1);
    let total_pages = total_items.div_ceil(size);
    let page = page.max(1);
    let start = (page - 1).saturating_mul(size).min(total_items);
    let end = (start + size).min(total_items);

    Ok(Page {
        items: filtered[start..end].to_vec(),
        page,
        total_pages,
        total_items,
        empty,
        no_match,
    })
}
