use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SyncError};
use crate::filter::{ID_FIELD, PageRecord, SCRIPT_FIELD, SUMMARY_FIELD, TITLE_FIELD, strip};
use crate::remote::PageApi;
use crate::store::{IndexEntry, PageIndex, PageStore};

#[derive(Debug, Clone, Serialize)]
pub struct ReloadedPage {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReloadReport {
    pub pages: Vec<ReloadedPage>,
    pub request_count: usize,
}

/// Rebuilds the whole local cache from the remote listing.
///
/// Pages are written in the order the server returns them and the index is
/// written last. A failure part-way leaves earlier page directories on disk
/// with the previous (or no) index.
pub fn reload_pages<A: PageApi>(store: &PageStore, api: &mut A) -> Result<ReloadReport> {
    let listing = api.list_pages()?;
    if listing.is_empty() {
        return Err(SyncError::EmptyListing);
    }
    tracing::info!("reloading {} pages into {}", listing.len(), store.root().display());

    let mut index = PageIndex::default();
    let mut pages = Vec::with_capacity(listing.len());
    for record in &listing {
        let id = required_str(record, ID_FIELD)?;
        let script = required_str(record, SCRIPT_FIELD)?;
        let entry = IndexEntry {
            title: required_str(record, TITLE_FIELD)?.to_string(),
            summary: record
                .get(SUMMARY_FIELD)
                .and_then(Value::as_str)
                .map(str::to_string),
        };

        store.write_page(id, &strip(record, &[SCRIPT_FIELD]), script)?;

        pages.push(ReloadedPage {
            id: id.to_string(),
            title: entry.title.clone(),
        });
        index.insert(id, entry);
    }

    store.write_index(&index)?;

    Ok(ReloadReport {
        pages,
        request_count: api.request_count(),
    })
}

fn required_str<'a>(record: &'a PageRecord, field: &'static str) -> Result<&'a str> {
    record
        .get(field)
        .and_then(Value::as_str)
        .ok_or(SyncError::MissingField { field })
}
