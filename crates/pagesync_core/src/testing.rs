//! In-memory [`PageApi`] and record fixtures shared by the workflow tests.

use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::error::{Result, SyncError};
use crate::filter::PageRecord;
use crate::remote::PageApi;

#[derive(Default)]
pub(crate) struct MockApi {
    pub listing: Vec<PageRecord>,
    pub remote_pages: Vec<PageRecord>,
    pub updates: Vec<PageRecord>,
    /// Panic on any update call.
    pub forbid_updates: bool,
    pub request_count: usize,
}

impl PageApi for MockApi {
    fn list_pages(&mut self) -> Result<Vec<PageRecord>> {
        self.request_count += 1;
        Ok(self.listing.clone())
    }

    fn get_page(&mut self, id: &str) -> Result<PageRecord> {
        self.request_count += 1;
        self.remote_pages
            .iter()
            .find(|page| page.get("id").and_then(Value::as_str) == Some(id))
            .cloned()
            .ok_or_else(|| SyncError::UnexpectedStatus {
                endpoint: "/pages/show".to_string(),
                expected: StatusCode::OK,
                status: StatusCode::BAD_REQUEST,
                body: format!("no such page {id}"),
            })
    }

    fn update_page(&mut self, payload: &PageRecord) -> Result<()> {
        self.request_count += 1;
        assert!(
            !self.forbid_updates,
            "update_page must not be called in this scenario"
        );
        self.updates.push(payload.clone());
        Ok(())
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

pub(crate) fn remote_page(id: &str, title: &str, script: &str) -> PageRecord {
    json!({
        "id": id,
        "createdAt": "2024-01-01T00:00:00.000Z",
        "updatedAt": "2024-02-01T00:00:00.000Z",
        "userId": "u1",
        "user": { "id": "u1", "username": "alice" },
        "title": title,
        "name": title.to_lowercase(),
        "summary": format!("{title} summary"),
        "content": [{ "type": "text", "text": "hello" }],
        "variables": [],
        "script": script,
        "isPublic": true,
        "likedCount": 0,
        "attachedFiles": [],
        "eyeCatchingImageId": null,
        "eyeCatchingImage": null,
        "isLiked": false
    })
    .as_object()
    .cloned()
    .expect("object")
}
