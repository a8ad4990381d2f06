use serde::Serialize;
use serde_json::Value;
use similar::TextDiff;

use crate::error::Result;
use crate::filter::{PageRecord, SCRIPT_FIELD, strip};
use crate::remote::{PAGE_ID_FIELD, PageApi, TOKEN_FIELD};
use crate::store::PageStore;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeployOutcome {
    Unchanged,
    Updated,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub page_id: String,
    pub outcome: DeployOutcome,
    /// Top-level fields whose values differ between the local copy and the
    /// server. Informational only.
    pub changed_fields: Vec<String>,
    /// Unified diff of the script, server copy first, when the script changed.
    pub script_diff: Option<String>,
    pub request_count: usize,
}

/// Pushes the cached page `page_id` (metadata plus the edited script) if it
/// differs from what the server holds.
///
/// Both sides are compared after [`strip`], so only user-editable fields can
/// trigger a write. Any difference replaces the whole remote page. The local
/// `content.json` is not refreshed afterwards.
pub fn deploy_page<A: PageApi>(
    store: &PageStore,
    api: &mut A,
    token: &str,
    page_id: &str,
) -> Result<DeployReport> {
    let (mut record, script) = store.read_page(page_id)?;
    record.insert(SCRIPT_FIELD.to_string(), Value::String(script));
    let local = strip(&record, &[]);

    let remote = strip(&api.get_page(page_id)?, &[]);

    if local == remote {
        tracing::info!("page {page_id} matches the server copy");
        return Ok(DeployReport {
            page_id: page_id.to_string(),
            outcome: DeployOutcome::Unchanged,
            changed_fields: Vec::new(),
            script_diff: None,
            request_count: api.request_count(),
        });
    }

    let changed_fields = changed_fields(&local, &remote);
    let script_diff = script_diff(&local, &remote);
    tracing::info!(
        "page {page_id} differs from the server copy in: {}",
        changed_fields.join(", ")
    );

    let mut payload = local;
    payload.insert(TOKEN_FIELD.to_string(), Value::String(token.to_string()));
    payload.insert(PAGE_ID_FIELD.to_string(), Value::String(page_id.to_string()));
    api.update_page(&payload)?;

    Ok(DeployReport {
        page_id: page_id.to_string(),
        outcome: DeployOutcome::Updated,
        changed_fields,
        script_diff,
        request_count: api.request_count(),
    })
}

fn changed_fields(local: &PageRecord, remote: &PageRecord) -> Vec<String> {
    let mut fields: Vec<String> = local
        .iter()
        .filter(|(key, value)| remote.get(key.as_str()) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();
    fields.extend(
        remote
            .keys()
            .filter(|key| !local.contains_key(key.as_str()))
            .cloned(),
    );
    fields
}

fn script_diff(local: &PageRecord, remote: &PageRecord) -> Option<String> {
    let local_script = local.get(SCRIPT_FIELD).and_then(Value::as_str).unwrap_or("");
    let remote_script = remote.get(SCRIPT_FIELD).and_then(Value::as_str).unwrap_or("");
    if local_script == remote_script {
        return None;
    }
    Some(
        TextDiff::from_lines(remote_script, local_script)
            .unified_diff()
            .context_radius(3)
            .header("remote", "local")
            .to_string(),
    )
}
