use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::error::{Result, SyncError, io_err};
use crate::filter::{PageRecord, SCRIPT_FIELD};

pub const INDEX_FILENAME: &str = "pages.json";
pub const CONTENT_FILENAME: &str = "content.json";
pub const SCRIPT_FILENAME: &str = "script.is";

/// Listing data for one page. Only used for display, never sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub title: String,
    pub summary: Option<String>,
}

/// Page id to [`IndexEntry`], kept in the order the server listed the pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageIndex {
    entries: Vec<(String, IndexEntry)>,
}

impl PageIndex {
    pub fn push(&mut self, id: impl Into<String>, entry: IndexEntry) {
        self.entries.push((id.into(), entry));
    }

    /// Like [`PageIndex::push`], but an id already present keeps its
    /// position and takes the new entry.
    pub fn insert(&mut self, id: impl Into<String>, entry: IndexEntry) {
        let id = id.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = entry,
            None => self.entries.push((id, entry)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Id at a zero-based position in listing order.
    pub fn id_at(&self, position: usize) -> Option<&str> {
        self.entries.get(position).map(|(id, _)| id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == id)
            .map(|(_, entry)| entry)
    }
}

impl Serialize for PageIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, entry) in &self.entries {
            map.serialize_entry(id, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PageIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut index = PageIndex::default();
        for (id, value) in raw {
            let entry = IndexEntry::deserialize(value)
                .map_err(|error| D::Error::custom(format!("index entry {id}: {error}")))?;
            index.push(id, entry);
        }
        Ok(index)
    }
}

/// Directory-per-page cache rooted at the configured pages directory:
///
/// ```text
/// <root>/pages.json
/// <root>/<id>/content.json
/// <root>/<id>/script.is
/// ```
#[derive(Debug, Clone)]
pub struct PageStore {
    root: PathBuf,
}

impl PageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILENAME)
    }

    pub fn page_dir(&self, id: &str) -> Result<PathBuf> {
        validate_page_id(id)?;
        Ok(self.root.join(id))
    }

    pub fn script_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.page_dir(id)?.join(SCRIPT_FILENAME))
    }

    pub fn content_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.page_dir(id)?.join(CONTENT_FILENAME))
    }

    /// Creates the root directory if needed. Returns `true` when it was created.
    pub fn ensure_root_directory(&self) -> Result<bool> {
        if self.root.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.root).map_err(|error| io_err(&self.root, error))?;
        tracing::debug!("created pages directory {}", self.root.display());
        Ok(true)
    }

    pub fn write_index(&self, index: &PageIndex) -> Result<()> {
        let path = self.index_path();
        write_json(&path, index)?;
        tracing::debug!("wrote index with {} entries to {}", index.len(), path.display());
        Ok(())
    }

    pub fn read_index(&self) -> Result<PageIndex> {
        let path = self.index_path();
        let content = fs::read_to_string(&path).map_err(|error| io_err(&path, error))?;
        serde_json::from_str(&content).map_err(|source| SyncError::Json { path, source })
    }

    /// Writes `script` verbatim to `script.is` and the rest of `record` to
    /// `content.json`. Anything else already inside the page directory is
    /// left alone.
    pub fn write_page(&self, id: &str, record: &PageRecord, script: &str) -> Result<()> {
        let page_dir = self.page_dir(id)?;
        fs::create_dir_all(&page_dir).map_err(|error| io_err(&page_dir, error))?;

        let script_path = page_dir.join(SCRIPT_FILENAME);
        fs::write(&script_path, script).map_err(|error| io_err(&script_path, error))?;

        let metadata: PageRecord = record
            .iter()
            .filter(|(key, _)| key.as_str() != SCRIPT_FIELD)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        write_json(&page_dir.join(CONTENT_FILENAME), &metadata)?;

        tracing::debug!("wrote page {id} to {}", page_dir.display());
        Ok(())
    }

    /// Loads the cached metadata and script fragment for `id`.
    pub fn read_page(&self, id: &str) -> Result<(PageRecord, String)> {
        let page_dir = self.page_dir(id)?;

        let script_path = page_dir.join(SCRIPT_FILENAME);
        let script = fs::read_to_string(&script_path).map_err(|error| io_err(&script_path, error))?;

        let content_path = page_dir.join(CONTENT_FILENAME);
        let content =
            fs::read_to_string(&content_path).map_err(|error| io_err(&content_path, error))?;
        let record = serde_json::from_str(&content).map_err(|source| SyncError::Json {
            path: content_path,
            source,
        })?;

        Ok((record, script))
    }
}

/// Page ids become directory names, so each must be exactly one normal
/// path component.
fn validate_page_id(id: &str) -> Result<()> {
    let mut components = Path::new(id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !id.contains(['/', '\\']) => Ok(()),
        _ => Err(SyncError::InvalidPageId { id: id.to_string() }),
    }
}

/// Four-space indented JSON with non-ASCII characters written as-is.
pub(crate) fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever emits valid UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let text = to_pretty_json(value)?;
    fs::write(path, text).map_err(|error| io_err(path, error))
}
