// JSON file backend
//
// The whole ledger lives in one document:
//
//   { "periods": [ ...saved periods, oldest first... ], "draft": { ... } }
//
// A missing or empty file reads as an empty ledger. Writes go to a sibling
// temp file that is renamed over the original.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::entities::{Period, PeriodDraft};
use crate::error::Result;
use crate::repository::{DraftStore, PeriodRepository};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    #[serde(default)]
    periods: Vec<Period>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    draft: Option<PeriodDraft>,
}

pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileRepository { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<LedgerDocument> {
        if !self.path.exists() {
            return Ok(LedgerDocument::default());
        }

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(LedgerDocument::default());
        }

        let document: LedgerDocument = serde_json::from_str(&contents)?;
        tracing::debug!(
            path = %self.path.display(),
            periods = document.periods.len(),
            has_draft = document.draft.is_some(),
            "Loaded ledger document"
        );
        Ok(document)
    }

    fn write_document(&self, document: &LedgerDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), periods = document.periods.len(), "Wrote ledger document");
        Ok(())
    }

    fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut LedgerDocument),
    {
        let mut document = self.read_document()?;
        change(&mut document);
        self.write_document(&document)
    }
}

impl PeriodRepository for JsonFileRepository {
    fn load_all(&self) -> Result<Vec<Period>> {
        Ok(self.read_document()?.periods)
    }

    fn save_all(&self, periods: &[Period]) -> Result<()> {
        self.update(|doc| doc.periods = periods.to_vec())
    }

    fn clear(&self) -> Result<()> {
        self.update(|doc| doc.periods.clear())
    }
}

impl DraftStore for JsonFileRepository {
    fn load_draft(&self) -> Result<Option<PeriodDraft>> {
        Ok(self.read_document()?.draft)
    }

    fn save_draft(&self, draft: &PeriodDraft) -> Result<()> {
        self.update(|doc| doc.draft = Some(draft.clone()))
    }

    fn discard_draft(&self) -> Result<()> {
        self.update(|doc| doc.draft = None)
    }
}
