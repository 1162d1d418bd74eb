use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::LedgerError;

/// Persistent decisions: one set of subjects per category, one file per category.
///
/// Changes live in memory until [`Ledger::commit`] writes every category back
/// to `<work_dir>/<category>`.
#[derive(Debug)]
pub struct Ledger {
    work_dir: PathBuf,
    decisions: BTreeMap<String, HashSet<String>>,
}

impl Ledger {
    /// Touches and loads the file of every category. Existing files are never truncated here.
    pub fn open<I, S>(work_dir: &Path, categories: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut decisions = BTreeMap::new();
        for category in categories {
            let category = category.into();
            let path = work_dir.join(&category);
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| LedgerError::Io {
                    path: path.clone(),
                    source,
                })?;
            let data = fs::read_to_string(&path).map_err(|source| LedgerError::Io {
                path: path.clone(),
                source,
            })?;
            let subjects: HashSet<String> = data
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            tracing::debug!(category = %category, count = subjects.len(), "decisions loaded");
            decisions.insert(category, subjects);
        }

        Ok(Ledger {
            work_dir: work_dir.to_path_buf(),
            decisions,
        })
    }

    fn path(&self, category: &str) -> PathBuf {
        self.work_dir.join(category)
    }

    fn subjects_mut(&mut self, category: &str) -> Result<&mut HashSet<String>, LedgerError> {
        self.decisions
            .get_mut(category)
            .ok_or_else(|| LedgerError::UnknownCategory(category.to_string()))
    }

    /// Records `subject` under `category`. Re-deciding is a no-op.
    pub fn decide(&mut self, subject: impl Display, category: &str) -> Result<(), LedgerError> {
        self.subjects_mut(category)?.insert(subject.to_string());
        Ok(())
    }

    /// Drops `subject` from `category`; absent subjects are ignored.
    pub fn revoke(&mut self, subject: impl Display, category: &str) -> Result<(), LedgerError> {
        self.subjects_mut(category)?.remove(&subject.to_string());
        Ok(())
    }

    pub fn count(&self, category: &str) -> usize {
        self.decisions.get(category).map_or(0, HashSet::len)
    }

    /// With a category: member of exactly that category. Without: member of any category.
    pub fn is_decided(&self, subject: impl Display, category: Option<&str>) -> bool {
        let subject = subject.to_string();
        match category {
            Some(category) => self
                .decisions
                .get(category)
                .is_some_and(|subjects| subjects.contains(&subject)),
            None => self
                .decisions
                .values()
                .any(|subjects| subjects.contains(&subject)),
        }
    }

    /// Snapshot of a category's members, in no particular order.
    pub fn subjects(&self, category: &str) -> Vec<String> {
        self.decisions
            .get(category)
            .map(|subjects| subjects.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Overwrites every category file with the in-memory set.
    pub fn commit(&self) -> Result<(), LedgerError> {
        for (category, subjects) in &self.decisions {
            let path = self.path(category);
            let mut lines: Vec<&str> = subjects.iter().map(String::as_str).collect();
            lines.sort_unstable();
            let mut data = lines.join("\n");
            if !data.is_empty() {
                data.push('\n');
            }
            fs::write(&path, data).map_err(|source| LedgerError::Io { path, source })?;
        }
        tracing::info!(
            categories = self.decisions.len(),
            dir = %self.work_dir.display(),
            "decisions committed"
        );
        Ok(())
    }
}
