use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::error::ArchiveError;
use crate::models::{RawTweet, Tweet};

pub const CSV_FILE: &str = "tweets.csv";
const JS_FILES: [&str; 2] = ["data/tweets.js", "data/tweet.js"];

/// All tweets of one archive, in source file order.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    pub tweets: Vec<Tweet>,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    tweet_id: String,
    #[serde(default)]
    in_reply_to_status_id: Option<String>,
    #[serde(default)]
    in_reply_to_user_id: Option<String>,
    timestamp: String,
    #[serde(default)]
    source: Option<String>,
    text: String,
    #[serde(default)]
    retweeted_status_id: Option<String>,
    #[serde(default)]
    expanded_urls: Option<String>,
}

impl From<CsvRow> for RawTweet {
    fn from(row: CsvRow) -> Self {
        RawTweet {
            id: row.tweet_id,
            timestamp: row.timestamp,
            text: row.text,
            source: row.source,
            expanded_urls: row.expanded_urls,
            in_reply_to_id: row.in_reply_to_status_id,
            in_reply_to_user_id: row.in_reply_to_user_id,
            retweeted_status_id: row.retweeted_status_id,
            retweet_marker: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsEntry {
    tweet: JsTweet,
}

#[derive(Debug, Deserialize)]
struct JsTweet {
    id_str: String,
    created_at: String,
    full_text: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    in_reply_to_status_id_str: Option<String>,
    #[serde(default)]
    in_reply_to_user_id_str: Option<String>,
    #[serde(default)]
    entities: JsEntities,
}

#[derive(Debug, Default, Deserialize)]
struct JsEntities {
    #[serde(default)]
    urls: Vec<JsUrl>,
}

#[derive(Debug, Deserialize)]
struct JsUrl {
    #[serde(default)]
    expanded_url: Option<String>,
}

impl From<JsTweet> for RawTweet {
    fn from(tweet: JsTweet) -> Self {
        let urls: Vec<String> = tweet
            .entities
            .urls
            .into_iter()
            .filter_map(|url| url.expanded_url)
            .collect();
        RawTweet {
            retweet_marker: tweet.full_text.starts_with("RT @"),
            id: tweet.id_str,
            timestamp: tweet.created_at,
            text: tweet.full_text,
            source: tweet.source,
            expanded_urls: (!urls.is_empty()).then(|| urls.join(",")),
            in_reply_to_id: tweet.in_reply_to_status_id_str,
            in_reply_to_user_id: tweet.in_reply_to_user_id_str,
            retweeted_status_id: None,
        }
    }
}

impl Archive {
    /// Loads the archive found in `work_dir`, legacy `tweets.csv` first.
    pub fn load(work_dir: &Path) -> Result<Self, ArchiveError> {
        if !work_dir.is_dir() {
            return Err(ArchiveError::MissingDirectory(work_dir.to_path_buf()));
        }

        let csv_path = work_dir.join(CSV_FILE);
        let tweets = if csv_path.is_file() {
            Self::read_csv(&csv_path)?
        } else if let Some(js_path) = JS_FILES
            .iter()
            .map(|name| work_dir.join(name))
            .find(|path| path.is_file())
        {
            Self::read_js(&js_path)?
        } else {
            return Err(ArchiveError::MissingArchiveFile(csv_path));
        };

        tracing::debug!(count = tweets.len(), dir = %work_dir.display(), "archive loaded");
        Ok(Archive { tweets })
    }

    fn read_csv(path: &Path) -> Result<Vec<Tweet>, ArchiveError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut tweets = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            tweets.push(Tweet::from_raw(row?.into())?);
        }
        Ok(tweets)
    }

    fn read_js(path: &Path) -> Result<Vec<Tweet>, ArchiveError> {
        let data = fs::read_to_string(path).map_err(|source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // `window.YTD.tweets.part0 = [ ... ]`
        let json = data.split_once('=').map(|(_, rest)| rest).unwrap_or(&data);
        let entries: Vec<JsEntry> = serde_json::from_str(json.trim())?;
        entries
            .into_iter()
            .map(|entry| Tweet::from_raw(entry.tweet.into()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tweets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweets.is_empty()
    }

    /// First tweet with the given id, in source order.
    pub fn find(&self, id: u64) -> Option<&Tweet> {
        self.tweets.iter().find(|tweet| tweet.id == id)
    }

    /// Same as [`Archive::find`] for ids kept in their stored string form.
    pub fn find_subject(&self, subject: &str) -> Option<&Tweet> {
        subject.trim().parse().ok().and_then(|id| self.find(id))
    }

    /// Distinct `YYYY-MM` prefixes in ascending order.
    pub fn months(&self) -> Vec<&str> {
        let months: BTreeSet<&str> = self.tweets.iter().map(Tweet::month).collect();
        months.into_iter().collect()
    }

    pub fn index(&self) -> String {
        self.months().join(", ")
    }
}
