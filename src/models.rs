use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;

use crate::error::ArchiveError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TweetKind {
    Retweet,
    Reply,
    Plain,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tweet {
    pub id: u64,
    /// UTC, `YYYY-MM-DD HH:MM:SS`. Lexical order is chronological order.
    pub timestamp: String,
    pub text: String,
    pub source: String,
    pub expanded_urls: Option<String>,
    pub in_reply_to_id: Option<u64>,
    pub in_reply_to_user_id: Option<u64>,
    pub retweeted_status_id: Option<u64>,
    retweet: bool,
}

/// Loosely typed fields as they come out of an archive file.
#[derive(Debug, Default, Clone)]
pub struct RawTweet {
    pub id: String,
    pub timestamp: String,
    pub text: String,
    pub source: Option<String>,
    pub expanded_urls: Option<String>,
    pub in_reply_to_id: Option<String>,
    pub in_reply_to_user_id: Option<String>,
    pub retweeted_status_id: Option<String>,
    /// Set by formats that only flag retweets without naming the original.
    pub retweet_marker: bool,
}

impl Tweet {
    /// Validates a raw archive entry and builds the record.
    pub fn from_raw(raw: RawTweet) -> Result<Self, ArchiveError> {
        let id = parse_id(&raw.id, &raw.id, "id")?;
        let timestamp = normalize_timestamp(&raw.timestamp).ok_or_else(|| {
            ArchiveError::InvalidField {
                id: raw.id.clone(),
                field: "timestamp",
                value: raw.timestamp.clone(),
            }
        })?;
        let in_reply_to_id =
            parse_optional_id(&raw.id, raw.in_reply_to_id.as_deref(), "in_reply_to_status_id")?;
        let in_reply_to_user_id =
            parse_optional_id(&raw.id, raw.in_reply_to_user_id.as_deref(), "in_reply_to_user_id")?;
        let retweeted_status_id =
            parse_optional_id(&raw.id, raw.retweeted_status_id.as_deref(), "retweeted_status_id")?;

        Ok(Tweet {
            id,
            timestamp,
            text: raw.text,
            source: raw.source.unwrap_or_default(),
            expanded_urls: raw.expanded_urls.filter(|urls| !urls.trim().is_empty()),
            in_reply_to_id,
            in_reply_to_user_id,
            retweet: raw.retweet_marker || retweeted_status_id.is_some(),
            retweeted_status_id,
        })
    }

    /// Retweet signal wins over reply signal.
    pub fn kind(&self) -> TweetKind {
        if self.retweet {
            TweetKind::Retweet
        } else if self.in_reply_to_id.is_some() {
            TweetKind::Reply
        } else {
            TweetKind::Plain
        }
    }

    pub fn is_retweet(&self) -> bool {
        self.kind() == TweetKind::Retweet
    }

    pub fn is_reply(&self) -> bool {
        self.kind() == TweetKind::Reply
    }

    pub fn is_plain(&self) -> bool {
        self.kind() == TweetKind::Plain
    }

    pub fn month(&self) -> &str {
        self.timestamp.get(..7).unwrap_or(&self.timestamp)
    }
}

impl fmt::Display for Tweet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = self.timestamp.get(..10).unwrap_or(&self.timestamp);
        write!(f, "{} {}|{}", day, self.id, self.text)
    }
}

fn parse_id(tweet: &str, value: &str, field: &'static str) -> Result<u64, ArchiveError> {
    value.trim().parse().map_err(|_| ArchiveError::InvalidField {
        id: tweet.to_string(),
        field,
        value: value.to_string(),
    })
}

fn parse_optional_id(
    tweet: &str,
    value: Option<&str>,
    field: &'static str,
) -> Result<Option<u64>, ArchiveError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_id(tweet, value, field).map(Some),
    }
}

/// Brings every timestamp flavour found in archives to UTC `YYYY-MM-DD HH:MM:SS`.
pub fn normalize_timestamp(value: &str) -> Option<String> {
    let value = value.trim();
    let parsed = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .or_else(|_| DateTime::parse_from_str(value, "%a %b %d %H:%M:%S %z %Y"))
        .map(|dt| dt.with_timezone(&Utc).naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT))
        .ok()?;
    Some(parsed.format(TIMESTAMP_FORMAT).to_string())
}
