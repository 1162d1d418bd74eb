use crate::archive::Archive;
use crate::console::{Console, Input};
use crate::ledger::Ledger;
use crate::models::Tweet;

/// Time span prefix used for empty input; no timestamp starts with it.
const NO_MATCH_PREFIX: &str = "-";

/// Where the initial list of tweets to read comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Search(String),
    TimeSpan(String),
}

impl Selection {
    pub fn time_span(prefix: &str) -> Self {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            Selection::TimeSpan(NO_MATCH_PREFIX.to_string())
        } else {
            Selection::TimeSpan(prefix.to_string())
        }
    }

    /// Candidates in archive order.
    pub fn candidates<'a>(&self, archive: &'a Archive) -> Vec<&'a Tweet> {
        match self {
            Selection::All => archive.tweets.iter().collect(),
            Selection::Search(text) => {
                let needle = text.trim().to_lowercase();
                archive
                    .tweets
                    .iter()
                    .filter(|tweet| tweet.text.to_lowercase().contains(&needle))
                    .collect()
            }
            Selection::TimeSpan(prefix) => archive
                .tweets
                .iter()
                .filter(|tweet| tweet.timestamp.starts_with(prefix.as_str()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AlreadyDecided,
    Retweets,
    Replies,
    PlainTweets,
}

impl Stage {
    /// Fixed order in which stages are offered.
    pub const ALL: [Stage; 4] = [
        Stage::AlreadyDecided,
        Stage::Retweets,
        Stage::Replies,
        Stage::PlainTweets,
    ];

    pub fn default_on(self) -> bool {
        matches!(self, Stage::AlreadyDecided | Stage::Retweets)
    }

    pub fn question(self) -> &'static str {
        match self {
            Stage::AlreadyDecided => "Filter already read tweets?",
            Stage::Retweets => "Filter retweets?",
            Stage::Replies => "Filter replies?",
            Stage::PlainTweets => "Filter tweets?",
        }
    }

    pub fn rejects(self, tweet: &Tweet, ledger: &Ledger) -> bool {
        match self {
            Stage::AlreadyDecided => ledger.is_decided(tweet.id, None),
            Stage::Retweets => tweet.is_retweet(),
            Stage::Replies => tweet.is_reply(),
            Stage::PlainTweets => tweet.is_plain(),
        }
    }

    pub fn apply(self, candidates: &mut Vec<&Tweet>, ledger: &Ledger) {
        candidates.retain(|tweet| !self.rejects(tweet, ledger));
    }
}

/// Which stages are switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterPlan {
    pub already_decided: bool,
    pub retweets: bool,
    pub replies: bool,
    pub plain_tweets: bool,
}

impl Default for FilterPlan {
    fn default() -> Self {
        FilterPlan {
            already_decided: Stage::AlreadyDecided.default_on(),
            retweets: Stage::Retweets.default_on(),
            replies: Stage::Replies.default_on(),
            plain_tweets: Stage::PlainTweets.default_on(),
        }
    }
}

impl FilterPlan {
    pub fn none() -> Self {
        FilterPlan {
            already_decided: false,
            retweets: false,
            replies: false,
            plain_tweets: false,
        }
    }

    pub fn is_enabled(&self, stage: Stage) -> bool {
        match stage {
            Stage::AlreadyDecided => self.already_decided,
            Stage::Retweets => self.retweets,
            Stage::Replies => self.replies,
            Stage::PlainTweets => self.plain_tweets,
        }
    }

    pub fn set(&mut self, stage: Stage, enabled: bool) {
        match stage {
            Stage::AlreadyDecided => self.already_decided = enabled,
            Stage::Retweets => self.retweets = enabled,
            Stage::Replies => self.replies = enabled,
            Stage::PlainTweets => self.plain_tweets = enabled,
        }
    }

    /// Applies the enabled stages in order; relative order of the survivors is kept.
    ///
    /// Stages are plain predicates, so applying a plan twice changes nothing.
    pub fn apply(&self, candidates: &mut Vec<&Tweet>, ledger: &Ledger) {
        for stage in Stage::ALL {
            if candidates.is_empty() {
                break;
            }
            if self.is_enabled(stage) {
                stage.apply(candidates, ledger);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Every question was answered or skipped; carries the stages switched on.
    Filtered(FilterPlan),
    Interrupted,
    Closed,
}

/// Asks about every stage and filters as answered. Stops asking once nothing is left.
pub async fn confirm_filters<C: Console>(
    console: &mut C,
    banner: &str,
    candidates: &mut Vec<&Tweet>,
    ledger: &Ledger,
) -> FilterOutcome {
    let mut plan = FilterPlan::none();
    for (position, stage) in Stage::ALL.into_iter().enumerate() {
        if candidates.is_empty() {
            break;
        }
        console.clear();
        console.show(banner);
        if position == 0 {
            console.show(&format!("\nHaving {} tweets to read.", candidates.len()));
        } else {
            console.show(&format!("\nStill {} tweets...", candidates.len()));
        }
        let default = if stage.default_on() { "Y" } else { "N" };
        console.show(&format!("{} [y|n] {}", stage.question(), default));

        let enabled = match console.ask("?").await {
            Input::Interrupted => return FilterOutcome::Interrupted,
            Input::Closed => return FilterOutcome::Closed,
            Input::Line(line) => match line.to_uppercase().as_str() {
                "Y" => true,
                "N" => false,
                _ => stage.default_on(),
            },
        };
        plan.set(stage, enabled);
        plan.apply(candidates, ledger);
    }
    FilterOutcome::Filtered(plan)
}
