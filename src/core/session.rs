use std::collections::HashSet;
use std::time::Duration;

use tokio::time::sleep;

use crate::archive::Archive;
use crate::config::Categories;
use crate::console::{Console, Input};
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::models::Tweet;

/// Parent tweets rendered below a reply.
pub const MAX_THREAD_DEPTH: usize = 8;

const KEEP_BANNER: &str = r"
  _  __ _____  _____  ____
 | |/ /| ____|| ____||  _ \
 | ' / |  _|  |  _|  | |_) |
 | . \ | |___ | |___ |  __/
 |_|\_\|_____||_____||_|";

const DELETE_BANNER: &str = r"
  ____   _____  _      _____  _____  _____
 |  _ \ | ____|| |    | ____||_   _|| ____|
 | | | ||  _|  | |    |  _|    | |  |  _|
 | |_| || |___ | |___ | |___   | |  | |___
 |____/ |_____||_____||_____|  |_|  |_____|";

const CHOICES: &str = "
------------------------------------------

 ENTER - Keep tweet and read next
     X - Mark tweet to be deleted
     C - Continue without decision
     Q - Quit reading

==========================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Destroy,
    Defer,
    Quit,
}

impl Verdict {
    pub fn parse(input: &str) -> Self {
        match input.trim().to_uppercase().as_str() {
            "X" => Verdict::Destroy,
            "C" => Verdict::Defer,
            "Q" => Verdict::Quit,
            _ => Verdict::Keep,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Reviewing(usize),
    Advancing(usize),
    Done(SessionEnd),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Exhausted,
    Quit,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub kept: usize,
    pub marked: usize,
    pub deferred: usize,
    pub end: SessionEnd,
}

/// Walks a filtered list of tweets and records one decision per tweet.
pub struct BrowsingSession<'a> {
    pub archive: &'a Archive,
    pub ledger: &'a mut Ledger,
    pub categories: &'a Categories,
    pub screen_name: &'a str,
    pub confirm_delay: Duration,
}

impl<'a> BrowsingSession<'a> {
    /// `banner` is redrawn above every tweet so the counters stay visible.
    pub async fn run<C, F>(
        &mut self,
        console: &mut C,
        tweets: &[&Tweet],
        banner: F,
    ) -> Result<SessionReport, LedgerError>
    where
        C: Console,
        F: Fn(&Ledger) -> String,
    {
        let mut report = SessionReport {
            kept: 0,
            marked: 0,
            deferred: 0,
            end: SessionEnd::Exhausted,
        };
        let mut state = if tweets.is_empty() {
            SessionState::Done(SessionEnd::Exhausted)
        } else {
            SessionState::Reviewing(0)
        };

        report.end = loop {
            state = match state {
                SessionState::Reviewing(position) => {
                    let tweet = tweets[position];
                    console.clear();
                    console.show(&banner(&*self.ledger));
                    console.show("");
                    console.show(&render_tweet(self.archive, tweet, self.screen_name));
                    console.show(CHOICES);

                    let verdict = match console.ask("\n>").await {
                        Input::Line(line) => Some(Verdict::parse(&line)),
                        Input::Closed => Some(Verdict::Quit),
                        Input::Interrupted => None,
                    };

                    match verdict {
                        None => {
                            console.show("Aborted.");
                            SessionState::Done(SessionEnd::Interrupted)
                        }
                        Some(Verdict::Destroy) => {
                            self.ledger.decide(tweet.id, &self.categories.destroy)?;
                            report.marked += 1;
                            self.confirm(console, &banner, DELETE_BANNER).await;
                            SessionState::Advancing(position)
                        }
                        Some(Verdict::Defer) => {
                            report.deferred += 1;
                            console.show("LATER");
                            SessionState::Advancing(position)
                        }
                        Some(Verdict::Quit) => SessionState::Done(SessionEnd::Quit),
                        Some(Verdict::Keep) => {
                            self.ledger.decide(tweet.id, &self.categories.keep)?;
                            report.kept += 1;
                            self.confirm(console, &banner, KEEP_BANNER).await;
                            SessionState::Advancing(position)
                        }
                    }
                }
                SessionState::Advancing(position) if position + 1 < tweets.len() => {
                    SessionState::Reviewing(position + 1)
                }
                SessionState::Advancing(_) => SessionState::Done(SessionEnd::Exhausted),
                SessionState::Done(end) => break end,
            };
        };

        tracing::debug!(
            kept = report.kept,
            marked = report.marked,
            deferred = report.deferred,
            "reading session finished"
        );
        Ok(report)
    }

    async fn confirm<C, F>(&self, console: &mut C, banner: &F, confirmation: &str)
    where
        C: Console,
        F: Fn(&Ledger) -> String,
    {
        console.clear();
        console.show(&format!("{}{}", banner(&*self.ledger), confirmation));
        if !self.confirm_delay.is_zero() {
            sleep(self.confirm_delay).await;
        }
    }
}

/// Status link, classification lines, body, and the chain of parents found in the archive.
pub fn render_tweet(archive: &Archive, tweet: &Tweet, screen_name: &str) -> String {
    let mut out = render_single(tweet, screen_name);
    let mut visited = HashSet::from([tweet.id]);
    let mut current = tweet;

    for _ in 0..MAX_THREAD_DEPTH {
        let Some(parent_id) = current.in_reply_to_id else {
            break;
        };
        if !visited.insert(parent_id) {
            break;
        }
        let Some(parent) = archive.find(parent_id) else {
            break;
        };
        out.push_str("\n\n__in_reply_to:\n");
        out.push_str(&render_single(parent, screen_name));
        current = parent;
    }
    out
}

fn render_single(tweet: &Tweet, screen_name: &str) -> String {
    let mut out = format!(
        "{} https://twitter.com/{}/status/{}",
        tweet.timestamp, screen_name, tweet.id
    );
    if tweet.is_retweet() {
        if let Some(original) = tweet.retweeted_status_id {
            out.push_str(&format!("\n  retweeted: {}", original));
        }
    }
    if let Some(parent) = tweet.in_reply_to_id {
        out.push_str(&format!("\n  replies to: {}", parent));
    }
    out.push_str("\n\n");
    out.push_str(&tweet.text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use crate::models::RawTweet;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn tweet(id: u64, text: &str, reply: Option<u64>) -> Tweet {
        Tweet::from_raw(RawTweet {
            id: id.to_string(),
            timestamp: "2525-01-02 12:34:56".to_string(),
            text: text.to_string(),
            in_reply_to_id: reply.map(|id| id.to_string()),
            ..RawTweet::default()
        })
        .unwrap()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        archive: Archive,
        ledger: Ledger,
        categories: Categories,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let categories = Categories::default();
        let ledger = Ledger::open(dir.path(), categories.all()).unwrap();
        Fixture {
            _dir: dir,
            archive: Archive {
                tweets: vec![
                    tweet(1, "one", None),
                    tweet(2, "two", Some(1)),
                    tweet(3, "three", None),
                    tweet(4, "four", None),
                ],
            },
            ledger,
            categories,
        }
    }

    async fn browse(fixture: &mut Fixture, script: Vec<Input>) -> (SessionReport, ScriptedConsole) {
        let tweets: Vec<&Tweet> = fixture.archive.tweets.iter().collect();
        let mut console = ScriptedConsole::from_inputs(script);
        let mut session = BrowsingSession {
            archive: &fixture.archive,
            ledger: &mut fixture.ledger,
            categories: &fixture.categories,
            screen_name: "someone",
            confirm_delay: Duration::ZERO,
        };
        let report = session
            .run(&mut console, &tweets, |ledger| format!("kept {}", ledger.count("sweep.keep")))
            .await
            .unwrap();
        (report, console)
    }

    fn line(text: &str) -> Input {
        Input::Line(text.to_string())
    }

    #[test]
    fn test_verdict_parse() {
        assert_eq!(Verdict::parse("x"), Verdict::Destroy);
        assert_eq!(Verdict::parse(" C "), Verdict::Defer);
        assert_eq!(Verdict::parse("q"), Verdict::Quit);
        assert_eq!(Verdict::parse(""), Verdict::Keep);
        assert_eq!(Verdict::parse("ENTER"), Verdict::Keep);
    }

    #[tokio::test]
    async fn test_mixed_decisions() {
        let mut fixture = fixture();
        let (report, console) =
            browse(&mut fixture, vec![line("C"), line("X"), line(""), line("x")]).await;

        assert_eq!(
            report,
            SessionReport {
                kept: 1,
                marked: 2,
                deferred: 1,
                end: SessionEnd::Exhausted
            }
        );
        assert!(!fixture.ledger.is_decided(1, None));
        assert!(fixture.ledger.is_decided(2, Some("sweep.destroy")));
        assert!(fixture.ledger.is_decided(3, Some("sweep.keep")));
        assert!(fixture.ledger.is_decided(4, Some("sweep.destroy")));
        assert!(console.transcript.contains("LATER"));
        assert!(console.transcript.contains("|_____||_____||_____|"));
    }

    #[tokio::test]
    async fn test_quit_leaves_rest_unreviewed() {
        let mut fixture = fixture();
        let (report, _) = browse(&mut fixture, vec![line(""), line("Q"), line("X")]).await;

        assert_eq!(report.end, SessionEnd::Quit);
        assert_eq!(report.kept, 1);
        assert_eq!(fixture.ledger.count("sweep.keep"), 1);
        assert_eq!(fixture.ledger.count("sweep.destroy"), 0);
    }

    #[tokio::test]
    async fn test_interrupt_and_closed_input() {
        let mut fixture = fixture();
        let (report, console) = browse(&mut fixture, vec![line("X"), Input::Interrupted]).await;
        assert_eq!(report.end, SessionEnd::Interrupted);
        assert_eq!(report.marked, 1);
        assert!(console.transcript.contains("Aborted."));

        let (report, _) = browse(&mut fixture, vec![]).await;
        assert_eq!(report.end, SessionEnd::Quit);
    }

    #[tokio::test]
    async fn test_empty_list() {
        let mut fixture = fixture();
        let mut console = ScriptedConsole::new(["X"]);
        let mut session = BrowsingSession {
            archive: &fixture.archive,
            ledger: &mut fixture.ledger,
            categories: &fixture.categories,
            screen_name: "someone",
            confirm_delay: Duration::ZERO,
        };
        let report = session.run(&mut console, &[], |_| String::new()).await.unwrap();
        assert_eq!(report.end, SessionEnd::Exhausted);
        assert_eq!(console.remaining(), 1);
    }

    #[test]
    fn test_render_reply_chain() {
        let fixture = fixture();
        let rendered = render_tweet(&fixture.archive, &fixture.archive.tweets[1], "someone");
        assert!(rendered.starts_with("2525-01-02 12:34:56 https://twitter.com/someone/status/2"));
        assert!(rendered.contains("replies to: 1"));
        assert!(rendered.contains(
            "__in_reply_to:\n2525-01-02 12:34:56 https://twitter.com/someone/status/1"
        ));
    }

    #[test]
    fn test_render_cycle_terminates() {
        let archive = Archive {
            tweets: vec![tweet(1, "one", Some(2)), tweet(2, "two", Some(1))],
        };
        let rendered = render_tweet(&archive, &archive.tweets[0], "someone");
        assert_eq!(rendered.matches("__in_reply_to:").count(), 1);

        let self_reply = Archive {
            tweets: vec![tweet(7, "me", Some(7))],
        };
        let rendered = render_tweet(&self_reply, &self_reply.tweets[0], "someone");
        assert_eq!(rendered.matches("__in_reply_to:").count(), 0);
    }

    #[test]
    fn test_render_depth_is_capped() {
        let tweets: Vec<Tweet> = (1..=20)
            .map(|id| tweet(id, "chain", (id > 1).then(|| id - 1)))
            .collect();
        let archive = Archive { tweets };
        let rendered = render_tweet(&archive, &archive.tweets[19], "someone");
        assert_eq!(rendered.matches("__in_reply_to:").count(), MAX_THREAD_DEPTH);
    }
}
