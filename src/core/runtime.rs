use crate::{
    archive::Archive,
    config::{Categories, Settings},
    console::{Console, Input},
    core::cancel::Cancellation,
    core::destroyer::{DestroyEvent, DestructionRunner, SkipReason, StatusDestroyer},
    core::selection::{confirm_filters, FilterOutcome, Selection},
    core::session::{BrowsingSession, SessionEnd},
    error::LedgerError,
    ledger::Ledger,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const MENU: &str = "
Menu:

  A - Read all tweets chronologically
  T - Read tweets by time span
  S - Search tweets for text
  X - Delete marked tweets
  Q - Quit

==========================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Counter banner shown above every screen.
pub fn banner(
    archive: &Archive,
    ledger: &Ledger,
    categories: &Categories,
    screen_name: &str,
) -> String {
    let total = archive.len();
    let unread = archive
        .tweets
        .iter()
        .filter(|tweet| !ledger.is_decided(tweet.id, None))
        .count();
    format!(
        "==========================================
Tweet Sweeper v{} - @{}'s tweet archive
------------------------------------------
 in archive .: {}
 unread .....: {}
 read .......: {}
 keeping ....: {}
 to destroy .: {}
 destroyed ..: {}
------------------------------------------",
        VERSION,
        screen_name,
        total,
        unread,
        total - unread,
        ledger.count(&categories.keep),
        ledger.count(&categories.destroy),
        ledger.count(&categories.destroyed),
    )
}

/// Asks the API who we are, or the user when offline. `None` if the user left.
pub async fn resolve_screen_name<C, D>(
    console: &mut C,
    destroyer: Option<&D>,
    cancel: &Cancellation,
) -> anyhow::Result<Option<String>>
where
    C: Console,
    D: StatusDestroyer,
{
    if let Some(destroyer) = destroyer {
        let screen_name = tokio::select! {
            user = destroyer.current_user() => user?,
            _ = cancel.cancelled() => {
                console.show("Aborted.");
                return Ok(None);
            }
        };
        console.show(&format!("Authenticated as: {}", screen_name));
        return Ok(Some(screen_name));
    }

    console.show("Please enter your Twitter username: (to display links)");
    match console.ask(">").await {
        Input::Line(line) => Ok(Some(line.trim_start_matches('@').to_string())),
        Input::Interrupted | Input::Closed => Ok(None),
    }
}

/// Runs the interactive part, then commits the ledger however it ended.
///
/// A failed commit is reported after the error of the interactive part, if any.
pub async fn run_and_commit<C, D>(
    archive: &Archive,
    ledger: &mut Ledger,
    settings: &Settings,
    console: &mut C,
    destroyer: Option<D>,
    cancel: Cancellation,
) -> anyhow::Result<()>
where
    C: Console,
    D: StatusDestroyer,
{
    let outcome = interact(archive, &mut *ledger, settings, console, destroyer, cancel).await;
    let committed = ledger.commit();
    if let Err(e) = &committed {
        tracing::error!("failed to commit decisions: {}", e);
    }
    outcome?;
    committed?;
    Ok(())
}

async fn interact<C, D>(
    archive: &Archive,
    ledger: &mut Ledger,
    settings: &Settings,
    console: &mut C,
    destroyer: Option<D>,
    cancel: Cancellation,
) -> anyhow::Result<()>
where
    C: Console,
    D: StatusDestroyer,
{
    let screen_name = resolve_screen_name(&mut *console, destroyer.as_ref(), &cancel).await?;
    let Some(screen_name) = screen_name else {
        return Ok(());
    };
    cancel.reset();

    let mut runtime = Runtime::new(
        archive,
        ledger,
        settings,
        console,
        destroyer,
        screen_name,
        cancel,
    );
    runtime.run().await?;
    Ok(())
}

/// Main menu loop over one archive and its decisions.
pub struct Runtime<'a, C, D> {
    archive: &'a Archive,
    ledger: &'a mut Ledger,
    settings: &'a Settings,
    console: C,
    destroyer: Option<D>,
    screen_name: String,
    cancel: Cancellation,
}

impl<'a, C, D> Runtime<'a, C, D>
where
    C: Console,
    D: StatusDestroyer,
{
    pub fn new(
        archive: &'a Archive,
        ledger: &'a mut Ledger,
        settings: &'a Settings,
        console: C,
        destroyer: Option<D>,
        screen_name: String,
        cancel: Cancellation,
    ) -> Self {
        Runtime {
            archive,
            ledger,
            settings,
            console,
            destroyer,
            screen_name,
            cancel,
        }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    fn banner(&self) -> String {
        banner(self.archive, &*self.ledger, &self.settings.categories, &self.screen_name)
    }

    pub async fn run(&mut self) -> Result<(), LedgerError> {
        loop {
            self.console.clear();
            let screen = format!("{}{}", self.banner(), MENU);
            self.console.show(&screen);

            let flow = match self.console.ask(">").await {
                Input::Line(line) => self.action(&line.to_uppercase()).await?,
                Input::Interrupted => {
                    self.console.show("Aborted.");
                    Flow::Quit
                }
                Input::Closed => Flow::Quit,
            };
            // Whatever was interrupted has been abandoned by now.
            self.cancel.reset();
            if flow == Flow::Quit {
                return Ok(());
            }
        }
    }

    async fn action(&mut self, action: &str) -> Result<Flow, LedgerError> {
        match action {
            "Q" => {
                self.console.show("Quit.");
                Ok(Flow::Quit)
            }
            "X" => self.destroy_tweets().await,
            "A" => {
                self.console.show("All...");
                self.read(Selection::All).await
            }
            "S" => {
                self.console.clear();
                self.console.show("\nSearch");
                match self.console.ask("?").await {
                    Input::Line(text) => self.read(Selection::Search(text)).await,
                    Input::Interrupted => self.aborted(),
                    Input::Closed => Ok(Flow::Quit),
                }
            }
            "T" => {
                self.console.clear();
                let index = format!("Available: {}", self.archive.index());
                self.console.show(&index);
                self.console.show("\nSelect");
                match self.console.ask("?").await {
                    Input::Line(prefix) => self.read(Selection::time_span(&prefix)).await,
                    Input::Interrupted => self.aborted(),
                    Input::Closed => Ok(Flow::Quit),
                }
            }
            _ => Ok(Flow::Continue),
        }
    }

    fn aborted(&mut self) -> Result<Flow, LedgerError> {
        self.console.show("Aborted.");
        Ok(Flow::Continue)
    }

    async fn read(&mut self, selection: Selection) -> Result<Flow, LedgerError> {
        let mut tweets = selection.candidates(self.archive);
        let header = self.banner();
        match confirm_filters(&mut self.console, &header, &mut tweets, &*self.ledger).await {
            FilterOutcome::Filtered(plan) => {
                tracing::debug!(?plan, remaining = tweets.len(), "filters confirmed");
            }
            FilterOutcome::Interrupted => return self.aborted(),
            FilterOutcome::Closed => return Ok(Flow::Quit),
        }

        if tweets.is_empty() {
            self.console.clear();
            let screen = self.banner();
            self.console.show(&screen);
            self.console.show("\nNo tweets to read, hit ENTER to go back...");
            return Ok(match self.console.ask("").await {
                Input::Closed => Flow::Quit,
                Input::Line(_) | Input::Interrupted => Flow::Continue,
            });
        }

        self.console.show(&format!(
            "\n{} tweets to read, hit ENTER to start...",
            tweets.len()
        ));
        match self.console.ask("").await {
            Input::Line(_) => {}
            Input::Interrupted => return self.aborted(),
            Input::Closed => return Ok(Flow::Quit),
        }

        let archive = self.archive;
        let categories = &self.settings.categories;
        let screen_name = self.screen_name.as_str();
        let mut session = BrowsingSession {
            archive,
            ledger: &mut *self.ledger,
            categories,
            screen_name,
            confirm_delay: self.settings.confirm_delay,
        };
        let report = session
            .run(&mut self.console, &tweets, |ledger| {
                banner(archive, ledger, categories, screen_name)
            })
            .await?;

        if report.end == SessionEnd::Interrupted {
            tracing::info!("reading pass interrupted");
        }
        tracing::info!(
            kept = report.kept,
            marked = report.marked,
            deferred = report.deferred,
            "reading pass done"
        );
        Ok(Flow::Continue)
    }

    async fn destroy_tweets(&mut self) -> Result<Flow, LedgerError> {
        let archive = self.archive;
        let categories = &self.settings.categories;
        let console = &mut self.console;

        console.clear();
        console.show(&format!(
            "{} tweets marked to DESTROY:",
            self.ledger.count(&categories.destroy)
        ));
        if self.destroyer.is_some() {
            console.show("DESTROYING...");
        }

        let describe = |subject: &str| match archive.find_subject(subject) {
            Some(tweet) => tweet.to_string(),
            None => subject.to_string(),
        };
        let mut runner = DestructionRunner {
            ledger: &mut *self.ledger,
            categories,
            pacing: self.settings.destroy_delay,
        };
        let report = runner
            .run(self.destroyer.as_ref(), &self.cancel, |event| match event {
                DestroyEvent::Destroyed { subject } => {
                    console.show(&format!("DESTROYED {}", describe(subject.as_str())));
                }
                DestroyEvent::Skipped {
                    subject,
                    reason: SkipReason::Kept,
                } => {
                    tracing::debug!(subject = %subject, "kept, not destroying");
                }
                DestroyEvent::Skipped {
                    subject,
                    reason: SkipReason::AlreadyDestroyed,
                } => {
                    tracing::debug!(subject = %subject, "already destroyed");
                }
                DestroyEvent::Failed { subject, error } => {
                    console.show(&format!("FAILED {}: {}", describe(subject.as_str()), error));
                }
            })
            .await?;

        if report.offline {
            self.console
                .show("Offline, API not connected. Hit ENTER to go back...");
        } else {
            if report.interrupted {
                self.console.show("Aborted.");
            }
            let summary = format!(
                "\n{}\n\n{} destroyed, {} failed, {} kept. Hit ENTER to go back...",
                self.banner(),
                report.destroyed.len(),
                report.failed.len(),
                report.skipped_kept.len(),
            );
            self.console.show(&summary);
        }
        self.cancel.reset();
        Ok(match self.console.ask("").await {
            Input::Closed => Flow::Quit,
            Input::Line(_) | Input::Interrupted => Flow::Continue,
        })
    }
}
