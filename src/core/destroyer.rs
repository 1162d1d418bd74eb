use std::time::Duration;

use tokio::time::sleep;

use crate::config::Categories;
use crate::core::cancel::Cancellation;
use crate::error::LedgerError;
use crate::ledger::Ledger;

/// Remote side of a deletion: removes a status and names the authenticated account.
#[allow(async_fn_in_trait)]
pub trait StatusDestroyer {
    async fn destroy_status(&self, id: &str) -> anyhow::Result<()>;
    async fn current_user(&self) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Kept,
    AlreadyDestroyed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyEvent {
    Skipped { subject: String, reason: SkipReason },
    Destroyed { subject: String },
    Failed { subject: String, error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestructionReport {
    pub offline: bool,
    pub interrupted: bool,
    pub destroyed: Vec<String>,
    pub skipped_kept: Vec<String>,
    pub skipped_destroyed: Vec<String>,
    pub failed: Vec<String>,
    /// Subjects dropped from the destroy category because they are destroyed.
    pub reconciled: usize,
}

/// Deletes every destroy-marked subject that is neither kept nor already destroyed.
pub struct DestructionRunner<'a> {
    pub ledger: &'a mut Ledger,
    pub categories: &'a Categories,
    pub pacing: Duration,
}

impl<'a> DestructionRunner<'a> {
    pub async fn run<D, F>(
        &mut self,
        destroyer: Option<&D>,
        cancel: &Cancellation,
        mut observe: F,
    ) -> Result<DestructionReport, LedgerError>
    where
        D: StatusDestroyer,
        F: FnMut(&DestroyEvent),
    {
        let mut report = DestructionReport::default();
        let Some(destroyer) = destroyer else {
            tracing::warn!("no API connection, nothing destroyed");
            report.offline = true;
            return Ok(report);
        };

        let subjects = self.ledger.subjects(&self.categories.destroy);
        let mut first = true;
        for subject in subjects {
            if cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }

            let skip = if self.ledger.is_decided(&subject, Some(self.categories.keep.as_str())) {
                Some(SkipReason::Kept)
            } else if self.ledger.is_decided(&subject, Some(self.categories.destroyed.as_str())) {
                Some(SkipReason::AlreadyDestroyed)
            } else {
                None
            };
            if let Some(reason) = skip {
                match reason {
                    SkipReason::Kept => report.skipped_kept.push(subject.clone()),
                    SkipReason::AlreadyDestroyed => report.skipped_destroyed.push(subject.clone()),
                }
                observe(&DestroyEvent::Skipped { subject, reason });
                continue;
            }

            if !first && !self.pacing.is_zero() {
                tokio::select! {
                    _ = sleep(self.pacing) => {}
                    _ = cancel.cancelled() => {
                        report.interrupted = true;
                        break;
                    }
                }
            }
            first = false;

            let outcome = tokio::select! {
                outcome = destroyer.destroy_status(&subject) => outcome,
                _ = cancel.cancelled() => {
                    tracing::warn!(subject = %subject, "deletion abandoned on interrupt");
                    report.interrupted = true;
                    break;
                }
            };
            match outcome {
                Ok(()) => {
                    tracing::info!(subject = %subject, "status destroyed");
                    self.ledger.decide(&subject, &self.categories.destroyed)?;
                    report.destroyed.push(subject.clone());
                    observe(&DestroyEvent::Destroyed { subject });
                }
                Err(e) => {
                    tracing::warn!(subject = %subject, "failed to destroy status: {:#}", e);
                    report.failed.push(subject.clone());
                    observe(&DestroyEvent::Failed {
                        subject,
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        report.reconciled = self.reconcile()?;
        Ok(report)
    }

    /// Leaves only pending work in the destroy category.
    pub fn reconcile(&mut self) -> Result<usize, LedgerError> {
        let mut reconciled = 0;
        for subject in self.ledger.subjects(&self.categories.destroyed) {
            if self.ledger.is_decided(&subject, Some(self.categories.destroy.as_str())) {
                self.ledger.revoke(&subject, &self.categories.destroy)?;
                reconciled += 1;
            }
        }
        Ok(reconciled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct StubDestroyer {
        calls: Mutex<Vec<String>>,
        failing: HashSet<String>,
    }

    impl StatusDestroyer for StubDestroyer {
        async fn destroy_status(&self, id: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(id.to_string());
            if self.failing.contains(id) {
                anyhow::bail!("status {} not found", id);
            }
            Ok(())
        }

        async fn current_user(&self) -> anyhow::Result<String> {
            Ok("stub".to_string())
        }
    }

    /// Remote side that never answers.
    struct StalledDestroyer;

    impl StatusDestroyer for StalledDestroyer {
        async fn destroy_status(&self, _id: &str) -> anyhow::Result<()> {
            std::future::pending().await
        }

        async fn current_user(&self) -> anyhow::Result<String> {
            std::future::pending().await
        }
    }

    fn setup() -> (tempfile::TempDir, Ledger, Categories) {
        let dir = tempdir().unwrap();
        let categories = Categories::default();
        let ledger = Ledger::open(dir.path(), categories.all()).unwrap();
        (dir, ledger, categories)
    }

    fn sorted(mut subjects: Vec<String>) -> Vec<String> {
        subjects.sort();
        subjects
    }

    #[tokio::test]
    async fn test_destroys_marked_and_reconciles() {
        let (_dir, mut ledger, categories) = setup();
        ledger.decide(1, &categories.destroy).unwrap();
        ledger.decide(2, &categories.destroy).unwrap();
        let stub = StubDestroyer::default();
        let mut events = Vec::new();

        let mut runner = DestructionRunner {
            ledger: &mut ledger,
            categories: &categories,
            pacing: Duration::ZERO,
        };
        let report = runner
            .run(Some(&stub), &Cancellation::new(), |event| events.push(event.clone()))
            .await
            .unwrap();

        assert_eq!(sorted(report.destroyed.clone()), vec!["1", "2"]);
        assert_eq!(report.reconciled, 2);
        assert_eq!(events.len(), 2);
        assert_eq!(ledger.count(&categories.destroy), 0);
        assert_eq!(ledger.count(&categories.destroyed), 2);
    }

    #[tokio::test]
    async fn test_keep_wins_and_destroyed_is_not_repeated() {
        let (_dir, mut ledger, categories) = setup();
        for subject in [1, 2, 3] {
            ledger.decide(subject, &categories.destroy).unwrap();
        }
        ledger.decide(1, &categories.keep).unwrap();
        ledger.decide(2, &categories.destroyed).unwrap();
        let stub = StubDestroyer::default();

        let mut runner = DestructionRunner {
            ledger: &mut ledger,
            categories: &categories,
            pacing: Duration::ZERO,
        };
        let report = runner
            .run(Some(&stub), &Cancellation::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(*stub.calls.lock().unwrap(), vec!["3".to_string()]);
        assert_eq!(report.skipped_kept, vec!["1"]);
        assert_eq!(report.skipped_destroyed, vec!["2"]);
        assert_eq!(sorted(ledger.subjects(&categories.destroy)), vec!["1"]);
        assert_eq!(sorted(ledger.subjects(&categories.destroyed)), vec!["2", "3"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let (_dir, mut ledger, categories) = setup();
        for subject in [1, 2, 3] {
            ledger.decide(subject, &categories.destroy).unwrap();
        }
        let stub = StubDestroyer {
            failing: HashSet::from(["2".to_string()]),
            ..StubDestroyer::default()
        };

        let mut runner = DestructionRunner {
            ledger: &mut ledger,
            categories: &categories,
            pacing: Duration::ZERO,
        };
        let report = runner
            .run(Some(&stub), &Cancellation::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(stub.calls.lock().unwrap().len(), 3);
        assert_eq!(report.failed, vec!["2"]);
        assert_eq!(sorted(report.destroyed), vec!["1", "3"]);
        assert_eq!(ledger.subjects(&categories.destroy), vec!["2"]);
        assert!(!ledger.is_decided(2, Some(categories.destroyed.as_str())));
    }

    #[tokio::test]
    async fn test_offline_does_nothing() {
        let (_dir, mut ledger, categories) = setup();
        ledger.decide(1, &categories.destroy).unwrap();

        let mut runner = DestructionRunner {
            ledger: &mut ledger,
            categories: &categories,
            pacing: Duration::ZERO,
        };
        let report = runner
            .run(None::<&StubDestroyer>, &Cancellation::new(), |_| {})
            .await
            .unwrap();

        assert!(report.offline);
        assert_eq!(ledger.count(&categories.destroy), 1);
        assert_eq!(ledger.count(&categories.destroyed), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_still_reconciles() {
        let (_dir, mut ledger, categories) = setup();
        ledger.decide(1, &categories.destroy).unwrap();
        ledger.decide(5, &categories.destroy).unwrap();
        ledger.decide(5, &categories.destroyed).unwrap();
        let stub = StubDestroyer::default();
        let cancel = Cancellation::new();
        cancel.cancel();

        let mut runner = DestructionRunner {
            ledger: &mut ledger,
            categories: &categories,
            pacing: Duration::ZERO,
        };
        let report = runner.run(Some(&stub), &cancel, |_| {}).await.unwrap();

        assert!(report.interrupted);
        assert!(stub.calls.lock().unwrap().is_empty());
        assert_eq!(report.reconciled, 1);
        assert_eq!(ledger.subjects(&categories.destroy), vec!["1"]);
    }

    #[tokio::test]
    async fn test_interrupt_abandons_stalled_deletion() {
        let (_dir, mut ledger, categories) = setup();
        ledger.decide(1, &categories.destroy).unwrap();
        ledger.decide(5, &categories.destroy).unwrap();
        ledger.decide(5, &categories.destroyed).unwrap();
        let cancel = Cancellation::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let mut runner = DestructionRunner {
            ledger: &mut ledger,
            categories: &categories,
            pacing: Duration::ZERO,
        };
        let report = tokio::time::timeout(
            Duration::from_secs(1),
            runner.run(Some(&StalledDestroyer), &cancel, |_| {}),
        )
        .await
        .expect("runner kept waiting after the interrupt")
        .unwrap();

        assert!(report.interrupted);
        assert!(report.destroyed.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(report.reconciled, 1);
        assert_eq!(ledger.subjects(&categories.destroy), vec!["1"]);
        assert!(!ledger.is_decided(1, Some(categories.destroyed.as_str())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_deletions() {
        let (_dir, mut ledger, categories) = setup();
        for subject in [1, 2, 3] {
            ledger.decide(subject, &categories.destroy).unwrap();
        }
        let stub = StubDestroyer::default();
        let started = tokio::time::Instant::now();

        let mut runner = DestructionRunner {
            ledger: &mut ledger,
            categories: &categories,
            pacing: Duration::from_secs(2),
        };
        runner
            .run(Some(&stub), &Cancellation::new(), |_| {})
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
    }
}
