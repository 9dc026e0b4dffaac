//! Concurrent fan-out with partial-failure aggregation
//!
//! Runs one future per input, polled concurrently with `join_all`. Successful
//! outputs are merged into a set owned by the run; failures are tagged with
//! their input and returned together as an [`AggregateError`]. A run never
//! short-circuits: it returns only after every branch has completed.

use futures::future::join_all;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// One failed branch: the input it ran for (as text) and its error
#[derive(Debug)]
pub struct BranchFailure<E> {
    pub input: String,
    pub error: E,
}

/// Every failure of a fan-out run
///
/// Only obtainable from a non-empty failure list, so holding one always means
/// at least one branch failed.
#[derive(Debug)]
pub struct AggregateError<E> {
    failures: Vec<BranchFailure<E>>,
}

impl<E> AggregateError<E> {
    /// Returns `None` when there are no failures
    pub fn from_failures(failures: Vec<BranchFailure<E>>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    pub fn failures(&self) -> &[BranchFailure<E>] {
        &self.failures
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Inputs whose branches failed
    pub fn inputs(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.input.as_str())
    }
}

impl<E: fmt::Display> fmt::Display for AggregateError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} branch(es) failed", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}: {}", sep, failure.input, failure.error)?;
        }
        Ok(())
    }
}

impl<E> std::error::Error for AggregateError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|f| &f.error as &(dyn std::error::Error + 'static))
    }
}

/// Result of a fan-out run
///
/// `results` holds every successful output even when `error` is set.
#[derive(Debug)]
pub struct FanOutOutcome<O, E> {
    pub results: HashSet<O>,
    pub error: Option<AggregateError<E>>,
}

impl<O, E> FanOutOutcome<O, E> {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Shared result set for one run; the lock is held only for the merge
struct ResultCollector<O> {
    items: Mutex<HashSet<O>>,
}

impl<O: Eq + Hash> ResultCollector<O> {
    fn new() -> Self {
        Self {
            items: Mutex::new(HashSet::new()),
        }
    }

    fn merge(&self, values: impl IntoIterator<Item = O>) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.extend(values);
    }

    fn into_inner(self) -> HashSet<O> {
        self.items.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Append-only failure list for one run
struct FailureCollector<E> {
    failures: Mutex<Vec<BranchFailure<E>>>,
}

impl<E> FailureCollector<E> {
    fn new() -> Self {
        Self {
            failures: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, input: String, error: E) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(BranchFailure { input, error });
    }

    fn into_inner(self) -> Vec<BranchFailure<E>> {
        self.failures
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fan-out coordinator
///
/// Unbounded by default. With a limit, at most `limit` branches of a single
/// run are in flight at once; the permits are per run, not shared between
/// runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FanOut {
    limit: Option<usize>,
}

impl FanOut {
    pub fn unbounded() -> Self {
        Self { limit: None }
    }

    /// A limit of zero is treated as one
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
        }
    }

    /// Build from an optional configured limit
    pub fn from_limit(limit: Option<usize>) -> Self {
        match limit {
            Some(n) => Self::with_limit(n),
            None => Self::unbounded(),
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Run `op` once per input and collect the outcome
    ///
    /// Each success contributes zero or more outputs to the merged set. Each
    /// failure is recorded with `input.to_string()` as its tag.
    pub async fn run_all<I, O, E, T, F, Fut>(
        &self,
        inputs: impl IntoIterator<Item = I>,
        op: F,
    ) -> FanOutOutcome<O, E>
    where
        I: fmt::Display,
        O: Eq + Hash,
        E: fmt::Display,
        T: IntoIterator<Item = O>,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let results = ResultCollector::new();
        let failures = FailureCollector::new();
        let semaphore = self.limit.map(|n| Arc::new(Semaphore::new(n)));

        let op = &op;
        let results_ref = &results;
        let failures_ref = &failures;

        let branches = inputs.into_iter().map(|input| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = match &semaphore {
                    Some(sem) => sem.acquire().await.ok(),
                    None => None,
                };

                let label = input.to_string();
                match op(input).await {
                    Ok(values) => results_ref.merge(values),
                    Err(e) => {
                        warn!(input = %label, error = %e, "Fan-out branch failed");
                        failures_ref.push(label, e);
                    }
                }
            }
        });

        let branch_count = join_all(branches).await.len();

        let results = results.into_inner();
        let error = AggregateError::from_failures(failures.into_inner());
        debug!(
            branches = branch_count,
            results = results.len(),
            failed = error.as_ref().map_or(0, |e| e.failure_count()),
            "Fan-out complete"
        );

        FanOutOutcome { results, error }
    }
}
