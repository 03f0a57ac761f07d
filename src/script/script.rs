//! Ordered script executor

use futures_util::future::{BoxFuture, FutureExt};

use crate::common::Result;

use super::endpoint::Endpoint;
use super::step::Step;

/// An ordered sequence of steps, run one at a time
///
/// A script is itself a [`Step`] (via `Step::from`), so scripts nest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    steps: Vec<Step>,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Append a step (or a nested script)
    pub fn push(&mut self, step: impl Into<Step>) {
        self.steps.push(step.into());
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order against `endpoint`
    ///
    /// Stops at the first failing step and returns its error as is. The
    /// endpoint is only borrowed; it stays open whatever the outcome.
    pub fn run<'a, E>(&'a self, endpoint: &'a mut E) -> BoxFuture<'a, Result<()>>
    where
        E: Endpoint + ?Sized,
    {
        self.run_observed(endpoint, |_, _, _| {})
    }

    /// Same as [`run`](Self::run), calling `observe` with each top-level
    /// step's index and outcome as it finishes
    pub fn run_observed<'a, E, F>(
        &'a self,
        endpoint: &'a mut E,
        mut observe: F,
    ) -> BoxFuture<'a, Result<()>>
    where
        E: Endpoint + ?Sized,
        F: FnMut(usize, &Step, &Result<()>) + Send + 'a,
    {
        async move {
            for (index, step) in self.steps.iter().enumerate() {
                tracing::trace!(index, %step, "step");
                let outcome = step.step(&mut *endpoint).await;
                observe(index, step, &outcome);
                outcome?;
            }
            Ok(())
        }
        .boxed()
    }

    /// Same as [`run`](Self::run); lets a script stand wherever a step does
    pub fn step<'a, E>(&'a self, endpoint: &'a mut E) -> BoxFuture<'a, Result<()>>
    where
        E: Endpoint + ?Sized,
    {
        self.run(endpoint)
    }
}

impl From<Vec<Step>> for Script {
    fn from(steps: Vec<Step>) -> Self {
        Self::new(steps)
    }
}

impl FromIterator<Step> for Script {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Extend<Step> for Script {
    fn extend<I: IntoIterator<Item = Step>>(&mut self, iter: I) {
        self.steps.extend(iter);
    }
}
