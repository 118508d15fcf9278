//! Ordered-candidate retry: try each candidate in turn until told to stop.

use std::future::Future;

/// Result of the last attempt made by [`first_success`].
#[derive(Debug)]
pub struct Attempted<T, E> {
    /// Zero-based position of the candidate that produced `result`.
    pub index: usize,
    pub result: Result<T, E>,
}

impl<T, E> Attempted<T, E> {
    /// Number of candidates that were tried.
    pub fn attempts(&self) -> usize {
        self.index + 1
    }
}

/// Runs `attempt` against each candidate in order and stops as soon as
/// `should_stop` accepts a result. Returns `None` when there are no
/// candidates.
pub async fn first_success<'a, C, T, E, F, Fut, S>(
    candidates: &'a [C],
    mut attempt: F,
    mut should_stop: S,
) -> Option<Attempted<T, E>>
where
    F: FnMut(usize, &'a C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    S: FnMut(&Result<T, E>) -> bool,
{
    let mut last = None;

    for (index, candidate) in candidates.iter().enumerate() {
        let result = attempt(index, candidate).await;
        let stop = should_stop(&result);
        last = Some(Attempted { index, result });
        if stop {
            break;
        }
    }

    last
}

/// Stop predicate that only accepts success.
pub fn stop_on_success<T, E>(result: &Result<T, E>) -> bool {
    result.is_ok()
}
