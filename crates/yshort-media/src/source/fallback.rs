//! Ordered fallback over alternative strategies.

use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// Every candidate failed; failures are kept in attempt order.
#[derive(Debug)]
pub struct FallbackExhausted<K, E> {
    pub failures: Vec<(K, E)>,
}

impl<K, E> FallbackExhausted<K, E> {
    /// Error of the final attempt, if any candidate was tried.
    pub fn into_last_error(self) -> Option<E> {
        self.failures.into_iter().last().map(|(_, e)| e)
    }

    pub fn attempts(&self) -> usize {
        self.failures.len()
    }
}

/// Try `candidates` in order and return the first success.
///
/// Later candidates are never attempted once one succeeds.
pub async fn first_success<K, T, E, F, Fut>(
    candidates: impl IntoIterator<Item = K>,
    mut attempt: F,
) -> Result<(K, T), FallbackExhausted<K, E>>
where
    K: Clone + Display,
    E: Display,
    F: FnMut(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut failures = Vec::new();

    for candidate in candidates {
        match attempt(candidate.clone()).await {
            Ok(value) => return Ok((candidate, value)),
            Err(e) => {
                warn!(candidate = %candidate, error = %e, "Attempt failed, trying next candidate");
                failures.push((candidate, e));
            }
        }
    }

    Err(FallbackExhausted { failures })
}
