use std::future::Future;

use tracing::warn;

/// Attempts allowed when allocating a unique number.
pub const MAX_NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} colliding attempts")]
    Exhausted { attempts: usize },
    #[error(transparent)]
    Failed(E),
}

/// Generates a candidate, tries to insert it, and regenerates only when the
/// insert failed with an error `is_collision` recognises. Any other error is
/// returned straight away.
pub async fn retry_on_collision<T, E, G, F, Fut, P>(
    max_attempts: usize,
    mut generate: G,
    mut insert: F,
    is_collision: P,
) -> Result<T, RetryError<E>>
where
    G: FnMut() -> String,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    for attempt in 1..=max_attempts {
        let candidate = generate();
        match insert(candidate.clone()).await {
            Ok(value) => return Ok(value),
            Err(err) if is_collision(&err) => {
                warn!(attempt, candidate = %candidate, "Generated number already taken: {}", err);
            }
            Err(err) => return Err(RetryError::Failed(err)),
        }
    }
    Err(RetryError::Exhausted { attempts: max_attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    enum FakeError {
        Duplicate,
        Down,
    }

    impl std::fmt::Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_collisions() {
        let calls = Cell::new(0);
        let result = retry_on_collision(
            MAX_NUMBER_ATTEMPTS,
            || {
                calls.set(calls.get() + 1);
                format!("N-{}", calls.get())
            },
            |candidate| async move {
                if candidate == "N-3" { Ok(candidate) } else { Err(FakeError::Duplicate) }
            },
            |e| *e == FakeError::Duplicate,
        )
        .await;
        assert_eq!(result.unwrap(), "N-3");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<String, _> = retry_on_collision(
            MAX_NUMBER_ATTEMPTS,
            || {
                calls.set(calls.get() + 1);
                "N-1".to_string()
            },
            |_| async { Err(FakeError::Duplicate) },
            |e| *e == FakeError::Duplicate,
        )
        .await;
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 5 })));
        assert_eq!(calls.get(), 5);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<String, _> = retry_on_collision(
            MAX_NUMBER_ATTEMPTS,
            || {
                calls.set(calls.get() + 1);
                "N-1".to_string()
            },
            |_| async { Err(FakeError::Down) },
            |e| *e == FakeError::Duplicate,
        )
        .await;
        assert!(matches!(result, Err(RetryError::Failed(FakeError::Down))));
        assert_eq!(calls.get(), 1);
    }
}
