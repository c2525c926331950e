//! Bounded FIFO dispatch onto blocking worker threads.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use dirsnap_core::SnapshotError;

/// Run `work` over `items` with at most `max_concurrent` calls in flight.
///
/// Items are launched in input order; a new item starts only after a permit
/// is released by a finished one. Results come back in input order. A call
/// that panics turns into [`SnapshotError::WorkerLost`] for its own item and
/// does not disturb the others.
pub async fn dispatch<T, R, F>(
    items: Vec<T>,
    max_concurrent: usize,
    work: F,
) -> Vec<Result<R, SnapshotError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(usize, T) -> R + Send + Sync + 'static,
{
    let limit = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let work = Arc::new(work);
    let mut launched: Vec<Result<JoinHandle<R>, SnapshotError>> = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let permit = match Arc::clone(&limit).acquire_owned().await {
            Ok(permit) => permit,
            Err(err) => {
                launched.push(Err(SnapshotError::WorkerLost {
                    index,
                    message: err.to_string(),
                }));
                continue;
            }
        };

        let work = Arc::clone(&work);
        launched.push(Ok(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work(index, item)
        })));
    }

    let mut results = Vec::with_capacity(launched.len());
    for (index, handle) in launched.into_iter().enumerate() {
        let result = match handle {
            Ok(handle) => handle.await.map_err(|err| SnapshotError::WorkerLost {
                index,
                message: if err.is_panic() {
                    panic_message(err.into_panic())
                } else {
                    err.to_string()
                },
            }),
            Err(err) => Err(err),
        };
        results.push(result);
    }
    results
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_never_exceeds_bound() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let results = dispatch((0..8).collect::<Vec<u32>>(), 3, move |_, n| {
            let now = r.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(30));
            r.fetch_sub(1, Ordering::SeqCst);
            n * 2
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
        let values: Vec<u32> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[tokio::test]
    async fn test_fifo_launch_with_single_slot() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&order);
        dispatch(vec!["a", "b", "c", "d"], 1, move |index, name| {
            seen.lock().unwrap().push((index, name));
        })
        .await;

        assert_eq!(
            *order.lock().unwrap(),
            vec![(0, "a"), (1, "b"), (2, "c"), (3, "d")]
        );
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let results = dispatch(vec![1, 2, 3], 2, |_, n| {
            if n == 2 {
                panic!("bad item");
            }
            n
        })
        .await;

        assert_eq!(results[0].as_ref().ok(), Some(&1));
        assert_eq!(results[2].as_ref().ok(), Some(&3));
        match &results[1] {
            Err(SnapshotError::WorkerLost { index, message }) => {
                assert_eq!(*index, 1);
                assert!(message.contains("bad item"));
            }
            other => panic!("expected lost worker, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_bound_is_treated_as_one() {
        let results = dispatch(vec![(); 3], 0, |index, ()| index).await;
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results = dispatch(Vec::<u8>::new(), 4, |_, n| n).await;
        assert!(results.is_empty());
    }
}
