use super::*;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn test_results_follow_input_order_despite_random_latency() {
    let items: Vec<usize> = (0..32).collect();
    let results = scatter_gather(items, None, |index, item| async move {
        let delay = rand::thread_rng().gen_range(0..20);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok((index, item * 10))
    })
    .await
    .unwrap();

    for (position, (index, value)) in results.into_iter().enumerate() {
        assert_eq!(position, index);
        assert_eq!(value, position * 10);
    }
}

#[tokio::test]
async fn test_limit_caps_in_flight_tasks() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let results = scatter_gather((0..40).collect::<Vec<u32>>(), Some(10), |_, item| {
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(item)
        }
    })
    .await
    .unwrap();

    assert_eq!(results.len(), 40);
    assert!(peak.load(Ordering::SeqCst) <= 10);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_zero_limit_is_treated_as_one() {
    let results = scatter_gather(vec![1, 2], Some(0), |_, n| async move { Ok(n) })
        .await
        .unwrap();
    assert_eq!(results, vec![1, 2]);
}

#[tokio::test]
async fn test_empty_input_yields_empty_output() {
    let results: Vec<u8> = scatter_gather(Vec::<u8>::new(), Some(3), |_, n| async move { Ok(n) })
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_first_error_aborts_outstanding_tasks() {
    let finished = Arc::new(AtomicUsize::new(0));

    let result = scatter_gather((0..5).collect::<Vec<u32>>(), None, |_, item| {
        let finished = finished.clone();
        async move {
            if item == 2 {
                return Err(SyncError::network("boom"));
            }
            tokio::time::sleep(Duration::from_secs(30)).await;
            finished.fetch_add(1, Ordering::SeqCst);
            Ok(item)
        }
    })
    .await;

    assert!(matches!(result.unwrap_err(), SyncError::Network { .. }));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_panicking_task_becomes_task_error() {
    let result = scatter_gather(vec![1u8], None, |_, _| async move {
        if true {
            panic!("worker exploded");
        }
        Ok(0u8)
    })
    .await;

    assert!(matches!(result.unwrap_err(), SyncError::Task { .. }));
}

#[tokio::test]
async fn test_dropping_outer_fanout_cancels_inner_tasks() {
    let finished = Arc::new(AtomicUsize::new(0));

    let outer = {
        let finished = finished.clone();
        tokio::spawn(async move {
            scatter_gather(vec![(); 3], None, move |_, _| {
                let finished = finished.clone();
                async move {
                    scatter_gather(vec![(); 3], Some(1), move |_, _| {
                        let finished = finished.clone();
                        async move {
                            tokio::time::sleep(Duration::from_secs(30)).await;
                            finished.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        }
                    })
                    .await
                }
            })
            .await
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    outer.abort();
    let joined = outer.await;
    assert!(joined.unwrap_err().is_cancelled());
    assert_eq!(finished.load(Ordering::SeqCst), 0);
}
