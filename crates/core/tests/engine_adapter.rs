//! Engine adapter integration tests.
//!
//! These tests exercise the shared-engine guarantees over the mock engine:
//! - A single load shared by concurrent callers, retried after failure
//! - One lease at a time, granted in arrival order
//! - Progress attributed to the job whose command produced it

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use wavesmith_core::{
    engine::{EngineAdapter, EngineError},
    job::JobId,
    testing::MockEngine,
};

fn adapter(engine: &MockEngine) -> EngineAdapter {
    EngineAdapter::new(Arc::new(engine.clone()))
}

#[tokio::test]
async fn test_concurrent_ensure_loaded_runs_one_load() {
    let engine = MockEngine::new();
    engine.set_load_delay(Duration::from_millis(50));
    let adapter = adapter(&engine);

    let results = join_all((0..10).map(|_| adapter.ensure_loaded())).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(engine.load_count(), 1);
    assert!(adapter.is_loaded());
}

#[tokio::test]
async fn test_concurrent_callers_share_a_failed_load() {
    let engine = MockEngine::new();
    engine.set_load_delay(Duration::from_millis(50));
    engine.fail_next_loads(1);
    let adapter = adapter(&engine);

    let results = join_all((0..3).map(|_| adapter.ensure_loaded())).await;
    assert!(results
        .iter()
        .all(|r| matches!(r, Err(EngineError::LoadFailed { .. }))));
    assert_eq!(engine.load_count(), 1);
    assert!(!adapter.is_loaded());

    // The next caller retries
    adapter.ensure_loaded().await.unwrap();
    assert_eq!(engine.load_count(), 2);
}

#[tokio::test]
async fn test_leases_granted_in_arrival_order() {
    let engine = MockEngine::new();
    engine.set_exec_delay(Duration::from_millis(5));
    let adapter = adapter(&engine);
    adapter.ensure_loaded().await.unwrap();

    let first = adapter.acquire(&JobId::from("job-0")).await.unwrap();
    let mut tasks = Vec::new();
    for i in 1..=4 {
        let adapter = adapter.clone();
        tasks.push(tokio::spawn(async move {
            let id = JobId::from(format!("job-{}", i));
            let lease = adapter.acquire(&id).await.unwrap();
            let input = format!("input_{}.mp3", i);
            lease.write_input(&input, b"data").await.unwrap();
            lease
                .run(&[
                    "-i".to_string(),
                    input.clone(),
                    format!("output_{}.wav", i),
                ])
                .await
                .unwrap();
            lease.remove_file(&input).await.unwrap();
        }));
        // Let the task queue up before spawning the next
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    drop(first);

    for task in tasks {
        task.await.unwrap();
    }

    let inputs: Vec<String> = engine
        .recorded_commands()
        .await
        .into_iter()
        .map(|args| args[1].clone())
        .collect();
    assert_eq!(
        inputs,
        vec![
            "input_1.mp3",
            "input_2.mp3",
            "input_3.mp3",
            "input_4.mp3"
        ]
    );
    assert_eq!(engine.max_concurrent_execs(), 1);
}

#[tokio::test]
async fn test_progress_follows_lease_holder() {
    let engine = MockEngine::new();
    engine.set_exec_delay(Duration::from_millis(25));
    let adapter = adapter(&engine);
    adapter.ensure_loaded().await.unwrap();
    let mut progress = adapter.subscribe_progress();

    for name in ["a", "b"] {
        let lease = adapter.acquire(&JobId::from(name)).await.unwrap();
        let input = format!("{}.mp3", name);
        lease.write_input(&input, b"x").await.unwrap();
        lease
            .run(&["-i".to_string(), input, format!("{}.wav", name)])
            .await
            .unwrap();
    }

    let mut ticks = Vec::new();
    while let Ok(tick) = progress.try_recv() {
        ticks.push(tick);
    }
    let a: Vec<f64> = ticks
        .iter()
        .filter(|t| t.job_id == JobId::from("a"))
        .map(|t| t.ratio)
        .collect();
    let b: Vec<f64> = ticks
        .iter()
        .filter(|t| t.job_id == JobId::from("b"))
        .map(|t| t.ratio)
        .collect();
    assert_eq!(a, vec![0.2, 0.4, 0.6, 0.8, 1.0]);
    assert_eq!(b, vec![0.2, 0.4, 0.6, 0.8, 1.0]);
    assert_eq!(ticks.len(), 10);
}

#[tokio::test]
async fn test_stray_tick_is_not_credited_to_next_lease() {
    let engine = MockEngine::new();
    let adapter = adapter(&engine);
    adapter.ensure_loaded().await.unwrap();
    let mut progress = adapter.subscribe_progress();

    let lease = adapter.acquire(&JobId::from("a")).await.unwrap();
    engine.emit_progress(0.95);
    drop(lease);

    let lease = adapter.acquire(&JobId::from("b")).await.unwrap();
    lease.write_input("b.mp3", b"x").await.unwrap();
    lease
        .run(&["-i".to_string(), "b.mp3".to_string(), "b.wav".to_string()])
        .await
        .unwrap();

    let mut ticks = Vec::new();
    while let Ok(tick) = progress.try_recv() {
        ticks.push(tick);
    }
    assert!(ticks.iter().all(|t| t.job_id == JobId::from("b")));
    assert!(ticks.iter().all(|t| t.ratio != 0.95));
    assert_eq!(ticks.first().map(|t| t.ratio), Some(0.2));
}

#[tokio::test]
async fn test_back_to_back_leases_keep_their_own_progress() {
    let engine = MockEngine::new();
    let adapter = adapter(&engine);
    adapter.ensure_loaded().await.unwrap();
    let mut progress = adapter.subscribe_progress();

    let tasks: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            let adapter = adapter.clone();
            tokio::spawn(async move {
                let lease = adapter.acquire(&JobId::from(name)).await.unwrap();
                let input = format!("{}.mp3", name);
                lease.write_input(&input, b"x").await.unwrap();
                lease
                    .run(&["-i".to_string(), input, format!("{}.wav", name)])
                    .await
                    .unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let mut ticks = Vec::new();
    while let Ok(tick) = progress.try_recv() {
        ticks.push(tick);
    }
    assert_eq!(ticks.len(), 15);
    // Each job's ticks are contiguous and complete
    for chunk in ticks.chunks(5) {
        assert!(chunk.iter().all(|t| t.job_id == chunk[0].job_id));
        let ratios: Vec<f64> = chunk.iter().map(|t| t.ratio).collect();
        assert_eq!(ratios, vec![0.2, 0.4, 0.6, 0.8, 1.0]);
    }
}

#[tokio::test]
async fn test_output_missing_surfaces_from_lease() {
    let engine = MockEngine::new();
    engine.set_skip_output(true);
    let adapter = adapter(&engine);
    adapter.ensure_loaded().await.unwrap();

    let lease = adapter.acquire(&JobId::from("x")).await.unwrap();
    lease.write_input("in.mp3", b"x").await.unwrap();
    lease
        .run(&["-i".to_string(), "in.mp3".to_string(), "out.wav".to_string()])
        .await
        .unwrap();
    let err = lease.read_output("out.wav").await.unwrap_err();
    assert!(matches!(err, EngineError::OutputMissing { ref name } if name == "out.wav"));
}
