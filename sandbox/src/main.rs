//! Demo host: wires the dispatcher to the default collaborators and runs a few
//! simulated application threads against it.
//!
//! Usage: `sandbox [config.json]`. Batches are written to stdout as JSON
//! lines, logs go to stderr (`RUST_LOG` controls the level).

use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use vigil_core::{EumEvent, ExceptionData, ExceptionEvent, Record, RecordSink, TimerData};
use vigil_dispatch::{Dispatcher, DispatcherConfig, DrainOutcome, RecordStore};
use vigil_infra::{
    BoundedBatchQueue, CpuSensor, IntervalTrigger, IntervalTriggerConfig, JsonLinesTransport,
    LogRegistration, MemorySensor, PendingCountTrigger, QueueConfig,
};

const TIMER_SENSOR: u64 = 3;
const EXCEPTION_SENSOR: u64 = 8;
const CPU_SENSOR: u64 = 21;
const MEMORY_SENSOR: u64 = 22;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SandboxConfig {
    dispatcher: DispatcherConfig,
    queue: QueueConfig,
    interval_trigger: IntervalTriggerConfig,
    pending_threshold: usize,
    producers: u64,
    run_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            queue: QueueConfig::default(),
            interval_trigger: IntervalTriggerConfig { interval_ms: 2000 },
            pending_threshold: 500,
            producers: 4,
            run_secs: 6,
        }
    }
}

fn load_config() -> anyhow::Result<SandboxConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(SandboxConfig::default());
    };
    let content =
        std::fs::read_to_string(&path).with_context(|| format!("reading config {path}"))?;
    let config: SandboxConfig =
        serde_json::from_str(&content).with_context(|| format!("parsing config {path}"))?;
    config.dispatcher.validate()?;
    Ok(config)
}

/// One simulated application thread: timed methods, the odd exception and
/// end-user events.
fn produce(store: Arc<RecordStore>, producer: u64, deadline: Instant) {
    let mut iteration = 0u64;
    while Instant::now() < deadline {
        iteration += 1;
        let method_id = producer * 10 + iteration % 3;
        let duration_ms = ((iteration * 7 + producer) % 40) as f64 + 0.5;

        store.update_method_record(
            TIMER_SENSOR,
            method_id,
            None,
            || Record::Timer(TimerData::new(TIMER_SENSOR, method_id)),
            |record| {
                if let Some(timer) = record.as_timer_mut() {
                    timer.add_duration(duration_ms);
                }
            },
        );

        if iteration % 50 == 0 {
            store.add_exception_record(ExceptionData {
                sensor_type_id: EXCEPTION_SENSOR,
                method_id,
                identity_hash: (producer << 32) | iteration,
                timestamp_ms: vigil_core::now_millis(),
                event: ExceptionEvent::Created,
                error_type: "TimeoutException".to_string(),
                message: Some(format!("request {iteration} timed out")),
                stack_trace: None,
                child: None,
            });
        }

        if iteration % 20 == 0 {
            store.add_eum_event(EumEvent {
                session_id: producer,
                event_type: "page_load".to_string(),
                timestamp_ms: vigil_core::now_millis(),
                payload: serde_json::json!({ "duration_ms": duration_ms }),
            });
        }

        thread::sleep(Duration::from_millis(5));
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    log::info!("Starting sandbox with {config:?}");

    let store = Arc::new(RecordStore::new());
    let count_trigger = PendingCountTrigger::new(config.pending_threshold);
    store.register_listener(count_trigger.listener());

    let dispatcher = Dispatcher::builder()
        .config(config.dispatcher.clone())
        .store(Arc::clone(&store))
        .transport(Arc::new(JsonLinesTransport::new(std::io::stdout())))
        .buffer(Arc::new(BoundedBatchQueue::new(&config.queue)))
        .registration(Arc::new(LogRegistration::new("sandbox")))
        .trigger(Box::new(IntervalTrigger::new(&config.interval_trigger)))
        .trigger(Box::new(count_trigger))
        .platform_sensor(Box::new(CpuSensor::new(CPU_SENSOR)))
        .platform_sensor(Box::new(MemorySensor::new(MEMORY_SENSOR)))
        .build()?;
    dispatcher.start()?;

    let deadline = Instant::now() + Duration::from_secs(config.run_secs);
    let producers: Vec<_> = (0..config.producers)
        .map(|producer| {
            let store = Arc::clone(&store);
            thread::Builder::new()
                .name(format!("app-{producer}"))
                .spawn(move || produce(store, producer, deadline))
        })
        .collect::<Result<_, _>>()?;

    for producer in producers {
        if producer.join().is_err() {
            log::error!("A producer thread panicked.");
        }
    }

    match dispatcher.shutdown() {
        DrainOutcome::CompletedAfterTimeout(worker) => {
            log::warn!("Sandbox finished, worker '{worker}' was left running.")
        }
        outcome => log::info!("Sandbox finished: {outcome:?}."),
    }
    Ok(())
}
