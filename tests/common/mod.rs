#![allow(dead_code)]

use async_trait::async_trait;
use sms_dispatch::core::registry::InMemoryJobRegistry;
use sms_dispatch::core::stats::StatsAggregator;
use sms_dispatch::core::SenderGateway;
use sms_dispatch::utils::error::SendFailure;
use sms_dispatch::{DispatchEngine, WorkerPool};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 測試用 gateway：記錄呼叫、同時進行數的最大值，並可模擬失敗與卡住
#[derive(Default)]
pub struct StubGateway {
    delay: Duration,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubGateway {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn failing_for(mut self, destinations: &[&str]) -> Self {
        self.failing
            .extend(destinations.iter().map(|d| d.to_string()));
        self
    }

    pub fn hanging_for(mut self, destinations: &[&str]) -> Self {
        self.hanging
            .extend(destinations.iter().map(|d| d.to_string()));
        self
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SenderGateway for StubGateway {
    async fn send(&self, destination: &str, message: &str) -> Result<(), SendFailure> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.high_water.fetch_max(now, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((destination.to_string(), message.to_string()));

        if self.hanging.contains(destination) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        tokio::time::sleep(self.delay).await;

        if self.failing.contains(destination) {
            return Err(SendFailure::Rejected(format!("no signal for {}", destination)));
        }
        Ok(())
    }
}

pub fn engine_with(gateway: Arc<StubGateway>, pool_size: usize, queue_depth: usize) -> DispatchEngine {
    DispatchEngine::new(
        gateway,
        WorkerPool::new(pool_size, queue_depth),
        Arc::new(InMemoryJobRegistry::new()),
        Arc::new(StatsAggregator::new()),
    )
}

pub fn numbers(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("55119{:08}", i)).collect()
}
