use crate::domain::model::{SendOutcome, Stats};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
struct Counters {
    total_sent: u64,
    total_errors: u64,
    total_duration: f64,
}

/// 全行程共用的發送統計，由呼叫端建立一份後注入引擎
#[derive(Debug)]
pub struct StatsAggregator {
    counters: Mutex<Counters>,
    started_at: DateTime<Utc>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            started_at: Utc::now(),
        }
    }

    pub fn record(&self, outcome: &SendOutcome) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        if outcome.is_sent() {
            counters.total_sent += 1;
        } else {
            counters.total_errors += 1;
        }
        counters.total_duration += outcome.duration_seconds;
    }

    /// active_workers 由工作池觀測後傳入
    pub fn snapshot(&self, active_workers: usize) -> Stats {
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        Stats {
            total_sent: counters.total_sent,
            total_errors: counters.total_errors,
            total_duration: counters.total_duration,
            active_workers,
            started_at: self.started_at,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_splits_sent_and_errors() {
        let stats = StatsAggregator::new();
        stats.record(&SendOutcome::sent("A", "m", 0.25));
        stats.record(&SendOutcome::error("B", "m", 0.5, "failed"));

        let snapshot = stats.snapshot(3);
        assert_eq!(snapshot.total_sent, 1);
        assert_eq!(snapshot.total_errors, 1);
        assert_eq!(snapshot.total_duration, 0.75);
        assert_eq!(snapshot.active_workers, 3);
    }

    #[test]
    fn test_concurrent_recording_loses_nothing() {
        let stats = Arc::new(StatsAggregator::new());

        let handles: Vec<_> = (0..10)
            .map(|worker| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        // 每個 worker 有 10 筆失敗
                        let outcome = if i % 10 == worker % 10 {
                            SendOutcome::error("A", "m", 0.5, "failed")
                        } else {
                            SendOutcome::sent("A", "m", 0.25)
                        };
                        stats.record(&outcome);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.snapshot(0);
        assert_eq!(snapshot.total_sent, 900);
        assert_eq!(snapshot.total_errors, 100);
        // 0.25 與 0.5 都能精確表示，加總不會有誤差
        assert_eq!(snapshot.total_duration, 900.0 * 0.25 + 100.0 * 0.5);
    }
}
