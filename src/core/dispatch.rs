use crate::core::pool::{Reservation, WorkerPool};
use crate::core::registry::InMemoryJobRegistry;
use crate::core::resolver::resolve_single;
use crate::core::stats::StatsAggregator;
use crate::domain::model::{AsyncJobRecord, BatchResult, JobState, SendJob, SendOutcome, Stats};
use crate::domain::ports::{ConfigProvider, JobStore, SenderGateway};
use crate::utils::error::{Result, SendFailure};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BATCH_WORKERS: usize = 5;

/// 發送引擎：所有發送都透過同一個工作池執行
#[derive(Clone)]
pub struct DispatchEngine {
    gateway: Arc<dyn SenderGateway>,
    pool: WorkerPool,
    registry: Arc<dyn JobStore>,
    stats: Arc<StatsAggregator>,
    send_timeout: Duration,
}

impl DispatchEngine {
    pub fn new(
        gateway: Arc<dyn SenderGateway>,
        pool: WorkerPool,
        registry: Arc<dyn JobStore>,
        stats: Arc<StatsAggregator>,
    ) -> Self {
        Self {
            gateway,
            pool,
            registry,
            stats,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C, gateway: Arc<dyn SenderGateway>) -> Self {
        let pool = WorkerPool::new(config.pool_size(), config.queue_depth());
        Self::new(
            gateway,
            pool,
            Arc::new(InMemoryJobRegistry::new()),
            Arc::new(StatsAggregator::new()),
        )
        .with_send_timeout(config.send_timeout())
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn registry(&self) -> &Arc<dyn JobStore> {
        &self.registry
    }

    pub fn stats(&self) -> Stats {
        self.stats.snapshot(self.pool.active())
    }

    pub fn job_status(&self, job_id: &str) -> Result<AsyncJobRecord> {
        self.registry.get(job_id)
    }

    /// 同步發送一則簡訊；任何失敗都會變成 status=error 的結果
    ///
    /// 發送在獨立的 task 中執行：呼叫端被取消時只是不再等待，發送仍會完成並計入統計。
    pub async fn send_one(&self, destination: &str, message: &str, timeout: Duration) -> SendOutcome {
        let reservation = self.pool.reserve();
        let engine = self.clone();
        let (to, text) = (destination.to_string(), message.to_string());
        let handle = tokio::spawn(async move {
            engine.send_reserved(reservation, &to, &text, timeout).await
        });

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(to = %destination, error = %e, "Send task failed");
                self.fail_without_send(destination, message, format!("Worker task failed: {}", e))
            }
        }
    }

    /// 建立非同步工作並立即回傳 id（需在 tokio runtime 內呼叫）
    pub fn send_one_async(&self, destination: &str, message: &str) -> Result<String> {
        let job = resolve_single(destination, message)?;
        let reservation = self.pool.try_reserve()?;
        let job_id = self.registry.create();

        tracing::info!(job_id = %job_id, to = %job.destination, "📨 Async SMS queued");

        let engine = self.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            engine.run_async_job(id, job, reservation).await;
        });

        Ok(job_id)
    }

    /// 並行發送整批工作，結果依照 origin_index 排序
    ///
    /// 整批在背景 task 中執行，呼叫端被取消不會中斷已排程的發送。
    pub async fn send_batch(&self, jobs: Vec<SendJob>, max_workers: usize) -> BatchResult {
        let batch_id = Uuid::new_v4().to_string();
        let workers = self.pool.effective_workers(max_workers);
        let fallback = jobs.clone();

        let engine = self.clone();
        let id = batch_id.clone();
        let handle = tokio::spawn(async move { engine.run_batch(id, jobs, max_workers, workers).await });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(batch_id = %batch_id, error = %e, "Batch dispatch task failed");
                let outcomes = fallback
                    .iter()
                    .map(|job| {
                        self.fail_without_send(
                            &job.destination,
                            &job.message,
                            format!("Worker task failed: {}", e),
                        )
                    })
                    .collect();
                BatchResult::from_outcomes(batch_id, outcomes)
            }
        }
    }

    async fn run_batch(
        self,
        batch_id: String,
        jobs: Vec<SendJob>,
        max_workers: usize,
        workers: usize,
    ) -> BatchResult {
        let started = Instant::now();

        tracing::info!(
            batch_id = %batch_id,
            total = jobs.len(),
            requested_workers = max_workers,
            workers,
            "🚀 Batch dispatch started"
        );

        let limiter = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::with_capacity(jobs.len());

        for job in jobs {
            let engine = self.clone();
            let limiter = Arc::clone(&limiter);
            let task_job = job.clone();

            let handle = tasks.spawn(async move {
                // 先取得批次自己的名額，再向共用工作池排隊
                let outcome = match limiter.acquire_owned().await {
                    Ok(_slot) => {
                        engine
                            .send_reserved(
                                engine.pool.reserve(),
                                &task_job.destination,
                                &task_job.message,
                                engine.send_timeout,
                            )
                            .await
                    }
                    Err(e) => engine.fail_without_send(&task_job.destination, &task_job.message, e.to_string()),
                };
                (task_job.origin_index, outcome)
            });
            in_flight.insert(handle.id(), job);
        }

        let mut results = Vec::with_capacity(in_flight.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, pair)) => {
                    in_flight.remove(&id);
                    results.push(pair);
                }
                Err(e) => {
                    if let Some(job) = in_flight.remove(&e.id()) {
                        tracing::error!(batch_id = %batch_id, to = %job.destination, error = %e, "Batch worker task failed");
                        let outcome = self.fail_without_send(
                            &job.destination,
                            &job.message,
                            format!("Worker task failed: {}", e),
                        );
                        results.push((job.origin_index, outcome));
                    }
                }
            }
        }

        results.sort_by_key(|(origin_index, _)| *origin_index);
        let result = BatchResult::from_outcomes(
            batch_id,
            results.into_iter().map(|(_, outcome)| outcome).collect(),
        );

        tracing::info!(
            batch_id = %result.batch_id,
            total = result.total,
            sent = result.sent,
            errors = result.errors,
            elapsed = ?started.elapsed(),
            "✅ Batch dispatch finished"
        );
        result
    }

    /// 關閉工作池：已在執行的發送會完成，等待中的會以錯誤結束
    pub fn shutdown(&self) {
        tracing::info!("Closing worker pool");
        self.pool.close();
    }

    async fn run_async_job(self, job_id: String, job: SendJob, reservation: Reservation) {
        let guard = match reservation.acquire().await {
            Ok(guard) => guard,
            Err(e) => {
                let outcome = self.fail_without_send(&job.destination, &job.message, e.to_string());
                self.advance(&job_id, JobState::InProgress, None);
                self.advance(&job_id, JobState::Failed, Some(outcome));
                return;
            }
        };

        self.advance(&job_id, JobState::InProgress, None);
        let outcome = self
            .execute(&job.destination, &job.message, self.send_timeout)
            .await;

        let state = if outcome.is_sent() {
            JobState::Completed
        } else {
            JobState::Failed
        };
        self.advance(&job_id, state, Some(outcome));
        drop(guard);
    }

    async fn send_reserved(
        &self,
        reservation: Reservation,
        destination: &str,
        message: &str,
        timeout: Duration,
    ) -> SendOutcome {
        match reservation.acquire().await {
            Ok(_guard) => self.execute(destination, message, timeout).await,
            Err(e) => self.fail_without_send(destination, message, e.to_string()),
        }
    }

    /// 呼叫 gateway 一次；逾時由 hard deadline 強制結束
    async fn execute(&self, destination: &str, message: &str, timeout: Duration) -> SendOutcome {
        tracing::debug!(to = %destination, "Sending SMS");
        let started = Instant::now();
        let result = tokio::time::timeout(timeout, self.gateway.send(destination, message)).await;
        let duration = started.elapsed().as_secs_f64();

        let outcome = match result {
            Ok(Ok(())) => {
                tracing::info!(to = %destination, duration_secs = duration, "SMS sent");
                SendOutcome::sent(destination, message, duration)
            }
            Ok(Err(failure)) => {
                tracing::warn!(to = %destination, error = %failure, "SMS send failed");
                SendOutcome::error(destination, message, duration, failure.to_string())
            }
            Err(_) => {
                let failure = SendFailure::Timeout {
                    seconds: timeout.as_secs_f64(),
                };
                tracing::warn!(to = %destination, error = %failure, "SMS send timed out");
                SendOutcome::error(destination, message, duration, failure.to_string())
            }
        };

        self.stats.record(&outcome);
        outcome
    }

    fn fail_without_send(&self, destination: &str, message: &str, detail: String) -> SendOutcome {
        tracing::warn!(to = %destination, detail = %detail, "SMS not sent");
        let outcome = SendOutcome::error(destination, message, 0.0, detail);
        self.stats.record(&outcome);
        outcome
    }

    fn advance(&self, job_id: &str, state: JobState, outcome: Option<SendOutcome>) {
        if let Err(e) = self.registry.transition(job_id, state, outcome) {
            tracing::error!(job_id, error = %e, "Job state update rejected");
        }
    }
}
