use crate::domain::model::{AsyncJobRecord, JobState, SendOutcome};
use crate::domain::ports::JobStore;
use crate::utils::error::{DispatchError, Result};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// 記憶體內的工作登記表，紀錄會保留到行程結束
#[derive(Debug, Default)]
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<String, AsyncJobRecord>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobRegistry {
    fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let record = AsyncJobRecord::queued(id.clone());

        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), record);

        tracing::debug!(job_id = %id, "Job registered");
        id
    }

    fn transition(&self, job_id: &str, state: JobState, outcome: Option<SendOutcome>) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);

        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| DispatchError::NotFoundError {
                job_id: job_id.to_string(),
            })?;

        if !record.state.can_transition_to(state) {
            return Err(DispatchError::InvalidTransitionError {
                job_id: job_id.to_string(),
                from: record.state.to_string(),
                to: state.to_string(),
            });
        }

        tracing::debug!(job_id, from = %record.state, to = %state, "Job state changed");
        record.state = state;
        if outcome.is_some() {
            record.outcome = outcome;
        }
        Ok(())
    }

    fn get(&self, job_id: &str) -> Result<AsyncJobRecord> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .cloned()
            .ok_or_else(|| DispatchError::NotFoundError {
                job_id: job_id.to_string(),
            })
    }

    fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
