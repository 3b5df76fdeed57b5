use crate::domain::model::{AsyncJobRecord, JobState, SendOutcome};
use crate::utils::error::{Result, SendFailure};
use async_trait::async_trait;
use std::time::Duration;

/// 實際發送一則簡訊的外部機制
#[async_trait]
pub trait SenderGateway: Send + Sync {
    async fn send(&self, destination: &str, message: &str) -> std::result::Result<(), SendFailure>;
}

/// 非同步工作的狀態儲存
pub trait JobStore: Send + Sync {
    fn create(&self) -> String;
    fn transition(&self, job_id: &str, state: JobState, outcome: Option<SendOutcome>) -> Result<()>;
    fn get(&self, job_id: &str) -> Result<AsyncJobRecord>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait ConfigProvider: Send + Sync {
    fn bind_address(&self) -> String;
    fn pool_size(&self) -> usize;
    fn default_batch_workers(&self) -> usize;
    fn queue_depth(&self) -> usize;
    fn send_timeout(&self) -> Duration;
    fn send_command(&self) -> &str;
    fn send_args(&self) -> &[String];
}
