pub mod dispatch;
pub mod pool;
pub mod registry;
pub mod resolver;
pub mod stats;

pub use crate::domain::model::{
    AsyncJobRecord, BatchResult, JobState, Recipient, SendJob, SendOutcome, SendStatus, Stats,
};
pub use crate::domain::ports::{ConfigProvider, JobStore, SenderGateway};
pub use crate::utils::error::Result;
