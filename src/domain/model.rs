use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一筆已解析好的發送工作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendJob {
    pub destination: String,
    pub message: String,
    /// 在原始收件人清單中的位置，用來還原結果順序
    pub origin_index: usize,
}

impl SendJob {
    pub fn new(destination: impl Into<String>, message: impl Into<String>, origin_index: usize) -> Self {
        Self {
            destination: destination.into(),
            message: message.into(),
            origin_index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Sent,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendOutcome {
    #[serde(rename = "to")]
    pub destination: String,
    pub message: String,
    pub status: SendStatus,
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "detail", default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl SendOutcome {
    pub fn sent(destination: &str, message: &str, duration_seconds: f64) -> Self {
        Self {
            destination: destination.to_string(),
            message: message.to_string(),
            status: SendStatus::Sent,
            duration_seconds,
            timestamp: Utc::now(),
            error_detail: None,
        }
    }

    pub fn error(
        destination: &str,
        message: &str,
        duration_seconds: f64,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            destination: destination.to_string(),
            message: message.to_string(),
            status: SendStatus::Error,
            duration_seconds,
            timestamp: Utc::now(),
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status == SendStatus::Sent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobState {
    /// queued -> in_progress -> {completed, failed}，不可倒退
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Queued, JobState::InProgress)
                | (JobState::InProgress, JobState::Completed)
                | (JobState::InProgress, JobState::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::InProgress => "in_progress",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncJobRecord {
    pub id: String,
    pub state: JobState,
    pub outcome: Option<SendOutcome>,
    pub submitted_at: DateTime<Utc>,
}

impl AsyncJobRecord {
    pub fn queued(id: String) -> Self {
        Self {
            id,
            state: JobState::Queued,
            outcome: None,
            submitted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub total: usize,
    pub sent: usize,
    pub errors: usize,
    pub results: Vec<SendOutcome>,
}

impl BatchResult {
    /// results 必須已按照 origin_index 排好
    pub fn from_outcomes(batch_id: String, results: Vec<SendOutcome>) -> Self {
        let sent = results.iter().filter(|o| o.is_sent()).count();
        Self {
            batch_id,
            total: results.len(),
            sent,
            errors: results.len() - sent,
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_sent: u64,
    pub total_errors: u64,
    pub total_duration: f64,
    pub active_workers: usize,
    pub started_at: DateTime<Utc>,
}

impl Stats {
    pub fn total_requests(&self) -> u64 {
        self.total_sent + self.total_errors
    }

    /// 成功率（百分比，四捨五入到小數兩位）
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        round2(self.total_sent as f64 / total as f64 * 100.0)
    }

    pub fn average_duration(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        self.total_duration / total as f64
    }

    pub fn uptime_seconds(&self) -> f64 {
        round2(self.elapsed_seconds())
    }

    /// 每分鐘成功送出的平均數量
    pub fn sent_per_minute(&self) -> f64 {
        let elapsed = self.elapsed_seconds();
        if elapsed <= 0.0 {
            return 0.0;
        }
        round2(self.total_sent as f64 / (elapsed / 60.0))
    }

    fn elapsed_seconds(&self) -> f64 {
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_milliseconds().max(0) as f64 / 1000.0
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 批次請求中的一個收件人：純號碼或帶個人化訊息的物件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipient {
    Plain(String),
    Personalized {
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    /// 其他任何 JSON 值，交給 resolver 以索引回報錯誤
    Invalid(serde_json::Value),
}

impl Recipient {
    pub fn plain(destination: impl Into<String>) -> Self {
        Recipient::Plain(destination.into())
    }

    pub fn personalized(destination: impl Into<String>, message: Option<&str>) -> Self {
        Recipient::Personalized {
            to: Some(destination.into()),
            message: message.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_is_monotonic() {
        assert!(JobState::Queued.can_transition_to(JobState::InProgress));
        assert!(JobState::InProgress.can_transition_to(JobState::Completed));
        assert!(JobState::InProgress.can_transition_to(JobState::Failed));

        assert!(!JobState::Queued.can_transition_to(JobState::Completed));
        assert!(!JobState::InProgress.can_transition_to(JobState::Queued));
        assert!(!JobState::Completed.can_transition_to(JobState::Failed));
        assert!(!JobState::Failed.can_transition_to(JobState::InProgress));
    }

    #[test]
    fn test_recipient_deserialization() {
        let raw = serde_json::json!(["A", {"to": "B", "message": "hi"}, {"to": "C"}, {}]);
        let recipients: Vec<Recipient> = serde_json::from_value(raw).unwrap();

        assert_eq!(recipients[0], Recipient::plain("A"));
        assert_eq!(recipients[1], Recipient::personalized("B", Some("hi")));
        assert_eq!(recipients[2], Recipient::personalized("C", None));
        assert_eq!(
            recipients[3],
            Recipient::Personalized {
                to: None,
                message: None
            }
        );
    }

    #[test]
    fn test_unexpected_recipient_shapes_still_deserialize() {
        let raw = serde_json::json!([123456, null, {"to": 5511}]);
        let recipients: Vec<Recipient> = serde_json::from_value(raw).unwrap();

        assert_eq!(recipients[0], Recipient::Invalid(serde_json::json!(123456)));
        assert_eq!(recipients[1], Recipient::Invalid(serde_json::Value::Null));
        assert!(matches!(recipients[2], Recipient::Invalid(_)));
    }

    #[test]
    fn test_outcome_serializes_with_wire_names() {
        let outcome = SendOutcome::error("5511999999999", "hello", 0.5, "boom");
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["to"], "5511999999999");
        assert_eq!(json["status"], "error");
        assert_eq!(json["detail"], "boom");
        assert_eq!(json["duration"], 0.5);

        let sent = serde_json::to_value(SendOutcome::sent("1", "m", 0.1)).unwrap();
        assert!(sent.get("detail").is_none());
    }

    #[test]
    fn test_batch_result_counts() {
        let results = vec![
            SendOutcome::sent("A", "m", 0.1),
            SendOutcome::error("B", "m", 0.2, "failed"),
            SendOutcome::sent("C", "m", 0.1),
        ];
        let batch = BatchResult::from_outcomes("b-1".into(), results);

        assert_eq!(batch.total, 3);
        assert_eq!(batch.sent, 2);
        assert_eq!(batch.errors, 1);
    }

    #[test]
    fn test_stats_derived_values() {
        let stats = Stats {
            total_sent: 2,
            total_errors: 1,
            total_duration: 3.0,
            active_workers: 0,
            started_at: Utc::now(),
        };
        assert_eq!(stats.total_requests(), 3);
        assert_eq!(stats.success_rate(), 66.67);
        assert_eq!(stats.average_duration(), 1.0);
    }

    #[test]
    fn test_sent_per_minute() {
        let stats = Stats {
            total_sent: 30,
            total_errors: 5,
            total_duration: 0.0,
            active_workers: 0,
            started_at: Utc::now() - chrono::Duration::minutes(10),
        };
        let rate = stats.sent_per_minute();
        assert!((rate - 3.0).abs() < 0.01, "rate was {}", rate);

        let fresh = Stats {
            started_at: Utc::now() + chrono::Duration::seconds(5),
            ..stats
        };
        assert_eq!(fresh.sent_per_minute(), 0.0);
    }
}
