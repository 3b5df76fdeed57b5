use crate::domain::model::{Recipient, SendJob};
use crate::utils::error::{DispatchError, Result};

/// 把批次請求的收件人清單轉成依序排列的 SendJob
///
/// 純號碼使用預設訊息；個人化項目優先使用自己的訊息，沒有時才退回預設訊息。
/// 任何一筆不合法都會讓整個批次失敗，錯誤會帶上該筆的索引。
pub fn resolve_recipients(
    recipients: &[Recipient],
    default_message: Option<&str>,
) -> Result<Vec<SendJob>> {
    if recipients.is_empty() {
        return Err(DispatchError::validation("Recipient list cannot be empty"));
    }

    let default_message = default_message.filter(|m| !m.trim().is_empty());

    recipients
        .iter()
        .enumerate()
        .map(|(index, recipient)| resolve_one(index, recipient, default_message))
        .collect()
}

fn resolve_one(index: usize, recipient: &Recipient, default_message: Option<&str>) -> Result<SendJob> {
    let (destination, own_message) = match recipient {
        Recipient::Plain(destination) => (Some(destination.as_str()), None),
        Recipient::Personalized { to, message } => (to.as_deref(), message.as_deref()),
        Recipient::Invalid(value) => {
            return Err(DispatchError::at_recipient(
                index,
                format!(
                    "must be a phone number string or an object with 'to' and 'message', got {}",
                    value
                ),
            ));
        }
    };

    let destination = destination
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| DispatchError::at_recipient(index, "destination ('to') cannot be empty"))?;

    let message = match own_message {
        Some(m) if !m.trim().is_empty() => m,
        Some(_) => {
            return Err(DispatchError::at_recipient(index, "message cannot be empty"));
        }
        None => default_message.ok_or_else(|| {
            DispatchError::at_recipient(index, "no message given and no default message supplied")
        })?,
    };

    Ok(SendJob::new(destination, message, index))
}

/// 單筆發送的欄位檢查
pub fn resolve_single(destination: &str, message: &str) -> Result<SendJob> {
    if destination.trim().is_empty() {
        return Err(DispatchError::validation("Field 'to' cannot be empty"));
    }
    if message.trim().is_empty() {
        return Err(DispatchError::validation("Field 'message' cannot be empty"));
    }
    Ok(SendJob::new(destination.trim(), message, 0))
}
