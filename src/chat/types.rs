use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// 消息发送者身份
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 聊天消息（内存中的有序消息序列元素）
///
/// 协调器只关心 `role` 和 `content`，其余字段由 UI 层自行维护
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }
}

/// 后端错误响应体（FastAPI 风格：`{"detail": ...}`）
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// 从错误响应 body 中提取可读的错误信息
///
/// `detail` 可能是字符串，也可能是校验错误数组，数组时直接输出 JSON
fn extract_error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Some(serde_json::Value::String(s)),
        }) => s,
        Ok(ErrorBody {
            detail: Some(other),
        }) => other.to_string(),
        _ => body.to_string(),
    }
}

/// 通用 HTTP 响应处理函数：检查状态码并直接反序列化为目标结构体
///
/// 所有会话 API 共用此方法
pub async fn handle_http_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> anyhow::Result<T> {
    use anyhow::Context;

    let status = response.status();

    // body 只能读取一次
    let body_bytes = response.bytes().await.context("读取响应 body 失败")?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        let detail = extract_error_detail(&body_str);
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 错误信息: {}",
            operation_name, status, detail
        );
        return Err(anyhow::anyhow!("HTTP 错误 {}: {}", status, detail));
    }
    info!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    serde_json::from_slice::<T>(&body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        anyhow::anyhow!("反序列化响应失败: {:?}", e)
    })
}
