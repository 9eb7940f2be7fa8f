//! 会话 API DTO（请求和响应结构体）

use crate::chat::types::{ChatMessage, MessageRole};
use serde::{Deserialize, Serialize};

/// 新建会话请求
#[derive(Debug, Clone, Serialize)]
pub struct CreateConversationReq<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    pub messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
}

/// 追加消息请求
#[derive(Debug, Clone, Serialize)]
pub struct AppendMessageReq<'a> {
    pub role: MessageRole,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<&'a str>,
}

/// 后端返回的会话记录（至少包含 id）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message_count: Option<usize>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// 追加消息的后端确认
///
/// 协调器不解读确认内容，只透传给调用方；后端可能返回整条消息记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationAck {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub conversation_id: Option<i64>,
    #[serde(default)]
    pub role: Option<MessageRole>,
    #[serde(default)]
    pub created_at: Option<String>,
}
