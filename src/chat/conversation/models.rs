//! 会话保存模型定义

use crate::chat::conversation::store::CreateConversationParams;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单个会话的保存状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSaveState {
    /// 会话 ID（后端创建时分配）
    #[serde(rename = "conversationId")]
    pub conversation_id: i64,
    /// 已确认持久化的前缀消息数量
    #[serde(rename = "lastSavedMessageCount")]
    pub last_saved_message_count: usize,
    /// 最近一次更新状态的时间
    #[serde(rename = "lastSavedAt")]
    pub last_saved_at: DateTime<Utc>,
}

impl ConversationSaveState {
    pub fn new(conversation_id: i64, last_saved_message_count: usize) -> Self {
        Self {
            conversation_id,
            last_saved_message_count,
            last_saved_at: Utc::now(),
        }
    }
}

/// smart save 的可选参数
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// 新建会话的标题，为空时由后端生成
    pub title: Option<String>,
    /// 助手/配置 ID
    pub config_id: Option<i64>,
    /// 使用的模型，新建时作为会话模型，追加时作为消息的 model_used
    pub model_used: Option<String>,
    /// 所属项目（文件夹）
    pub project_id: Option<i64>,
}

impl SaveOptions {
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model_used: Some(model.into()),
            ..Default::default()
        }
    }

    pub(crate) fn create_params(&self) -> CreateConversationParams {
        CreateConversationParams {
            title: self.title.clone(),
            config_id: self.config_id,
            model_id: self.model_used.clone(),
            project_id: self.project_id,
        }
    }
}

/// smart save 结果
///
/// `is_new_conversation == false` 且 ID 未变时表示“未执行任何操作”，调用方可稍后重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartSaveResult {
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<i64>,
    #[serde(rename = "isNewConversation")]
    pub is_new_conversation: bool,
}

impl SmartSaveResult {
    pub(crate) fn unchanged(conversation_id: Option<i64>) -> Self {
        Self {
            conversation_id,
            is_new_conversation: false,
        }
    }

    pub(crate) fn created(conversation_id: i64) -> Self {
        Self {
            conversation_id: Some(conversation_id),
            is_new_conversation: true,
        }
    }
}

/// 后端 API 配置
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API 基础 URL，例如 `http://localhost:8000/api`
    pub api_base_url: String,
    /// Bearer token
    pub token: String,
    /// 单次请求超时（秒）
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// 创建默认配置
    pub fn new(token: String) -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            token,
            timeout_secs: 30,
        }
    }

    pub fn with_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }
}
