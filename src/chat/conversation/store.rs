//! 会话持久化客户端接口

use crate::chat::conversation::types::{ConversationRecord, OperationAck};
use crate::chat::types::{ChatMessage, MessageRole};
use anyhow::Result;
use async_trait::async_trait;

/// 新建会话时的可选参数
#[derive(Debug, Clone, Default)]
pub struct CreateConversationParams {
    /// 标题，为空时由后端自动生成
    pub title: Option<String>,
    pub config_id: Option<i64>,
    pub model_id: Option<String>,
    pub project_id: Option<i64>,
}

/// 持久化客户端（协调器消费的协作方）
///
/// 每个方法都是一次网络调用：成功返回载荷，失败返回错误，不做自动重试
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// 用完整消息列表创建新会话
    async fn create_conversation(
        &self,
        messages: &[ChatMessage],
        params: &CreateConversationParams,
    ) -> Result<ConversationRecord>;

    /// 向已有会话追加一条消息
    async fn append_message(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
        model_used: Option<&str>,
    ) -> Result<OperationAck>;
}
