//! 会话 HTTP API 客户端
//!
//! 只实现持久化客户端约定的两个调用：新建会话、追加消息

use crate::chat::conversation::models::ApiConfig;
use crate::chat::conversation::store::{ConversationStore, CreateConversationParams};
use crate::chat::conversation::types::{
    AppendMessageReq, ConversationRecord, CreateConversationReq, OperationAck,
};
use crate::chat::types::{handle_http_response, ChatMessage, MessageRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// 会话相关的 HTTP API 客户端
pub struct ConversationApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl ConversationApi {
    /// 创建新的会话 API 客户端
    ///
    /// `client` 应该已经在外部配置好认证 header
    pub fn new(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 根据配置创建客户端（token 通过 default_headers 自动添加）
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let http_client = reqwest::ClientBuilder::new()
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.token))
                        .context("无效的 token")?,
                );
                headers
            })
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("创建 HTTP 客户端失败")?;

        Ok(Self::new(http_client, config.api_base_url.clone()))
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }
}

#[async_trait]
impl ConversationStore for ConversationApi {
    async fn create_conversation(
        &self,
        messages: &[ChatMessage],
        params: &CreateConversationParams,
    ) -> Result<ConversationRecord> {
        let request_id = Uuid::new_v4().to_string();
        let url = format!("{}/conversations/", self.api_base_url);

        info!(
            "[ConvAPI] 📡 请求新建会话，消息数: {}",
            messages.len()
        );
        debug!(
            "[ConvAPI]   请求URL: {}, 请求ID: {}, 标题: {:?}, 配置ID: {:?}, 模型: {:?}, 项目ID: {:?}",
            url, request_id, params.title, params.config_id, params.model_id, params.project_id
        );

        let body = CreateConversationReq {
            title: params.title.as_deref(),
            messages,
            config_id: params.config_id,
            model_used: params.model_id.as_deref(),
            project_id: params.project_id,
        };

        let response = self
            .client
            .post(&url)
            .header("X-Request-ID", &request_id)
            .json(&body)
            .send()
            .await
            .context("请求失败")?;

        let record = handle_http_response::<ConversationRecord>(response, "新建会话").await?;

        info!(
            "[ConvAPI] ✅ 新建会话成功，conversationID={}, 标题: {:?}",
            record.id, record.title
        );
        Ok(record)
    }

    async fn append_message(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
        model_used: Option<&str>,
    ) -> Result<OperationAck> {
        let request_id = Uuid::new_v4().to_string();
        let url = format!(
            "{}/conversations/{}/messages",
            self.api_base_url, conversation_id
        );

        debug!(
            "[ConvAPI] 📡 追加消息，conversationID={}, role={}, 长度: {}, 请求ID: {}",
            conversation_id,
            role,
            content.len(),
            request_id
        );

        let response = self
            .client
            .post(&url)
            .header("X-Request-ID", &request_id)
            .json(&AppendMessageReq {
                role,
                content,
                model_used,
            })
            .send()
            .await
            .context("请求失败")?;

        handle_http_response::<OperationAck>(response, "追加消息").await
    }
}
