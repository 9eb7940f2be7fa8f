//! 会话保存协调器
//!
//! 聊天界面会从多个互不协调的信号触发保存（流式回复结束、定时自动保存、手动保存按钮、
//! 离开页面）。协调器保证同一会话同一时刻最多只有一个保存相关的网络操作，重复触发
//! 直接变成空操作（先到先得），并且只发送尚未持久化的消息后缀。

use crate::chat::conversation::api::ConversationApi;
use crate::chat::conversation::listener::{EmptySaveListener, SaveListener};
use crate::chat::conversation::models::{
    ApiConfig, ConversationSaveState, SaveOptions, SmartSaveResult,
};
use crate::chat::conversation::store::ConversationStore;
use crate::chat::conversation::tracker::{OperationKey, OperationTracker};
use crate::chat::conversation::types::OperationAck;
use crate::chat::error::{Result, SaveError};
use crate::chat::types::ChatMessage;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// 会话保存协调器
///
/// 每个聊天会话持有一个实例（通过 `Arc` 在任务间共享）
pub struct SaveCoordinator {
    /// 持久化客户端
    store: Arc<dyn ConversationStore>,
    /// 保存监听器
    listener: Arc<dyn SaveListener>,
    /// 进行中的操作
    tracker: OperationTracker,
    /// conversation_id -> 保存状态
    states: Mutex<HashMap<i64, ConversationSaveState>>,
}

impl SaveCoordinator {
    /// 创建新的协调器（使用默认空监听器）
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self::with_listener(store, Arc::new(EmptySaveListener))
    }

    /// 创建新的协调器（带自定义监听器）
    pub fn with_listener(
        store: Arc<dyn ConversationStore>,
        listener: Arc<dyn SaveListener>,
    ) -> Self {
        Self {
            store,
            listener,
            tracker: OperationTracker::new(),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// 根据 API 配置创建协调器（使用 HTTP 持久化客户端）
    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        info!(
            "[SaveCoord] 创建保存协调器，API: {}",
            config.api_base_url
        );
        let api = ConversationApi::from_config(config)?;
        Ok(Self::new(Arc::new(api)))
    }

    fn states(&self) -> MutexGuard<'_, HashMap<i64, ConversationSaveState>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 追加单条消息
    ///
    /// 同一会话已有单条追加在进行中时立即返回 `SaveError::Busy`，不排队
    pub async fn append_message(
        &self,
        conversation_id: i64,
        message: &ChatMessage,
        model_used: Option<&str>,
    ) -> Result<OperationAck> {
        let key = OperationKey::Append(conversation_id);
        let Some(_guard) = self.tracker.try_begin(key.clone()) else {
            warn!("[SaveCoord] ⚠️ 操作进行中，拒绝追加: {}", key);
            return Err(SaveError::Busy { key });
        };

        self.append_message_unchecked(conversation_id, message, model_used)
            .await
    }

    /// 调用方必须已持有 `Append(conversation_id)` 标记
    async fn append_message_unchecked(
        &self,
        conversation_id: i64,
        message: &ChatMessage,
        model_used: Option<&str>,
    ) -> Result<OperationAck> {
        debug!(
            "[SaveCoord] 追加消息，conversationID={}, role={}, model={:?}",
            conversation_id, message.role, model_used
        );
        let ack = self
            .store
            .append_message(conversation_id, message.role, &message.content, model_used)
            .await?;
        Ok(ack)
    }

    /// 按顺序逐条追加多条消息
    ///
    /// 已有批量追加在进行中时静默返回。任何一条失败即中止，之前的消息保持已持久化状态
    pub async fn append_messages(
        &self,
        conversation_id: i64,
        messages: &[ChatMessage],
        model_used: Option<&str>,
    ) -> Result<()> {
        self.append_messages_tracked(conversation_id, messages, model_used)
            .await
            .map(|_| ())
    }

    /// 返回 `Some(追加数量)`；被去重跳过时返回 None
    async fn append_messages_tracked(
        &self,
        conversation_id: i64,
        messages: &[ChatMessage],
        model_used: Option<&str>,
    ) -> Result<Option<usize>> {
        let key = OperationKey::AppendMany(conversation_id);
        let Some(guard) = self.tracker.try_begin(key.clone()) else {
            warn!("[SaveCoord] ⚠️ 批量追加已在进行中，跳过: {}", key);
            return Ok(None);
        };
        if messages.is_empty() {
            return Ok(Some(0));
        }
        // 整个批量期间持有单条追加标记：直接调用 append_message 会收到 Busy，
        // 而单条追加进行中时批量追加静默跳过，不会中途失败
        let append_key = OperationKey::Append(conversation_id);
        let Some(_append_guard) = self.tracker.try_begin(append_key.clone()) else {
            warn!("[SaveCoord] ⚠️ 单条追加进行中，跳过批量追加: {}", append_key);
            return Ok(None);
        };

        info!(
            "[SaveCoord] 📤 开始追加 {} 条消息，conversationID={}",
            messages.len(),
            conversation_id
        );
        self.listener.on_save_started(key.to_string()).await;

        // 逐条 await，保证后端看到的顺序与输入一致
        for (index, message) in messages.iter().enumerate() {
            if let Err(e) = self
                .append_message_unchecked(conversation_id, message, model_used)
                .await
            {
                error!(
                    "[SaveCoord] ❌ 追加失败，conversationID={}, 已追加 {}/{}: {}",
                    conversation_id,
                    index,
                    messages.len(),
                    e
                );
                self.listener
                    .on_save_failed(key.to_string(), e.to_string())
                    .await;
                return Err(e);
            }
        }

        if guard.is_active() {
            if let Some(state) = self.states().get_mut(&conversation_id) {
                state.last_saved_message_count += messages.len();
                state.last_saved_at = Utc::now();
            }
        }

        info!(
            "[SaveCoord] ✅ 追加完成，conversationID={}, 消息数: {}",
            conversation_id,
            messages.len()
        );
        self.listener
            .on_messages_appended(conversation_id, messages.len())
            .await;
        Ok(Some(messages.len()))
    }

    /// 追加 `current_messages[stored_message_count..]`
    ///
    /// 没有新消息时不发起任何请求；成功后已保存数量直接设为 `current_messages.len()`
    pub async fn update_with_new_messages(
        &self,
        conversation_id: i64,
        current_messages: &[ChatMessage],
        stored_message_count: usize,
        model_used: Option<&str>,
    ) -> Result<()> {
        let key = OperationKey::Update(conversation_id);
        let Some(guard) = self.tracker.try_begin(key.clone()) else {
            warn!("[SaveCoord] ⚠️ 更新已在进行中，跳过: {}", key);
            return Ok(());
        };

        if stored_message_count > current_messages.len() {
            warn!(
                "[SaveCoord] ⚠️ 已保存数量 {} 大于当前消息数 {}，视为没有新消息，conversationID={}",
                stored_message_count,
                current_messages.len(),
                conversation_id
            );
            return Ok(());
        }
        let new_messages = &current_messages[stored_message_count..];
        if new_messages.is_empty() {
            debug!(
                "[SaveCoord] 没有新消息需要保存，conversationID={}",
                conversation_id
            );
            return Ok(());
        }

        let appended = self
            .append_messages_tracked(conversation_id, new_messages, model_used)
            .await?;
        if appended.is_none() {
            // 同一会话有其他追加在进行中，本次不发请求也不计数
            return Ok(());
        }

        if guard.is_active() {
            self.states()
                .entry(conversation_id)
                .and_modify(|state| {
                    state.last_saved_message_count = current_messages.len();
                    state.last_saved_at = Utc::now();
                })
                .or_insert_with(|| {
                    ConversationSaveState::new(conversation_id, current_messages.len())
                });
        } else {
            debug!(
                "[SaveCoord] 会话状态已被清除，不再记录保存数量，conversationID={}",
                conversation_id
            );
        }
        Ok(())
    }

    /// 根据当前内存状态决定新建会话还是追加到已有会话
    ///
    /// - 已有会话且有新消息：追加新消息，返回原 ID
    /// - 没有会话且至少有一条消息：用全部消息新建会话
    /// - 其他情况，或同一会话已有 smart save 在进行中：不做任何事，返回原 ID
    pub async fn smart_save(
        &self,
        current_messages: &[ChatMessage],
        existing_conversation_id: Option<i64>,
        stored_message_count: usize,
        options: &SaveOptions,
    ) -> Result<SmartSaveResult> {
        match existing_conversation_id {
            Some(conversation_id) => {
                self.smart_save_existing(
                    conversation_id,
                    current_messages,
                    stored_message_count,
                    options,
                )
                .await
            }
            None => self.smart_save_new(current_messages, options).await,
        }
    }

    async fn smart_save_existing(
        &self,
        conversation_id: i64,
        current_messages: &[ChatMessage],
        stored_message_count: usize,
        options: &SaveOptions,
    ) -> Result<SmartSaveResult> {
        let key = OperationKey::SmartSave(conversation_id);
        let Some(_guard) = self.tracker.try_begin(key.clone()) else {
            warn!("[SaveCoord] ⚠️ smart save 已在进行中，跳过: {}", key);
            return Ok(SmartSaveResult::unchanged(Some(conversation_id)));
        };

        if current_messages.len() > stored_message_count {
            info!(
                "[SaveCoord] 🔄 smart save 追加新消息，conversationID={}, 已保存: {}, 当前: {}",
                conversation_id,
                stored_message_count,
                current_messages.len()
            );
            self.update_with_new_messages(
                conversation_id,
                current_messages,
                stored_message_count,
                options.model_used.as_deref(),
            )
            .await?;
        } else {
            debug!(
                "[SaveCoord] smart save 无新消息，conversationID={}",
                conversation_id
            );
        }
        Ok(SmartSaveResult::unchanged(Some(conversation_id)))
    }

    async fn smart_save_new(
        &self,
        current_messages: &[ChatMessage],
        options: &SaveOptions,
    ) -> Result<SmartSaveResult> {
        if current_messages.is_empty() {
            debug!("[SaveCoord] smart save 无会话且无消息，跳过");
            return Ok(SmartSaveResult::unchanged(None));
        }

        // 一个协调器对应一个聊天会话，新建进行中时再次新建会产生重复会话
        let Some(guard) = self.tracker.try_begin_create() else {
            warn!("[SaveCoord] ⚠️ 新建会话已在进行中，跳过");
            return Ok(SmartSaveResult::unchanged(None));
        };
        let key = guard.key().to_string();

        info!(
            "[SaveCoord] 🆕 新建会话，消息数: {}, 操作: {}",
            current_messages.len(),
            key
        );
        self.listener.on_save_started(key.clone()).await;

        let record = match self
            .store
            .create_conversation(current_messages, &options.create_params())
            .await
        {
            Ok(record) => record,
            Err(e) => {
                error!("[SaveCoord] ❌ 新建会话失败: {}", e);
                self.listener.on_save_failed(key, e.to_string()).await;
                return Err(e.into());
            }
        };

        self.states().insert(
            record.id,
            ConversationSaveState::new(record.id, current_messages.len()),
        );
        info!(
            "[SaveCoord] ✅ 新建会话成功，conversationID={}, 已保存消息数: {}",
            record.id,
            current_messages.len()
        );
        self.listener
            .on_conversation_created(record.id, current_messages.len())
            .await;
        Ok(SmartSaveResult::created(record.id))
    }

    /// 加载已持久化的会话时设置已保存数量，避免重复发送后端已有的消息
    pub fn initialize_conversation_state(&self, conversation_id: i64, message_count: usize) {
        info!(
            "[SaveCoord] 初始化会话状态，conversationID={}, 已保存消息数: {}",
            conversation_id, message_count
        );
        self.states().insert(
            conversation_id,
            ConversationSaveState::new(conversation_id, message_count),
        );
    }

    /// 清除会话的全部追踪状态（开始新聊天或删除会话时调用）
    pub fn clear_conversation_state(&self, conversation_id: i64) {
        let had_state = self.states().remove(&conversation_id).is_some();
        let released = self.tracker.release_conversation(conversation_id);
        info!(
            "[SaveCoord] 🧹 清除会话状态，conversationID={}, 有保存状态: {}, 释放进行中标记: {}",
            conversation_id, had_state, released
        );
    }

    /// 是否有引用该会话的操作在进行中（UI 可据此禁用手动保存）
    pub fn is_conversation_busy(&self, conversation_id: i64) -> bool {
        self.tracker.is_busy(conversation_id)
    }

    pub fn last_saved_message_count(&self, conversation_id: i64) -> Option<usize> {
        self.states()
            .get(&conversation_id)
            .map(|s| s.last_saved_message_count)
    }

    pub fn conversation_state(&self, conversation_id: i64) -> Option<ConversationSaveState> {
        self.states().get(&conversation_id).cloned()
    }

    /// 尚未持久化的消息数量（未追踪的会话视为全部未保存）
    pub fn unsaved_message_count(&self, conversation_id: i64, current_len: usize) -> usize {
        let saved = self.last_saved_message_count(conversation_id).unwrap_or(0);
        current_len.saturating_sub(saved)
    }

    pub fn in_flight_operations(&self) -> Vec<OperationKey> {
        self.tracker.in_flight()
    }
}
