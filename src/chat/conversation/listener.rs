//! 会话保存监听器回调接口

use async_trait::async_trait;

/// 保存监听器（由 UI 层注册，用于刷新侧边栏、提示保存状态等）
#[async_trait]
pub trait SaveListener: Send + Sync {
    /// 保存操作开始（key 为操作标识）
    async fn on_save_started(&self, operation_key: String);

    /// 新会话创建成功
    async fn on_conversation_created(&self, conversation_id: i64, message_count: usize);

    /// 消息追加完成
    async fn on_messages_appended(&self, conversation_id: i64, appended: usize);

    /// 保存失败
    async fn on_save_failed(&self, operation_key: String, error: String);
}

/// 空实现（默认监听器）
pub struct EmptySaveListener;

#[async_trait]
impl SaveListener for EmptySaveListener {
    async fn on_save_started(&self, _operation_key: String) {}
    async fn on_conversation_created(&self, _conversation_id: i64, _message_count: usize) {}
    async fn on_messages_appended(&self, _conversation_id: i64, _appended: usize) {}
    async fn on_save_failed(&self, _operation_key: String, _error: String) {}
}
