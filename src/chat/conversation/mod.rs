//! 会话模块
//!
//! 实现聊天会话的保存协调：去重并发保存、只追加未持久化的消息

pub mod api;
pub mod listener;
pub mod models;
pub mod service;
pub mod store;
pub mod tracker;
pub mod types;

// 重新导出主要类型
pub use api::ConversationApi;
pub use listener::{EmptySaveListener, SaveListener};
pub use models::{ApiConfig, ConversationSaveState, SaveOptions, SmartSaveResult};
pub use service::SaveCoordinator;
pub use store::{ConversationStore, CreateConversationParams};
pub use tracker::OperationKey;
pub use types::{ConversationRecord, OperationAck};
