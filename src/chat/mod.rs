pub mod conversation;
pub mod error;
pub mod types;

pub use error::{Result, SaveError};
pub use types::{ChatMessage, MessageRole};

// 重新导出会话保存相关类型
pub use conversation::{
    ApiConfig, ConversationApi, ConversationStore, SaveCoordinator, SaveOptions, SmartSaveResult,
};
