pub mod chat;

// 重新导出常用类型和函数，方便外部使用
pub use chat::{
    conversation::{ConversationSaveState, OperationKey, SaveListener},
    ApiConfig, ChatMessage, ConversationApi, ConversationStore, MessageRole, SaveCoordinator,
    SaveError, SaveOptions, SmartSaveResult,
};
