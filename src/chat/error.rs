//! 保存协调器错误类型

use crate::chat::conversation::tracker::OperationKey;
use thiserror::Error;

/// 保存协调器操作的结果类型
pub type Result<T> = std::result::Result<T, SaveError>;

/// 保存协调器错误
///
/// 协调器自身只产生 `Busy`；持久化客户端的错误原样透传，不做转换
#[derive(Error, Debug)]
pub enum SaveError {
    /// 同一操作 key 已有请求在进行中（仅 `append_message` 返回）
    #[error("操作进行中: {key}")]
    Busy { key: OperationKey },

    /// 持久化客户端（网络/后端）错误
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl SaveError {
    pub fn is_busy(&self) -> bool {
        matches!(self, SaveError::Busy { .. })
    }
}
