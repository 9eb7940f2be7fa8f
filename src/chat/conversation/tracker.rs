//! 进行中操作追踪
//!
//! 每个逻辑保存操作用一个 `OperationKey` 标识。`try_begin` 在任何 await 之前同步完成
//! “检查 + 标记”，返回的 `InFlightGuard` 在 drop 时清除标记，成功、失败或 future
//! 被丢弃都会走到这里。

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// 去重用的操作 key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationKey {
    /// 追加单条消息
    Append(i64),
    /// 逐条追加多条消息
    AppendMany(i64),
    /// 追加未持久化的消息后缀
    Update(i64),
    /// 已有会话的 smart save
    SmartSave(i64),
    /// 新建会话（每次调用一个新 key）
    Create(Uuid),
}

impl OperationKey {
    pub fn create() -> Self {
        OperationKey::Create(Uuid::new_v4())
    }

    /// key 引用的会话 ID，新建会话时为 None
    pub fn conversation_id(&self) -> Option<i64> {
        match self {
            OperationKey::Append(id)
            | OperationKey::AppendMany(id)
            | OperationKey::Update(id)
            | OperationKey::SmartSave(id) => Some(*id),
            OperationKey::Create(_) => None,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, OperationKey::Create(_))
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKey::Append(id) => write!(f, "append_{}", id),
            OperationKey::AppendMany(id) => write!(f, "append_multiple_{}", id),
            OperationKey::Update(id) => write!(f, "update_{}", id),
            OperationKey::SmartSave(id) => write!(f, "smart_save_{}", id),
            OperationKey::Create(uuid) => write!(f, "smart_save_new_{}", uuid),
        }
    }
}

#[derive(Default)]
struct TrackerInner {
    next_ticket: u64,
    /// key -> ticket
    in_flight: HashMap<OperationKey, u64>,
}

/// 进行中操作集合
#[derive(Clone, Default)]
pub struct OperationTracker {
    inner: Arc<Mutex<TrackerInner>>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        // 持锁期间不会 panic，中毒时数据仍然一致
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 尝试标记操作开始；key 已在进行中时返回 None
    pub fn try_begin(&self, key: OperationKey) -> Option<InFlightGuard> {
        let mut inner = self.lock();
        if inner.in_flight.contains_key(&key) {
            return None;
        }
        Some(self.insert_locked(&mut inner, key))
    }

    /// 尝试标记新建会话开始；已有任何新建操作在进行中时返回 None
    ///
    /// 检查与插入在同一次加锁内完成
    pub fn try_begin_create(&self) -> Option<InFlightGuard> {
        let mut inner = self.lock();
        if inner.in_flight.keys().any(OperationKey::is_create) {
            return None;
        }
        let key = OperationKey::create();
        Some(self.insert_locked(&mut inner, key))
    }

    pub fn contains(&self, key: &OperationKey) -> bool {
        self.lock().in_flight.contains_key(key)
    }

    /// 是否有任何引用该会话的操作在进行中
    pub fn is_busy(&self, conversation_id: i64) -> bool {
        self.lock()
            .in_flight
            .keys()
            .any(|k| k.conversation_id() == Some(conversation_id))
    }

    /// 是否有新建会话的操作在进行中
    pub fn is_creating(&self) -> bool {
        self.lock().in_flight.keys().any(OperationKey::is_create)
    }

    /// 移除引用该会话的所有进行中标记，返回移除数量
    pub fn release_conversation(&self, conversation_id: i64) -> usize {
        let mut inner = self.lock();
        let before = inner.in_flight.len();
        inner
            .in_flight
            .retain(|k, _| k.conversation_id() != Some(conversation_id));
        before - inner.in_flight.len()
    }

    pub fn in_flight(&self) -> Vec<OperationKey> {
        self.lock().in_flight.keys().cloned().collect()
    }

    fn insert_locked(&self, inner: &mut TrackerInner, key: OperationKey) -> InFlightGuard {
        inner.next_ticket += 1;
        let ticket = inner.next_ticket;
        inner.in_flight.insert(key.clone(), ticket);
        InFlightGuard {
            tracker: self.clone(),
            key,
            ticket,
        }
    }

    fn holds(&self, key: &OperationKey, ticket: u64) -> bool {
        self.lock().in_flight.get(key) == Some(&ticket)
    }

    fn finish(&self, key: &OperationKey, ticket: u64) {
        let mut inner = self.lock();
        // 标记被 release 后又被新操作占用时，ticket 不同，不能误删
        if inner.in_flight.get(key) == Some(&ticket) {
            inner.in_flight.remove(key);
        }
    }
}

/// 进行中标记的 RAII 守卫
#[must_use = "guard 被 drop 时操作标记即被清除"]
pub struct InFlightGuard {
    tracker: OperationTracker,
    key: OperationKey,
    ticket: u64,
}

impl InFlightGuard {
    pub fn key(&self) -> &OperationKey {
        &self.key
    }

    /// 标记是否仍由本守卫持有（会话被 clear 后返回 false）
    pub fn is_active(&self) -> bool {
        self.tracker.holds(&self.key, self.ticket)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.finish(&self.key, self.ticket);
    }
}
