//! Event Bus - 이벤트 발행/구독
//!
//! 이름 기반 동기 이벤트 버스. 애드온 매니저와 설정 저장소가 클라이언트입니다.

use super::types::AppEvent;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace};

// ============================================================================
// Listener
// ============================================================================

/// 이벤트 콜백
pub type EventCallback = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// 이벤트 리스너 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// 등록된 리스너 정보
struct RegisteredListener {
    event: String,
    callback: EventCallback,
}

// ============================================================================
// EventBus
// ============================================================================

/// 이벤트 버스 설정
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// 이벤트 히스토리 보관 개수
    pub history_size: usize,

    /// 디버그 모드 (모든 이벤트 로깅)
    pub debug_mode: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            history_size: 100,
            debug_mode: false,
        }
    }
}

/// 이벤트 버스
///
/// ## 사용법
///
/// ```ignore
/// let bus = EventBus::new();
/// let id = bus.listen("download:finished", Arc::new(|args| println!("{:?}", args)));
/// bus.dispatch("download:finished", &[json!({"name": "file.bin"})]);
/// bus.unlisten(id);
/// ```
pub struct EventBus {
    /// 설정
    config: EventBusConfig,

    /// 등록된 리스너
    listeners: RwLock<HashMap<ListenerId, RegisteredListener>>,

    /// 리스너 ID 카운터
    listener_counter: AtomicU64,

    /// 이벤트 히스토리 (최근 N개)
    history: RwLock<VecDeque<AppEvent>>,

    /// 발행된 이벤트 수
    event_count: AtomicU64,
}

impl EventBus {
    /// 기본 설정으로 이벤트 버스 생성
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// 커스텀 설정으로 이벤트 버스 생성
    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            history: RwLock::new(VecDeque::with_capacity(config.history_size)),
            config,
            listeners: RwLock::new(HashMap::new()),
            listener_counter: AtomicU64::new(0),
            event_count: AtomicU64::new(0),
        }
    }

    /// 리스너 등록
    pub fn listen(&self, event: impl Into<String>, callback: EventCallback) -> ListenerId {
        let id = ListenerId::new(self.listener_counter.fetch_add(1, Ordering::SeqCst));
        let event = event.into();

        debug!(listener_id = %id, event = %event, "Registering event listener");

        self.listeners
            .write()
            .insert(id, RegisteredListener { event, callback });
        id
    }

    /// 리스너 해제
    pub fn unlisten(&self, id: ListenerId) -> bool {
        let removed = self.listeners.write().remove(&id).is_some();
        if removed {
            debug!(listener_id = %id, "Unregistered event listener");
        }
        removed
    }

    /// 여러 리스너 해제, 실제로 제거된 수 반환
    pub fn unlisten_all(&self, ids: &[ListenerId]) -> usize {
        let mut listeners = self.listeners.write();
        ids.iter().filter(|id| listeners.remove(*id).is_some()).count()
    }

    /// 이벤트 발행
    ///
    /// 리스너 목록은 스냅샷으로 복사한 뒤 락 없이 호출합니다.
    /// 콜백 안에서 listen/unlisten/dispatch 해도 교착되지 않습니다.
    pub fn dispatch(&self, event: &str, args: &[Value]) {
        let event_count = self.event_count.fetch_add(1, Ordering::SeqCst);

        if self.config.debug_mode {
            trace!(event = %event, "Dispatching event #{}", event_count + 1);
        }

        if self.config.history_size > 0 {
            let mut history = self.history.write();
            if history.len() >= self.config.history_size {
                history.pop_front();
            }
            history.push_back(AppEvent::new(event, args));
        }

        let mut targets: Vec<(ListenerId, EventCallback)> = self
            .listeners
            .read()
            .iter()
            .filter(|(_, registered)| registered.event == event)
            .map(|(id, registered)| (*id, Arc::clone(&registered.callback)))
            .collect();
        // 등록 순서대로 전달
        targets.sort_by_key(|(id, _)| *id);

        for (id, callback) in targets {
            trace!(listener_id = %id, event = %event, "Delivering event to listener");

            if panic::catch_unwind(AssertUnwindSafe(|| callback(args))).is_err() {
                error!(listener_id = %id, event = %event, "Event listener panicked");
            }
        }
    }

    /// 최근 이벤트 히스토리 조회 (최신 순)
    pub fn history(&self, limit: Option<usize>) -> Vec<AppEvent> {
        let history = self.history.read();
        let limit = limit.unwrap_or(history.len());
        history.iter().rev().take(limit).cloned().collect()
    }

    /// 등록된 리스너 수
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// 특정 이벤트의 리스너 수
    pub fn listener_count_for(&self, event: &str) -> usize {
        self.listeners
            .read()
            .values()
            .filter(|registered| registered.event == event)
            .count()
    }

    /// 총 발행된 이벤트 수
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, EventCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let callback: EventCallback = Arc::new(move |_args: &[Value]| {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn test_event_bus_basic() {
        let bus = EventBus::new();
        let (count, callback) = counter();

        let id = bus.listen("download:finished", callback);
        assert_eq!(bus.listener_count(), 1);

        bus.dispatch("download:finished", &[Value::from("a.bin")]);
        bus.dispatch("download:failed", &[]);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(bus.unlisten(id));
        assert!(!bus.unlisten(id));
        assert_eq!(bus.listener_count(), 0);

        bus.dispatch("download:finished", &[]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_receives_args() {
        let bus = EventBus::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let inner = Arc::clone(&seen);

        bus.listen(
            "package:finished",
            Arc::new(move |args: &[Value]| inner.lock().extend_from_slice(args)),
        );
        bus.dispatch("package:finished", &[Value::from(7), Value::from("pkg")]);

        assert_eq!(*seen.lock(), vec![Value::from(7), Value::from("pkg")]);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let bus = EventBus::new();
        let (count, callback) = counter();

        bus.listen("download:finished", Arc::new(|_: &[Value]| panic!("listener bug")));
        bus.listen("download:finished", callback);

        bus.dispatch("download:finished", &[]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_unlisten_from_callback() {
        let bus = Arc::new(EventBus::new());
        let weak = Arc::downgrade(&bus);
        let slot = Arc::new(parking_lot::Mutex::new(None::<ListenerId>));
        let slot_inner = Arc::clone(&slot);

        let id = bus.listen(
            "once",
            Arc::new(move |_: &[Value]| {
                if let (Some(bus), Some(id)) = (weak.upgrade(), *slot_inner.lock()) {
                    bus.unlisten(id);
                }
            }),
        );
        *slot.lock() = Some(id);

        bus.dispatch("once", &[]);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_event_history() {
        let bus = EventBus::with_config(EventBusConfig {
            history_size: 5,
            ..Default::default()
        });

        for i in 0..10 {
            bus.dispatch(&format!("test.event.{}", i), &[]);
        }

        let history = bus.history(None);
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].name, "test.event.9");
        assert_eq!(bus.event_count(), 10);
        assert_eq!(bus.history(Some(2)).len(), 2);
    }

    #[test]
    fn test_unlisten_all() {
        let bus = EventBus::new();
        let (_, callback) = counter();

        let a = bus.listen("a", Arc::clone(&callback));
        let b = bus.listen("b", callback);
        assert_eq!(bus.listener_count_for("a"), 1);

        assert_eq!(bus.unlisten_all(&[a, b, a]), 2);
        assert_eq!(bus.listener_count(), 0);
    }
}
