//! Event Types - 애플리케이션 이벤트 정의
//!
//! 다운로드/패키지/설정 이벤트의 공통 구조와 이벤트 이름 상수

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// 이벤트 이름
// ============================================================================

/// 다운로드 준비 중
pub const DOWNLOAD_PREPARING: &str = "download:preparing";
/// 다운로드 완료
pub const DOWNLOAD_FINISHED: &str = "download:finished";
/// 다운로드 실패
pub const DOWNLOAD_FAILED: &str = "download:failed";
/// 패키지 완료
pub const PACKAGE_FINISHED: &str = "package:finished";
/// 설정 변경 `(section, option, value)`
pub const CONFIG_CHANGED: &str = "config:changed";

// ============================================================================
// Event ID
// ============================================================================

/// 이벤트 고유 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    /// 새 이벤트 ID 생성
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// AppEvent - 발행된 이벤트 기록
// ============================================================================

/// 발행된 이벤트 (히스토리 보관용)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppEvent {
    /// 이벤트 ID
    pub id: EventId,

    /// 이벤트 이름 (예: "download:finished")
    pub name: String,

    /// 이벤트 인자
    pub args: Vec<Value>,

    /// 발행 시간
    pub timestamp: DateTime<Utc>,
}

impl AppEvent {
    /// 새 이벤트 생성
    pub fn new(name: impl Into<String>, args: &[Value]) -> Self {
        Self {
            id: EventId::new(),
            name: name.into(),
            args: args.to_vec(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_event() {
        let event = AppEvent::new(
            CONFIG_CHANGED,
            &[
                Value::from("Stats"),
                Value::from("activated"),
                Value::from(true),
            ],
        );

        assert_eq!(event.name, "config:changed");
        assert_eq!(event.args.len(), 3);
        assert_eq!(event.args[0].as_str(), Some("Stats"));
        assert_ne!(event.id, AppEvent::new(CONFIG_CHANGED, &[]).id);
    }
}
