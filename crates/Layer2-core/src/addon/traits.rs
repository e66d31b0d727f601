//! Addon traits - 애드온 인터페이스

use super::manager::AddonManager;
use crate::host::Host;
use haul_foundation::{
    Error, EventBus, JobHandle, Result, DOWNLOAD_FAILED, DOWNLOAD_FINISHED, DOWNLOAD_PREPARING,
    PACKAGE_FINISHED,
};
use serde_json::Value;
use std::sync::{Arc, Weak};

// ============================================================================
// Hook
// ============================================================================

/// 애드온이 받는 라이프사이클 훅
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Hook {
    DownloadPreparing,
    DownloadFinished,
    DownloadFailed,
    PackageFinished,
    /// 호스트가 정의한 임의 훅
    Custom(String),
}

impl Hook {
    /// 훅 이름 (로그용)
    pub fn method(&self) -> &str {
        match self {
            Self::DownloadPreparing => "download_preparing",
            Self::DownloadFinished => "download_finished",
            Self::DownloadFailed => "download_failed",
            Self::PackageFinished => "package_finished",
            Self::Custom(name) => name,
        }
    }

    /// 훅 이후 디스패치되는 이벤트 이름
    pub fn event_name(&self) -> &str {
        match self {
            Self::DownloadPreparing => DOWNLOAD_PREPARING,
            Self::DownloadFinished => DOWNLOAD_FINISHED,
            Self::DownloadFailed => DOWNLOAD_FAILED,
            Self::PackageFinished => PACKAGE_FINISHED,
            Self::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.method())
    }
}

// ============================================================================
// AddonContext
// ============================================================================

/// 애드온 생성 시 전달되는 컨텍스트
#[derive(Clone)]
pub struct AddonContext {
    name: String,
    host: Arc<Host>,
    manager: Weak<AddonManager>,
}

impl AddonContext {
    pub fn new(name: impl Into<String>, host: Arc<Host>, manager: Weak<AddonManager>) -> Self {
        Self {
            name: name.into(),
            host,
            manager,
        }
    }

    /// 애드온 이름 (설정 섹션 이름)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.host.events
    }

    /// 애드온 매니저 (자기 등록용)
    pub fn manager(&self) -> Option<Arc<AddonManager>> {
        self.manager.upgrade()
    }

    /// 이 애드온 섹션의 설정값
    pub fn config(&self, option: &str) -> Option<Value> {
        self.host.config.get(&self.name, option)
    }
}

impl std::fmt::Debug for AddonContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonContext")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Addon
// ============================================================================

/// 애드온 인터페이스
///
/// 모든 메서드는 기본 구현을 가지며, 애드온은 필요한 것만 구현합니다.
/// 훅 실패(에러/패닉)는 매니저가 잡아서 로그로 남깁니다.
pub trait Addon: Send + Sync {
    fn name(&self) -> &str;

    /// 설정상 활성 상태인지
    fn is_activated(&self) -> bool {
        true
    }

    /// 활성화 훅 (백그라운드에서 실행)
    fn activate(&self) -> Result<()> {
        Ok(())
    }

    /// 비활성화 훅
    fn deactivate(&self) -> Result<()> {
        Ok(())
    }

    /// 등록한 주기 작업
    fn periodic_job(&self) -> Option<JobHandle> {
        None
    }

    /// 라이프사이클 훅
    fn on_hook(&self, _hook: &Hook, _args: &[Value]) -> Result<()> {
        Ok(())
    }

    /// `add_event_listener`로 바인딩된 이벤트 수신
    fn on_event(&self, _method: &str, _args: &[Value]) -> Result<()> {
        Ok(())
    }

    /// 등록된 서비스 호출
    fn call_service(&self, method: &str, _args: &[Value]) -> Result<Value> {
        Err(Error::service_not_found(self.name(), method))
    }

    /// 현재 info 속성 값 `(handle, value)`
    fn info_properties(&self) -> Vec<(String, Value)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_event_names() {
        assert_eq!(Hook::DownloadPreparing.event_name(), "download:preparing");
        assert_eq!(Hook::PackageFinished.event_name(), "package:finished");
        assert_eq!(Hook::Custom("all:done".into()).event_name(), "all:done");
        assert_eq!(Hook::DownloadFailed.to_string(), "download_failed");
    }

    struct Bare;

    impl Addon for Bare {
        fn name(&self) -> &str {
            "Bare"
        }
    }

    #[test]
    fn test_default_service_not_found() {
        let result = Bare.call_service("stats", &[]);
        assert!(matches!(result, Err(Error::ServiceNotFound { .. })));
        assert!(Bare.is_activated());
        assert!(Bare.periodic_job().is_none());
    }
}
