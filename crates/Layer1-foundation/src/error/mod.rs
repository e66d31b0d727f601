//! Error types for Haul
//!
//! 플러그인/애드온 서브시스템의 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Haul 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 플러그인 로딩 관련
    // ========================================================================
    /// 플러그인 코드 유닛을 찾거나 로드할 수 없음
    #[error("Failed to load {kind} plugin '{name}': {reason}")]
    Load {
        kind: String,
        name: String,
        reason: String,
    },

    /// 로드된 모듈에 기대한 클래스가 없음
    #[error("Plugin module {kind}/{name} does not define class '{name}'")]
    ClassNotFound { kind: String, name: String },

    /// 잘못된 capability를 가진 matcher 등록 시도
    #[error("Invalid plugin matcher: {0}")]
    MatcherType(String),

    // ========================================================================
    // 애드온 서비스 관련
    // ========================================================================
    #[error("Service '{service}' of addon '{addon}' does not exist")]
    ServiceNotFound { addon: String, service: String },

    #[error("Service '{service}' of addon '{addon}' failed: {message}")]
    ServiceInvocation {
        addon: String,
        service: String,
        message: String,
    },

    /// 애드온 코드가 반환한 에러 (훅, 활성화 등)
    #[error("Addon error: {0}")]
    Addon(String),

    // ========================================================================
    // 설정/스케줄러 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// 로드 에러 생성 헬퍼
    pub fn load(kind: impl Into<String>, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Load {
            kind: kind.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// 클래스 없음 에러 생성 헬퍼
    pub fn class_not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::ClassNotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// 서비스 없음 에러 생성 헬퍼
    pub fn service_not_found(addon: impl Into<String>, service: impl Into<String>) -> Self {
        Error::ServiceNotFound {
            addon: addon.into(),
            service: service.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::class_not_found("addon", "Stats");
        assert_eq!(
            err.to_string(),
            "Plugin module addon/Stats does not define class 'Stats'"
        );

        let err = Error::ServiceInvocation {
            addon: "Stats".into(),
            service: "dump".into(),
            message: "disk full".into(),
        };
        assert!(err.to_string().contains("disk full"));
    }
}
