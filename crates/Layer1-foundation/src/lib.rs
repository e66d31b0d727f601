//! # haul-foundation
//!
//! Foundation layer for Haul:
//! - Error: 플러그인/애드온 에러 분류
//! - Event: 이름 기반 이벤트 버스 (listen / unlisten / dispatch)
//! - Config: 섹션 단위 설정 저장소 + `config:changed` 알림
//! - Scheduler: 애드온 주기 작업
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  haul-core (PluginManager, AddonManager)                 │
//! │                     │                                   │
//! │          ┌─────────┼──────────────┐                    │
//! │          ▼          ▼              ▼                    │
//! │     EventBus   ConfigStore    Scheduler                │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod scheduler;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{is_truthy, ConfigOption, ConfigStore, ACTIVATED_OPTION};

// ============================================================================
// Event (이벤트 시스템)
// ============================================================================
pub use event::{
    AppEvent, EventBus, EventBusConfig, EventCallback, EventId, ListenerId, CONFIG_CHANGED,
    DOWNLOAD_FAILED, DOWNLOAD_FINISHED, DOWNLOAD_PREPARING, PACKAGE_FINISHED,
};

// ============================================================================
// Scheduler (주기 작업)
// ============================================================================
pub use scheduler::{Job, JobHandle, JobScheduler, Scheduler};
