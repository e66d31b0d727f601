//! Event System - 이벤트 발행/구독 시스템
//!
//! 애플리케이션 이벤트(다운로드, 패키지, 설정 변경)를 이름으로 라우팅합니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        EventBus                              │
//! │  dispatch("download:finished", args) ─────────────────┐     │
//! │         │                                              │     │
//! │         ▼                                              ▼     │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │  Addon hook  │  │ ConfigStore  │  │  Other listener  │   │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventBusConfig, EventCallback, ListenerId};
pub use types::{
    AppEvent, EventId, CONFIG_CHANGED, DOWNLOAD_FAILED, DOWNLOAD_FINISHED, DOWNLOAD_PREPARING,
    PACKAGE_FINISHED,
};
