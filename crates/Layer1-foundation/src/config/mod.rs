//! Config - 설정 관리
//!
//! - `store.rs` - 섹션 단위 ConfigStore 및 플러그인 설정 스키마

mod store;

pub use store::{is_truthy, ConfigOption, ConfigStore, ACTIVATED_OPTION};
