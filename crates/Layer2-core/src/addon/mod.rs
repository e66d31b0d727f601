//! Addon System - 이벤트에 반응하는 백그라운드 확장
//!
//! - `traits.rs` - `Addon` 인터페이스, `Hook`, `AddonContext`
//! - `types.rs` - 서비스/info 디스크립터
//! - `manager.rs` - 라이프사이클, 훅 팬아웃, 서비스 호출
//!
//! ## 사용 예시
//!
//! ```ignore
//! let manager = AddonManager::new(host);
//! manager.build_index();
//! manager.activate_addons();
//!
//! manager.download_finished(&[json!({"id": 1})]);
//! let value = manager.invoke("Stats", "summary", &[])?;
//! ```

mod manager;
mod traits;
mod types;

pub use manager::AddonManager;
pub use traits::{Addon, AddonContext, Hook};
pub use types::{AddonSummary, IndexReport, InfoProperty, ServiceDescriptor};
