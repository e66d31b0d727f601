//! haul-core: Core Runtime for Haul
//!
//! Layer2 - 플러그인 해석과 애드온 라이프사이클
//!
//! # 주요 모듈
//!
//! - `plugin`: 플러그인 소스, 로더 체인, 매처, URL 해석
//! - `addon`: 애드온 매니저 (활성화/비활성화, 훅, 서비스)
//! - `host`: 애드온에 주입되는 호스트 협력자
//!
//! # 사용 예시
//!
//! ```ignore
//! use haul_core::{AddonManager, Host, PluginManager, PluginManagerConfig, StaticSource};
//!
//! let plugins = Arc::new(PluginManager::with_sources(
//!     vec![Arc::new(builtin)],
//!     PluginManagerConfig::default(),
//! ));
//!
//! // URL 해석
//! let parsed = plugins.parse_url_strs(&["http://foo.com/file/1"]);
//!
//! // 애드온
//! let addons = AddonManager::new(Arc::new(Host::new(plugins)));
//! addons.build_index();
//! ```

pub mod addon;
pub mod host;
pub mod plugin;

// Re-exports: Plugin
pub use plugin::{
    DirectorySource, LoaderChain, MatchHistory, MatcherCapability, MatcherChain, ModuleCatalog,
    ParsedUrls, PluginClass, PluginDescriptor, PluginKey, PluginManager, PluginManagerConfig,
    PluginMatcher, PluginModule, PluginSource, PluginType, StaticSource, VersionMismatch,
    DEFAULT_PLUGIN, PLUGIN_API_VERSION,
};

// Re-exports: Addon
pub use addon::{
    Addon, AddonContext, AddonManager, AddonSummary, Hook, IndexReport, InfoProperty,
    ServiceDescriptor,
};

// Re-exports: Host
pub use host::Host;

// Re-exports: Foundation
pub use haul_foundation::{Error, Result};
