//! Plugin System - 플러그인 발견, 로드, URL 해석
//!
//! ## 구조
//!
//! ```text
//! PluginManager
//!   ├── LoaderChain   (user dir → builtin, 앞쪽이 우선)
//!   │     └── ModuleCache
//!   ├── MatcherChain  (URL/플러그인 가로채기)
//!   └── MatchHistory  (최근 10개)
//! ```
//!
//! ## 사용 예시
//!
//! ```ignore
//! let manager = PluginManager::with_sources(
//!     vec![Arc::new(builtin)],
//!     PluginManagerConfig::default(),
//! );
//! let parsed = manager.parse_url_strs(&["http://foo.com/file/1"]);
//! ```

mod cache;
mod discovery;
mod history;
mod loader;
mod manager;
mod matcher;
mod module;
mod source;
mod types;

pub use cache::ModuleCache;
pub use discovery::{DirectorySource, MANIFEST_FILE};
pub use history::MatchHistory;
pub use loader::{LoaderChain, VersionMismatch};
pub use manager::{ParsedUrls, PluginManager, PluginManagerConfig};
pub use matcher::{MatcherCapability, MatcherChain, PluginMatcher};
pub use module::{AddonFactory, ModuleCatalog, PluginClass, PluginModule};
pub use source::{PluginSource, StaticSource};
pub use types::{
    PluginDescriptor, PluginKey, PluginType, DEFAULT_PLUGIN, MATCH_HISTORY, PLUGIN_API_VERSION,
};
