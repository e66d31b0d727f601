//! Plugin Manager - URL 해석 엔진
//!
//! URL 배치를 `(url, plugin)` 쌍으로 분류합니다. 해석 순서:
//!
//! 1. 문자열이 아닌 입력은 건너뜀
//! 2. 히스토리 (최근 순)
//! 3. 매처 체인 (히스토리에 기록하지 않음)
//! 4. 전체 스캔: crypter → hoster, 소스 우선순위 순
//! 5. 기본 hoster 플러그인

use super::discovery::DirectorySource;
use super::history::MatchHistory;
use super::loader::LoaderChain;
use super::matcher::{MatcherChain, PluginMatcher};
use super::module::{ModuleCatalog, PluginClass, PluginModule};
use super::source::PluginSource;
use super::types::{
    PluginDescriptor, PluginKey, PluginType, DEFAULT_PLUGIN, MATCH_HISTORY,
};
use haul_foundation::Result;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// 전체 스캔 카테고리 순서
const SCAN_ORDER: [PluginType; 2] = [PluginType::Crypter, PluginType::Hoster];

// ============================================================================
// PluginManagerConfig
// ============================================================================

/// 플러그인 매니저 설정 (`[plugins]` 테이블)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginManagerConfig {
    /// 사용자 플러그인 디렉토리 (내장 플러그인보다 우선)
    pub user_plugin_dir: Option<PathBuf>,

    /// 매치 히스토리 크기 (`MATCH_HISTORY`를 넘으면 잘림)
    pub history_size: usize,

    /// 매칭되지 않은 URL을 받는 hoster 플러그인
    pub default_plugin: String,
}

impl Default for PluginManagerConfig {
    fn default() -> Self {
        Self {
            user_plugin_dir: None,
            history_size: MATCH_HISTORY,
            default_plugin: DEFAULT_PLUGIN.to_string(),
        }
    }
}

// ============================================================================
// ParsedUrls
// ============================================================================

/// URL 해석 결과 (입력 순서 유지)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedUrls {
    pub hoster: Vec<(String, String)>,
    pub crypter: Vec<(String, String)>,
}

impl ParsedUrls {
    fn push(&mut self, key: PluginKey, url: &str) {
        let pair = (url.to_string(), key.name);
        match key.kind {
            PluginType::Crypter => self.crypter.push(pair),
            _ => self.hoster.push(pair),
        }
    }

    pub fn len(&self) -> usize {
        self.hoster.len() + self.crypter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_parts(self) -> (Vec<(String, String)>, Vec<(String, String)>) {
        (self.hoster, self.crypter)
    }
}

// ============================================================================
// PluginManager
// ============================================================================

/// 플러그인 매니저
pub struct PluginManager {
    config: PluginManagerConfig,
    loader: LoaderChain,
    matchers: RwLock<MatcherChain>,
    history: Mutex<MatchHistory>,
}

impl PluginManager {
    pub fn new(loader: LoaderChain, config: PluginManagerConfig) -> Self {
        let history = MatchHistory::new(config.history_size.min(MATCH_HISTORY));
        Self {
            config,
            loader,
            matchers: RwLock::new(MatcherChain::new()),
            history: Mutex::new(history),
        }
    }

    /// 소스 목록으로 생성 (앞쪽이 우선)
    pub fn with_sources(sources: Vec<Arc<dyn PluginSource>>, config: PluginManagerConfig) -> Self {
        Self::new(LoaderChain::new(sources), config)
    }

    /// 사용자 디렉토리를 스캔하고 내장 소스 앞에 배치
    pub async fn discover(
        config: PluginManagerConfig,
        builtin: Arc<dyn PluginSource>,
        catalog: Arc<ModuleCatalog>,
    ) -> Result<Self> {
        let mut sources: Vec<Arc<dyn PluginSource>> = Vec::new();

        if let Some(dir) = &config.user_plugin_dir {
            let user = DirectorySource::scan("user", dir.clone(), catalog).await?;
            sources.push(Arc::new(user));
        }
        sources.push(builtin);

        let manager = Self::with_sources(sources, config);
        info!(
            sources = ?manager.loader.source_names(),
            incompatible = manager.loader.incompatible().len(),
            "Plugin manager ready"
        );
        Ok(manager)
    }

    pub fn config(&self) -> &PluginManagerConfig {
        &self.config
    }

    pub fn loader(&self) -> &LoaderChain {
        &self.loader
    }

    // ========================================================================
    // 매처
    // ========================================================================

    /// 매처 추가 (`index` 기본값 0)
    pub fn add_matcher(&self, matcher: Arc<dyn PluginMatcher>, index: Option<usize>) -> Result<()> {
        self.matchers.write().add(matcher, index)
    }

    pub fn remove_matcher(&self, matcher: &Arc<dyn PluginMatcher>) -> bool {
        self.matchers.write().remove(matcher)
    }

    pub fn matcher_count(&self) -> usize {
        self.matchers.read().len()
    }

    // ========================================================================
    // URL 해석
    // ========================================================================

    /// URL 배치 해석
    ///
    /// 문자열이 아닌 입력은 로그만 남기고 건너뜁니다. 실패하지 않습니다.
    pub fn parse_urls(&self, urls: &[Value]) -> ParsedUrls {
        let mut result = ParsedUrls::default();

        for value in urls {
            let Some(url) = value.as_str() else {
                debug!("Parsing invalid type {:?}", value);
                continue;
            };
            let key = self.resolve_url(url);
            result.push(key, url);
        }

        result
    }

    /// 문자열 URL 배치 해석
    pub fn parse_url_strs(&self, urls: &[&str]) -> ParsedUrls {
        let mut result = ParsedUrls::default();
        for url in urls {
            let key = self.resolve_url(url);
            result.push(key, url);
        }
        result
    }

    /// URL 하나 해석
    pub fn resolve_url(&self, url: &str) -> PluginKey {
        if let Some(key) = self.match_history(url) {
            return key;
        }

        if let Some(key) = self.matchers.read().match_url(url) {
            debug!(plugin = %key, "Matcher claimed {}", url);
            return key;
        }

        if let Some(key) = self.full_scan(url) {
            return key;
        }

        PluginKey::new(PluginType::Hoster, self.config.default_plugin.clone())
    }

    fn match_history(&self, url: &str) -> Option<PluginKey> {
        let mut history = self.history.lock();

        let hit = history.entries().iter().position(|key| {
            self.loader
                .get_plugin(key.kind, &key.name)
                .is_some_and(|descriptor| descriptor.matches(url))
        })?;

        let key = history.entries()[hit].clone();
        history.promote(hit);
        Some(key)
    }

    fn full_scan(&self, url: &str) -> Option<PluginKey> {
        for kind in SCAN_ORDER {
            for index in 0..self.loader.len() {
                for descriptor in self.loader.source_plugins(index, kind) {
                    // 앞선 소스에 가려진 플러그인은 건너뜀
                    if self.loader.winning_index(kind, &descriptor.name) != Some(index) {
                        continue;
                    }
                    if descriptor.matches(url) {
                        let key = descriptor.key();
                        debug!(plugin = %key, "Pattern matched {}", url);
                        self.history.lock().insert(key.clone());
                        return Some(key);
                    }
                }
            }
        }
        None
    }

    /// 현재 히스토리 (최근 순)
    pub fn history(&self) -> Vec<PluginKey> {
        self.history.lock().entries().to_vec()
    }

    // ========================================================================
    // 조회 / 로드
    // ========================================================================

    pub fn find_type(&self, name: &str) -> Option<PluginType> {
        self.loader.find_type(name)
    }

    pub fn has_plugin(&self, kind: PluginType, name: &str) -> bool {
        self.loader.has_plugin(kind, name)
    }

    pub fn get_plugin(&self, kind: PluginType, name: &str) -> Option<Arc<PluginDescriptor>> {
        self.loader.get_plugin(kind, name)
    }

    pub fn get_plugins(&self, kind: PluginType) -> BTreeMap<String, Arc<PluginDescriptor>> {
        self.loader.get_plugins(kind)
    }

    /// 애드온 카테고리 (없으면 "addon")
    pub fn get_category(&self, name: &str) -> String {
        self.loader
            .get_plugin(PluginType::Addon, name)
            .and_then(|descriptor| descriptor.category.clone())
            .unwrap_or_else(|| PluginType::Addon.as_str().to_string())
    }

    pub fn load_attributes(&self, kind: PluginType, name: &str) -> HashMap<String, Value> {
        self.loader.load_attributes(kind, name)
    }

    pub fn load_module(&self, kind: PluginType, name: &str) -> Result<Arc<PluginModule>> {
        self.loader.load_module(kind, name)
    }

    pub fn load_class(&self, kind: PluginType, name: &str) -> Result<Arc<PluginClass>> {
        self.loader.load_class(kind, name)
    }

    /// 클래스 조회. `overwrite`면 매처 치환을 먼저 적용
    pub fn get_plugin_class(
        &self,
        kind: PluginType,
        name: &str,
        overwrite: bool,
    ) -> Result<Arc<PluginClass>> {
        if overwrite {
            let key = self.matchers.read().match_plugin(kind, name);
            return self.loader.load_class(key.kind, &key.name);
        }
        self.loader.load_class(kind, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{MatcherCapability, StaticSource};
    use serde_json::json;

    fn manager() -> PluginManager {
        let builtin = StaticSource::new("builtin")
            .with_handler(
                PluginDescriptor::new(PluginType::Hoster, "FooCom")
                    .with_pattern(r"https?://foo\.com/file/")
                    .unwrap(),
            )
            .with_handler(
                PluginDescriptor::new(PluginType::Crypter, "FooFolder")
                    .with_pattern(r"https?://foo\.com/")
                    .unwrap(),
            )
            .with_handler(PluginDescriptor::new(PluginType::Hoster, DEFAULT_PLUGIN))
            .with_descriptor(
                PluginDescriptor::new(PluginType::Addon, "Stats").with_category("tools"),
            );
        PluginManager::with_sources(vec![Arc::new(builtin)], PluginManagerConfig::default())
    }

    #[test]
    fn test_crypter_scanned_before_hoster() {
        let manager = manager();
        // 두 패턴 모두 매칭되지만 crypter가 우선
        let parsed = manager.parse_url_strs(&["http://foo.com/file/1"]);
        assert_eq!(
            parsed.crypter,
            vec![("http://foo.com/file/1".to_string(), "FooFolder".to_string())]
        );
        assert!(parsed.hoster.is_empty());
    }

    #[test]
    fn test_non_string_inputs_skipped() {
        let manager = manager();
        let parsed = manager.parse_urls(&[json!("http://other.net/a"), json!(42), json!(null)]);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.hoster[0].1, DEFAULT_PLUGIN);
        assert!(manager.history().is_empty());
    }

    #[test]
    fn test_get_category() {
        let manager = manager();
        assert_eq!(manager.get_category("Stats"), "tools");
        assert_eq!(manager.get_category("Unknown"), "addon");
    }

    struct Rename;

    impl PluginMatcher for Rename {
        fn name(&self) -> &str {
            "rename"
        }

        fn capabilities(&self) -> Vec<MatcherCapability> {
            vec![MatcherCapability::MatchPlugin]
        }

        fn match_plugin(&self, kind: PluginType, name: &str) -> Option<PluginKey> {
            (name == "Legacy").then(|| PluginKey::new(kind, "FooCom"))
        }
    }

    #[test]
    fn test_get_plugin_class_overwrite() {
        let manager = manager();
        manager.add_matcher(Arc::new(Rename), None).unwrap();

        let class = manager
            .get_plugin_class(PluginType::Hoster, "Legacy", true)
            .unwrap();
        assert_eq!(class.name(), "FooCom");
        assert!(manager
            .get_plugin_class(PluginType::Hoster, "Legacy", false)
            .is_err());
    }

    #[test]
    fn test_history_size_clamped_to_cap() {
        let builtin = (0..MATCH_HISTORY + 5).fold(StaticSource::new("builtin"), |source, i| {
            source.with_handler(
                PluginDescriptor::new(PluginType::Hoster, format!("Host{}", i))
                    .with_pattern(&format!(r"https?://host{}\.com/", i))
                    .unwrap(),
            )
        });
        let config = PluginManagerConfig {
            history_size: 50,
            ..PluginManagerConfig::default()
        };
        let manager = PluginManager::with_sources(vec![Arc::new(builtin)], config);

        let urls: Vec<String> = (0..MATCH_HISTORY + 5)
            .map(|i| format!("http://host{}.com/f", i))
            .collect();
        let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
        manager.parse_url_strs(&urls);

        let history = manager.history();
        assert_eq!(history.len(), MATCH_HISTORY);
        assert_eq!(history[0].name, format!("Host{}", MATCH_HISTORY + 4));
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: PluginManagerConfig = serde_json::from_value(json!({"history_size": 3})).unwrap();
        assert_eq!(config.history_size, 3);
        assert_eq!(config.default_plugin, DEFAULT_PLUGIN);
        assert!(config.user_plugin_dir.is_none());
    }
}
