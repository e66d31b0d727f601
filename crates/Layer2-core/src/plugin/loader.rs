//! Loader Chain - 우선순위 순서의 플러그인 소스 목록
//!
//! 앞쪽 소스가 뒤쪽 소스의 같은 `(type, name)` 플러그인을 가립니다.
//! 생성 시 API 버전이 맞지 않는 플러그인은 해당 소스에서 제외됩니다.

use super::cache::ModuleCache;
use super::module::{PluginClass, PluginModule};
use super::source::PluginSource;
use super::types::{PluginDescriptor, PluginKey, PluginType, PLUGIN_API_VERSION};
use haul_foundation::{Error, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// 버전 불일치로 제외된 플러그인
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMismatch {
    pub source: String,
    pub key: PluginKey,
    pub required: u32,
    pub available: u32,
}

struct SourceEntry {
    source: Arc<dyn PluginSource>,
    excluded: HashSet<PluginKey>,
}

impl SourceEntry {
    fn get(&self, kind: PluginType, name: &str) -> Option<Arc<PluginDescriptor>> {
        let descriptor = self.source.get_plugin(kind, name)?;
        if self.excluded.contains(&descriptor.key()) {
            return None;
        }
        Some(descriptor)
    }
}

/// 플러그인 로더 체인
pub struct LoaderChain {
    entries: Vec<SourceEntry>,
    incompatible: Vec<VersionMismatch>,
    cache: ModuleCache,
}

impl LoaderChain {
    /// 소스 목록으로 체인 생성 (앞쪽이 우선)
    pub fn new(sources: Vec<Arc<dyn PluginSource>>) -> Self {
        let mut chain = Self {
            entries: sources
                .into_iter()
                .map(|source| SourceEntry {
                    source,
                    excluded: HashSet::new(),
                })
                .collect(),
            incompatible: Vec::new(),
            cache: ModuleCache::new(),
        };
        chain.check_versions();
        chain
    }

    /// API 버전 검사
    fn check_versions(&mut self) {
        for entry in &mut self.entries {
            for descriptor in entry.source.all_plugins() {
                if descriptor.is_compatible() {
                    continue;
                }

                warn!(
                    source = %entry.source.name(),
                    "Plugin {} not compatible with current API version {} (requires {})",
                    descriptor.key(),
                    PLUGIN_API_VERSION,
                    descriptor.api_version
                );
                entry.excluded.insert(descriptor.key());
                self.incompatible.push(VersionMismatch {
                    source: entry.source.name().to_string(),
                    key: descriptor.key(),
                    required: descriptor.api_version,
                    available: PLUGIN_API_VERSION,
                });
            }
        }
    }

    /// 제외된 플러그인 목록
    pub fn incompatible(&self) -> &[VersionMismatch] {
        &self.incompatible
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.source.name()).collect()
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// `index`번째 소스가 제공하는 플러그인 (이름 순, 제외 항목 빼고)
    pub fn source_plugins(&self, index: usize, kind: PluginType) -> Vec<Arc<PluginDescriptor>> {
        let Some(entry) = self.entries.get(index) else {
            return Vec::new();
        };
        entry
            .source
            .plugins(kind)
            .into_iter()
            .filter(|descriptor| !entry.excluded.contains(&descriptor.key()))
            .collect()
    }

    /// `(kind, name)`을 제공하는 첫 소스의 인덱스
    pub fn winning_index(&self, kind: PluginType, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.get(kind, name).is_some())
    }

    pub fn has_plugin(&self, kind: PluginType, name: &str) -> bool {
        self.winning_index(kind, name).is_some()
    }

    /// 우선순위가 가장 높은 디스크립터
    pub fn get_plugin(&self, kind: PluginType, name: &str) -> Option<Arc<PluginDescriptor>> {
        self.entries.iter().find_map(|entry| entry.get(kind, name))
    }

    /// 해당 타입의 모든 플러그인 (이름별로 우선순위가 가장 높은 것)
    pub fn get_plugins(&self, kind: PluginType) -> BTreeMap<String, Arc<PluginDescriptor>> {
        let mut plugins = BTreeMap::new();
        for index in 0..self.entries.len() {
            for descriptor in self.source_plugins(index, kind) {
                plugins
                    .entry(descriptor.name.clone())
                    .or_insert(descriptor);
            }
        }
        plugins
    }

    /// 이름으로 타입 찾기
    pub fn find_type(&self, name: &str) -> Option<PluginType> {
        PluginType::ALL
            .into_iter()
            .find(|kind| self.has_plugin(*kind, name))
    }

    /// 정적 속성 (없으면 빈 맵)
    pub fn load_attributes(&self, kind: PluginType, name: &str) -> HashMap<String, Value> {
        let Some(index) = self.winning_index(kind, name) else {
            return HashMap::new();
        };
        match self.entries[index].source.load_attributes(kind, name) {
            Ok(attrs) => attrs,
            Err(e) => {
                debug!("Failed to read attributes of {}/{}: {}", kind, name, e);
                HashMap::new()
            }
        }
    }

    // ========================================================================
    // 코드 로드
    // ========================================================================

    /// 모듈 로드 (캐시됨)
    ///
    /// 우선순위가 가장 높은 소스에서만 시도합니다.
    pub fn load_module(&self, kind: PluginType, name: &str) -> Result<Arc<PluginModule>> {
        let key = PluginKey::new(kind, name);
        if let Some(module) = self.cache.module(&key) {
            return Ok(module);
        }

        let index = self
            .winning_index(kind, name)
            .ok_or_else(|| Error::load(kind.as_str(), name, "plugin not found"))?;

        match self.entries[index].source.load_module(kind, name) {
            Ok(module) => {
                debug!("Loaded module {} from {}", key, self.entries[index].source.name());
                Ok(self.cache.insert_module(key, module))
            }
            Err(e) => {
                error!("Error importing {}: {}", key, e);
                Err(e)
            }
        }
    }

    /// 클래스 로드 (캐시됨)
    pub fn load_class(&self, kind: PluginType, name: &str) -> Result<Arc<PluginClass>> {
        let key = PluginKey::new(kind, name);
        if let Some(class) = self.cache.class(&key) {
            return Ok(class);
        }

        let module = self.load_module(kind, name)?;
        match module.class(name) {
            Some(class) => Ok(self.cache.insert_class(key, class)),
            None => {
                error!("Error importing {}: class not defined", key);
                Err(Error::class_not_found(kind.as_str(), name))
            }
        }
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{PluginDescriptor, StaticSource};

    fn chain() -> LoaderChain {
        let user = StaticSource::new("user")
            .with_handler(
                PluginDescriptor::new(PluginType::Hoster, "FooCom").with_version(2),
            )
            .with_handler(
                PluginDescriptor::new(PluginType::Hoster, "Future")
                    .with_api_version(PLUGIN_API_VERSION + 1),
            );
        let builtin = StaticSource::new("builtin")
            .with_handler(PluginDescriptor::new(PluginType::Hoster, "FooCom"))
            .with_handler(PluginDescriptor::new(PluginType::Hoster, "Future"))
            .with_handler(PluginDescriptor::new(PluginType::Crypter, "Folder"));

        LoaderChain::new(vec![Arc::new(user), Arc::new(builtin)])
    }

    #[test]
    fn test_first_source_wins() {
        let chain = chain();
        let foo = chain.get_plugin(PluginType::Hoster, "FooCom").unwrap();
        assert_eq!(foo.version, 2);
        assert_eq!(chain.winning_index(PluginType::Hoster, "FooCom"), Some(0));
    }

    #[test]
    fn test_incompatible_excluded_falls_through() {
        let chain = chain();
        assert_eq!(chain.incompatible().len(), 1);
        assert_eq!(chain.incompatible()[0].source, "user");

        // user 소스의 Future는 제외되어 builtin 것이 사용됨
        assert_eq!(chain.winning_index(PluginType::Hoster, "Future"), Some(1));
        assert!(chain.source_plugins(0, PluginType::Hoster).len() == 1);
    }

    #[test]
    fn test_get_plugins_and_find_type() {
        let chain = chain();
        let hosters = chain.get_plugins(PluginType::Hoster);
        assert_eq!(hosters.len(), 2);
        assert_eq!(hosters["FooCom"].version, 2);

        assert_eq!(chain.find_type("Folder"), Some(PluginType::Crypter));
        assert_eq!(chain.find_type("Nope"), None);
    }

    #[test]
    fn test_load_module_is_cached() {
        let chain = chain();
        let first = chain.load_module(PluginType::Hoster, "FooCom").unwrap();
        let second = chain.load_module(PluginType::Hoster, "FooCom").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let class = chain.load_class(PluginType::Hoster, "FooCom").unwrap();
        assert_eq!(class.name(), "FooCom");
        assert_eq!(chain.cache().class_count(), 1);
    }

    #[test]
    fn test_load_attributes_unknown_is_empty() {
        let chain = chain();
        assert!(chain.load_attributes(PluginType::Addon, "Nope").is_empty());
        assert_eq!(
            chain.load_attributes(PluginType::Hoster, "FooCom")["version"],
            Value::from(2)
        );
    }
}
