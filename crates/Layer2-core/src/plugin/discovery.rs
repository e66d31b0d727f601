//! Plugin Discovery - 디렉토리 기반 플러그인 소스
//!
//! 디렉토리 구조:
//!
//! ```text
//! <root>/
//!   hoster/<Name>/plugin.json
//!   crypter/<Name>/plugin.json
//!   addon/<Name>/plugin.json
//!   ...
//! ```
//!
//! `plugin.json`의 `entry`는 `ModuleCatalog`에 등록된 코드 단위를 가리킵니다.
//! 코드는 `load_module` 호출 시점에 연결됩니다.

use super::module::{ModuleCatalog, PluginModule};
use super::source::PluginSource;
use super::types::{PluginDescriptor, PluginKey, PluginType, PLUGIN_API_VERSION};
use haul_foundation::{ConfigOption, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// 매니페스트 파일 이름
pub const MANIFEST_FILE: &str = "plugin.json";

// ============================================================================
// PluginJsonFile - plugin.json 포맷
// ============================================================================

/// plugin.json 파일 구조
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PluginJsonFile {
    /// 플러그인 이름
    pub name: String,

    /// 플러그인 버전
    #[serde(default = "default_version")]
    pub version: u32,

    /// 요구하는 API 버전
    #[serde(default = "default_api_version")]
    pub api_version: u32,

    /// URL 패턴
    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub internal: bool,

    #[serde(default)]
    pub description: String,

    /// 코드 엔트리 (없으면 플러그인 이름)
    #[serde(default)]
    pub entry: Option<String>,

    /// 설정 스키마
    #[serde(default)]
    pub config: Vec<ConfigOption>,
}

fn default_version() -> u32 {
    1
}

fn default_api_version() -> u32 {
    PLUGIN_API_VERSION
}

impl PluginJsonFile {
    fn into_descriptor(self, kind: PluginType) -> Result<(PluginDescriptor, String)> {
        let entry = self.entry.unwrap_or_else(|| self.name.clone());

        let mut descriptor = PluginDescriptor::new(kind, self.name)
            .with_version(self.version)
            .with_api_version(self.api_version)
            .with_description(self.description);
        descriptor.config = self.config;

        if let Some(category) = self.category {
            descriptor = descriptor.with_category(category);
        }
        if self.internal {
            descriptor = descriptor.internal();
        }
        if let Some(pattern) = self.pattern {
            descriptor = descriptor.with_pattern(&pattern)?;
        }

        Ok((descriptor, entry))
    }
}

// ============================================================================
// DirectorySource
// ============================================================================

/// 디렉토리에서 발견된 플러그인 소스
pub struct DirectorySource {
    name: String,
    root: PathBuf,
    descriptors: BTreeMap<PluginKey, Arc<PluginDescriptor>>,
    entries: HashMap<PluginKey, String>,
    catalog: Arc<ModuleCatalog>,
}

impl DirectorySource {
    /// 루트 디렉토리 스캔
    ///
    /// 루트가 없으면 빈 소스를 반환합니다. 잘못된 매니페스트는 경고 후 건너뜁니다.
    pub async fn scan(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        catalog: Arc<ModuleCatalog>,
    ) -> Result<Self> {
        let mut source = Self {
            name: name.into(),
            root: root.into(),
            descriptors: BTreeMap::new(),
            entries: HashMap::new(),
            catalog,
        };

        if !source.root.exists() {
            debug!("Plugin directory {:?} does not exist", source.root);
            return Ok(source);
        }

        for kind in PluginType::ALL {
            let dir = source.root.join(kind.as_str());
            if !dir.is_dir() {
                continue;
            }

            for (descriptor, entry) in Self::scan_type_directory(&dir, kind).await? {
                let key = descriptor.key();
                debug!("Found plugin: {} at {:?}", key, dir);
                source.entries.insert(key.clone(), entry);
                source.descriptors.insert(key, Arc::new(descriptor));
            }
        }

        info!(
            source = %source.name,
            "Discovered {} plugins in {:?}",
            source.descriptors.len(),
            source.root
        );
        Ok(source)
    }

    /// 타입 디렉토리 스캔
    async fn scan_type_directory(
        dir: &Path,
        kind: PluginType,
    ) -> Result<Vec<(PluginDescriptor, String)>> {
        let mut found = Vec::new();
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let manifest_path = path.join(MANIFEST_FILE);
            if !manifest_path.exists() {
                continue;
            }

            match Self::parse_manifest(&manifest_path, kind).await {
                Ok(parsed) => found.push(parsed),
                Err(e) => {
                    warn!("Failed to parse plugin manifest {:?}: {}", manifest_path, e);
                }
            }
        }

        Ok(found)
    }

    /// plugin.json 파싱
    async fn parse_manifest(path: &Path, kind: PluginType) -> Result<(PluginDescriptor, String)> {
        let content = fs::read_to_string(path).await?;
        let json: PluginJsonFile = serde_json::from_str(&content)?;
        json.into_descriptor(kind)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl PluginSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn plugins(&self, kind: PluginType) -> Vec<Arc<PluginDescriptor>> {
        self.descriptors
            .values()
            .filter(|descriptor| descriptor.kind == kind)
            .cloned()
            .collect()
    }

    fn get_plugin(&self, kind: PluginType, name: &str) -> Option<Arc<PluginDescriptor>> {
        self.descriptors.get(&PluginKey::new(kind, name)).cloned()
    }

    fn load_module(&self, kind: PluginType, name: &str) -> Result<PluginModule> {
        let key = PluginKey::new(kind, name);
        let entry = self
            .entries
            .get(&key)
            .ok_or_else(|| Error::load(kind.as_str(), name, "not provided by this source"))?;
        self.catalog.link(key, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginClass;
    use tempfile::TempDir;

    fn write_manifest(root: &Path, kind: &str, name: &str, body: &str) {
        let dir = root.join(kind).join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), body).unwrap();
    }

    #[tokio::test]
    async fn test_scan_directory() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            "hoster",
            "FooCom",
            r#"{"name": "FooCom", "pattern": "https?://foo\\.com/.+", "entry": "foo"}"#,
        );
        write_manifest(
            temp.path(),
            "addon",
            "Stats",
            r#"{"name": "Stats", "category": "tools", "config": [
                {"name": "activated", "type": "bool", "default": true}
            ]}"#,
        );
        write_manifest(temp.path(), "hoster", "Broken", "{ not json");

        let catalog = Arc::new(ModuleCatalog::new());
        catalog.register("foo", vec![PluginClass::handler(PluginType::Hoster, "FooCom")]);

        let source = DirectorySource::scan("user", temp.path(), catalog)
            .await
            .unwrap();

        assert_eq!(source.len(), 2);
        let foo = source.get_plugin(PluginType::Hoster, "FooCom").unwrap();
        assert!(foo.matches("http://foo.com/file"));

        let stats = source.get_plugin(PluginType::Addon, "Stats").unwrap();
        assert_eq!(stats.category.as_deref(), Some("tools"));
        assert_eq!(stats.config.len(), 1);

        assert!(source.load_module(PluginType::Hoster, "FooCom").is_ok());
        // 카탈로그에 없는 엔트리
        assert!(source.load_module(PluginType::Addon, "Stats").is_err());
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let source = DirectorySource::scan(
            "user",
            temp.path().join("nope"),
            Arc::new(ModuleCatalog::new()),
        )
        .await
        .unwrap();

        assert!(source.is_empty());
    }
}
