//! Plugin Module - 로드된 플러그인 코드 단위
//!
//! `PluginModule`은 한 플러그인의 코드 단위이고, 이름으로 클래스를 조회합니다.
//! 클래스 이름은 보통 플러그인 이름과 같습니다.

use super::types::{PluginKey, PluginType};
use crate::addon::{Addon, AddonContext};
use haul_foundation::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// 애드온 인스턴스 생성자
pub type AddonFactory = Arc<dyn Fn(AddonContext) -> Result<Arc<dyn Addon>> + Send + Sync>;

// ============================================================================
// PluginClass
// ============================================================================

/// 플러그인 클래스 핸들
///
/// 애드온 클래스는 생성자를 가지고, hoster/crypter 등은 이름만 가집니다.
#[derive(Clone)]
pub struct PluginClass {
    kind: PluginType,
    name: String,
    factory: Option<AddonFactory>,
}

impl PluginClass {
    /// 생성자 없는 핸들러 클래스
    pub fn handler(kind: PluginType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            factory: None,
        }
    }

    /// 애드온 클래스
    pub fn addon<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(AddonContext) -> Result<Arc<dyn Addon>> + Send + Sync + 'static,
    {
        Self {
            kind: PluginType::Addon,
            name: name.into(),
            factory: Some(Arc::new(factory)),
        }
    }

    pub fn kind(&self) -> PluginType {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_addon(&self) -> bool {
        self.factory.is_some()
    }

    /// 애드온 인스턴스 생성
    pub fn instantiate(&self, ctx: AddonContext) -> Result<Arc<dyn Addon>> {
        match &self.factory {
            Some(factory) => factory(ctx),
            None => Err(Error::InvalidInput(format!(
                "{}/{} is not an addon class",
                self.kind, self.name
            ))),
        }
    }
}

impl std::fmt::Debug for PluginClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginClass")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("addon", &self.is_addon())
            .finish()
    }
}

// ============================================================================
// PluginModule
// ============================================================================

/// 로드된 플러그인 모듈
#[derive(Debug, Clone)]
pub struct PluginModule {
    key: PluginKey,
    classes: HashMap<String, Arc<PluginClass>>,
}

impl PluginModule {
    pub fn new(key: PluginKey) -> Self {
        Self {
            key,
            classes: HashMap::new(),
        }
    }

    pub fn with_class(mut self, class: PluginClass) -> Self {
        self.classes
            .insert(class.name().to_string(), Arc::new(class));
        self
    }

    pub fn key(&self) -> &PluginKey {
        &self.key
    }

    /// 이름으로 클래스 조회
    pub fn class(&self, name: &str) -> Option<Arc<PluginClass>> {
        self.classes.get(name).cloned()
    }

    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ============================================================================
// ModuleCatalog - 엔트리 이름 → 클래스 묶음
// ============================================================================

/// 디렉토리 플러그인의 `entry`를 실제 코드에 연결하는 카탈로그
///
/// 하나의 엔트리는 여러 클래스를 제공할 수 있습니다.
#[derive(Default)]
pub struct ModuleCatalog {
    entries: RwLock<HashMap<String, Vec<PluginClass>>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 엔트리 등록 (기존 엔트리는 교체)
    pub fn register(&self, entry: impl Into<String>, classes: impl IntoIterator<Item = PluginClass>) {
        self.entries
            .write()
            .insert(entry.into(), classes.into_iter().collect());
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.read().contains_key(entry)
    }

    /// 엔트리의 클래스들로 모듈 구성
    pub fn link(&self, key: PluginKey, entry: &str) -> Result<PluginModule> {
        let entries = self.entries.read();
        let classes = entries.get(entry).ok_or_else(|| {
            Error::load(
                key.kind.as_str(),
                key.name.clone(),
                format!("unknown entry '{}'", entry),
            )
        })?;

        Ok(classes
            .iter()
            .cloned()
            .fold(PluginModule::new(key), PluginModule::with_class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_class_lookup() {
        let module = PluginModule::new(PluginKey::new(PluginType::Hoster, "FooCom"))
            .with_class(PluginClass::handler(PluginType::Hoster, "FooCom"));

        assert!(module.class("FooCom").is_some());
        assert!(module.class("BarCom").is_none());
        assert!(!module.class("FooCom").unwrap().is_addon());
    }

    #[test]
    fn test_catalog_link() {
        let catalog = ModuleCatalog::new();
        catalog.register(
            "multihost",
            vec![
                PluginClass::handler(PluginType::Hoster, "AlphaCom"),
                PluginClass::handler(PluginType::Hoster, "BetaCom"),
            ],
        );

        let module = catalog
            .link(PluginKey::new(PluginType::Hoster, "BetaCom"), "multihost")
            .unwrap();
        assert_eq!(module.class_names(), vec!["AlphaCom", "BetaCom"]);

        let missing = catalog.link(PluginKey::new(PluginType::Hoster, "X"), "nope");
        assert!(matches!(missing, Err(Error::Load { .. })));
    }
}
