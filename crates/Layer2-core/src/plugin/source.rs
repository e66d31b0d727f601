//! Plugin Source - 플러그인 로더 계약
//!
//! 하나의 소스는 하나의 위치(내장, 사용자 디렉토리 등)에서 발견된 플러그인을
//! 제공합니다. `LoaderChain`이 여러 소스를 우선순위 순서로 묶습니다.

use super::module::{PluginClass, PluginModule};
use super::types::{PluginDescriptor, PluginKey, PluginType};
use haul_foundation::{Error, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 플러그인 소스 계약
pub trait PluginSource: Send + Sync {
    /// 소스 이름 (로그용)
    fn name(&self) -> &str;

    /// 해당 타입의 플러그인 목록 (이름 순)
    fn plugins(&self, kind: PluginType) -> Vec<Arc<PluginDescriptor>>;

    /// 플러그인 조회
    fn get_plugin(&self, kind: PluginType, name: &str) -> Option<Arc<PluginDescriptor>>;

    /// 플러그인 존재 여부
    fn has_plugin(&self, kind: PluginType, name: &str) -> bool {
        self.get_plugin(kind, name).is_some()
    }

    /// 정적 속성 조회 (코드 로드 없음)
    fn load_attributes(&self, kind: PluginType, name: &str) -> Result<HashMap<String, Value>> {
        self.get_plugin(kind, name)
            .map(|descriptor| descriptor.attributes())
            .ok_or_else(|| Error::NotFound(format!("{}/{}", kind, name)))
    }

    /// 플러그인 코드 로드
    fn load_module(&self, kind: PluginType, name: &str) -> Result<PluginModule>;

    /// 모든 타입의 플러그인
    fn all_plugins(&self) -> Vec<Arc<PluginDescriptor>> {
        PluginType::ALL
            .into_iter()
            .flat_map(|kind| self.plugins(kind))
            .collect()
    }
}

// ============================================================================
// StaticSource - 내장 플러그인
// ============================================================================

/// 코드에 내장된 플러그인 소스
pub struct StaticSource {
    name: String,
    descriptors: BTreeMap<PluginKey, Arc<PluginDescriptor>>,
    modules: HashMap<PluginKey, PluginModule>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptors: BTreeMap::new(),
            modules: HashMap::new(),
        }
    }

    /// 디스크립터만 등록 (코드 로드는 실패)
    pub fn with_descriptor(mut self, descriptor: PluginDescriptor) -> Self {
        self.descriptors
            .insert(descriptor.key(), Arc::new(descriptor));
        self
    }

    /// 디스크립터와 모듈 등록
    pub fn with_module(mut self, descriptor: PluginDescriptor, module: PluginModule) -> Self {
        let key = descriptor.key();
        self.modules.insert(key.clone(), module);
        self.descriptors.insert(key, Arc::new(descriptor));
        self
    }

    /// 같은 이름의 핸들러 클래스를 가진 플러그인 등록
    pub fn with_handler(self, descriptor: PluginDescriptor) -> Self {
        let key = descriptor.key();
        let module = PluginModule::new(key.clone())
            .with_class(PluginClass::handler(key.kind, key.name.clone()));
        self.with_module(descriptor, module)
    }

    /// 애드온 플러그인 등록
    pub fn with_addon(self, descriptor: PluginDescriptor, class: PluginClass) -> Self {
        let module = PluginModule::new(descriptor.key()).with_class(class);
        self.with_module(descriptor, module)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl PluginSource for StaticSource {
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
        self.modules
            .get(&PluginKey::new(kind, name))
            .cloned()
            .ok_or_else(|| Error::load(kind.as_str(), name, "no code registered"))
    }
}
