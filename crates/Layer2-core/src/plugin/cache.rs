//! Module/Class cache
//!
//! 한 번 로드된 모듈과 클래스는 프로세스 수명 동안 유지됩니다.
//! 동시 로드 시 먼저 삽입된 값이 이깁니다.

use super::module::{PluginClass, PluginModule};
use super::types::PluginKey;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ModuleCache {
    modules: RwLock<HashMap<PluginKey, Arc<PluginModule>>>,
    classes: RwLock<HashMap<PluginKey, Arc<PluginClass>>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(&self, key: &PluginKey) -> Option<Arc<PluginModule>> {
        self.modules.read().get(key).cloned()
    }

    /// 모듈 삽입. 이미 있으면 기존 값 반환
    pub fn insert_module(&self, key: PluginKey, module: PluginModule) -> Arc<PluginModule> {
        Arc::clone(
            self.modules
                .write()
                .entry(key)
                .or_insert_with(|| Arc::new(module)),
        )
    }

    pub fn class(&self, key: &PluginKey) -> Option<Arc<PluginClass>> {
        self.classes.read().get(key).cloned()
    }

    /// 클래스 삽입. 이미 있으면 기존 값 반환
    pub fn insert_class(&self, key: PluginKey, class: Arc<PluginClass>) -> Arc<PluginClass> {
        Arc::clone(self.classes.write().entry(key).or_insert(class))
    }

    pub fn module_count(&self) -> usize {
        self.modules.read().len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.read().len()
    }
}
