//! Config Store - 섹션 단위 설정 저장소
//!
//! `section → option → value` 구조. 값이 바뀌면 `config:changed` 이벤트를 발행합니다.

use crate::event::{EventBus, CONFIG_CHANGED};
use crate::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// 플러그인 활성화 여부를 나타내는 예약 옵션
pub const ACTIVATED_OPTION: &str = "activated";

/// 설정 값의 참/거짓 판정
///
/// 설정 파일과 런타임 변경 모두 이 규칙을 따릅니다.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes"),
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ============================================================================
// ConfigOption - 플러그인 설정 스키마
// ============================================================================

/// 사용자가 조정할 수 있는 설정 항목 하나
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOption {
    /// 옵션 이름
    pub name: String,

    /// 타입 ("bool", "int", "str", 또는 "a;b;c" 선택지)
    #[serde(rename = "type")]
    pub kind: String,

    /// 표시 이름
    #[serde(default)]
    pub label: String,

    /// 기본값
    #[serde(default)]
    pub default: Value,
}

impl ConfigOption {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            label: String::new(),
            default,
        }
    }

    /// 예약된 `activated` 옵션
    pub fn activated(default: bool) -> Self {
        Self::new(ACTIVATED_OPTION, "bool", Value::Bool(default)).with_label("Activated")
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

// ============================================================================
// ConfigStore
// ============================================================================

/// 섹션 단위 설정 저장소
pub struct ConfigStore {
    sections: RwLock<HashMap<String, Map<String, Value>>>,
    events: Arc<EventBus>,
}

impl ConfigStore {
    /// 빈 저장소 생성
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            sections: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// 파일에서 로드 (`.toml` 또는 `.json`)
    ///
    /// 최상위 테이블 하나가 섹션 하나입니다.
    pub fn load_file(path: &Path, events: Arc<EventBus>) -> Result<Self> {
        let store = Self::new(events);
        store.merge_file(path)?;
        Ok(store)
    }

    /// 파일 내용을 현재 설정에 병합 (이벤트 발행 없음)
    pub fn merge_file(&self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let document: Value = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };

        let Value::Object(tables) = document else {
            return Err(Error::Config(format!(
                "{} must contain a table of sections",
                path.display()
            )));
        };

        let mut sections = self.sections.write();
        for (section, options) in tables {
            match options {
                Value::Object(options) => sections.entry(section).or_default().extend(options),
                // 섹션이 아닌 최상위 값은 무시
                other => debug!(section = %section, value = %other, "Ignoring non-table config entry"),
            }
        }

        info!("Loaded configuration from {}", path.display());
        Ok(())
    }

    /// 값 조회
    pub fn get(&self, section: &str, option: &str) -> Option<Value> {
        self.sections
            .read()
            .get(section)
            .and_then(|options| options.get(option))
            .cloned()
    }

    /// bool 값 조회 (없으면 false, 나머지는 `is_truthy`)
    pub fn get_bool(&self, section: &str, option: &str) -> bool {
        self.get(section, option).is_some_and(|v| is_truthy(&v))
    }

    /// 섹션 전체 조회
    pub fn section(&self, section: &str) -> Option<Map<String, Value>> {
        self.sections.read().get(section).cloned()
    }

    /// 값 설정
    ///
    /// 값이 실제로 바뀐 경우에만 `config:changed (section, option, value)` 발행.
    /// 이벤트는 락을 놓은 뒤 발행됩니다.
    pub fn set(&self, section: &str, option: &str, value: Value) {
        let changed = {
            let mut sections = self.sections.write();
            let options = sections.entry(section.to_string()).or_default();
            match options.get(option) {
                Some(current) if *current == value => false,
                _ => {
                    options.insert(option.to_string(), value.clone());
                    true
                }
            }
        };

        if changed {
            debug!(section = %section, option = %option, "Config value changed");
            self.events.dispatch(
                CONFIG_CHANGED,
                &[Value::from(section), Value::from(option), value],
            );
        }
    }

    /// 스키마 기본값 등록 (이미 있는 값은 유지)
    pub fn register_schema(&self, section: &str, schema: &[ConfigOption]) {
        let mut sections = self.sections.write();
        let options = sections.entry(section.to_string()).or_default();
        for option in schema {
            options
                .entry(option.name.clone())
                .or_insert_with(|| option.default.clone());
        }
    }

    /// 이벤트 버스 접근
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[test]
    fn test_get_set() {
        let store = ConfigStore::new(Arc::new(EventBus::new()));

        assert_eq!(store.get("Stats", "activated"), None);
        assert!(!store.get_bool("Stats", "activated"));

        store.set("Stats", "activated", Value::Bool(true));
        assert!(store.get_bool("Stats", "activated"));
        assert_eq!(store.section("Stats").map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(&Value::Bool(true)));
        assert!(is_truthy(&Value::from(1)));
        assert!(is_truthy(&Value::from("yes")));
        assert!(is_truthy(&Value::from("ON")));
        assert!(!is_truthy(&Value::Bool(false)));
        assert!(!is_truthy(&Value::from(0)));
        assert!(!is_truthy(&Value::from("off")));
        assert!(!is_truthy(&Value::Null));
    }

    #[test]
    fn test_get_bool_accepts_truthy_values() {
        let store = ConfigStore::new(Arc::new(EventBus::new()));
        store.set("Stats", "activated", Value::from(1));
        assert!(store.get_bool("Stats", "activated"));

        store.set("Stats", "activated", Value::from("yes"));
        assert!(store.get_bool("Stats", "activated"));

        store.set("Stats", "activated", Value::from(0));
        assert!(!store.get_bool("Stats", "activated"));
    }

    #[test]
    fn test_set_publishes_only_on_change() {
        let events = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let (count_inner, last_inner) = (Arc::clone(&count), Arc::clone(&last));
        events.listen(
            CONFIG_CHANGED,
            Arc::new(move |args: &[Value]| {
                count_inner.fetch_add(1, Ordering::SeqCst);
                *last_inner.lock() = args.to_vec();
            }),
        );

        let store = ConfigStore::new(Arc::clone(&events));
        store.set("Stats", "activated", Value::Bool(true));
        store.set("Stats", "activated", Value::Bool(true));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(
            *last.lock(),
            vec![Value::from("Stats"), Value::from("activated"), Value::Bool(true)]
        );
    }

    #[test]
    fn test_register_schema_keeps_existing() {
        let store = ConfigStore::new(Arc::new(EventBus::new()));
        store.set("Stats", "activated", Value::Bool(true));

        store.register_schema(
            "Stats",
            &[
                ConfigOption::activated(false),
                ConfigOption::new("interval", "int", Value::from(60)),
            ],
        );

        assert!(store.get_bool("Stats", "activated"));
        assert_eq!(store.get("Stats", "interval"), Some(Value::from(60)));
    }

    #[test]
    fn test_load_toml_and_json() {
        let temp = TempDir::new().unwrap();

        let toml_path = temp.path().join("config.toml");
        std::fs::write(
            &toml_path,
            "[Stats]\nactivated = true\ninterval = 30\n\n[plugins]\nhistory_size = 5\n",
        )
        .unwrap();

        let store = ConfigStore::load_file(&toml_path, Arc::new(EventBus::new())).unwrap();
        assert!(store.get_bool("Stats", "activated"));
        assert_eq!(store.get("Stats", "interval"), Some(Value::from(30)));
        assert_eq!(store.get("plugins", "history_size"), Some(Value::from(5)));

        let json_path = temp.path().join("extra.json");
        std::fs::write(&json_path, r#"{"Stats": {"activated": false}}"#).unwrap();
        store.merge_file(&json_path).unwrap();
        assert!(!store.get_bool("Stats", "activated"));
        assert_eq!(store.get("Stats", "interval"), Some(Value::from(30)));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = ConfigStore::load_file(
            &temp.path().join("missing.toml"),
            Arc::new(EventBus::new()),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
