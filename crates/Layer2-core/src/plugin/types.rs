//! Core plugin types - 플러그인 타입과 디스크립터

use haul_foundation::{ConfigOption, Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// 호스트가 제공하는 플러그인 API 버전
pub const PLUGIN_API_VERSION: u32 = 1;

/// 어떤 패턴에도 매칭되지 않은 URL을 처리하는 기본 hoster 플러그인
pub const DEFAULT_PLUGIN: &str = "BasePlugin";

/// 매치 히스토리 최대 크기
pub const MATCH_HISTORY: usize = 10;

// ============================================================================
// PluginType
// ============================================================================

/// 플러그인 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    /// URL을 직접 파일 소스로 처리
    Hoster,
    /// 페이지를 풀어서 파일 소스를 찾음
    Crypter,
    /// 링크 컨테이너 파일
    Container,
    /// 이벤트에 반응하는 백그라운드 확장
    Addon,
    /// 계정 플러그인
    Account,
    /// 내부 헬퍼
    Internal,
}

impl PluginType {
    /// 모든 타입 (find_type 탐색 순서)
    pub const ALL: [PluginType; 6] = [
        PluginType::Hoster,
        PluginType::Crypter,
        PluginType::Container,
        PluginType::Addon,
        PluginType::Account,
        PluginType::Internal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hoster => "hoster",
            Self::Crypter => "crypter",
            Self::Container => "container",
            Self::Addon => "addon",
            Self::Account => "account",
            Self::Internal => "internal",
        }
    }

    /// URL 해석 결과로 쓰이는 카테고리인지
    pub fn is_url_category(&self) -> bool {
        matches!(self, Self::Hoster | Self::Crypter)
    }
}

impl std::fmt::Display for PluginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PluginType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PluginType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown plugin type '{}'", s)))
    }
}

// ============================================================================
// PluginKey
// ============================================================================

/// 플러그인 식별자 `(type, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginKey {
    pub kind: PluginType,
    pub name: String,
}

impl PluginKey {
    pub fn new(kind: PluginType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for PluginKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

// ============================================================================
// PluginDescriptor
// ============================================================================

/// 발견된 플러그인의 정적 메타데이터
///
/// 코드를 로드하지 않고 얻을 수 있는 정보만 담습니다.
/// URL 패턴은 URL 앞부분부터 매칭됩니다.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    pub kind: PluginType,
    pub name: String,
    pub version: u32,
    pub api_version: u32,
    pub category: Option<String>,
    pub internal: bool,
    pub description: String,
    pub config: Vec<ConfigOption>,
    pattern: Option<Regex>,
    pattern_source: Option<String>,
}

impl PluginDescriptor {
    pub fn new(kind: PluginType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            version: 1,
            api_version: PLUGIN_API_VERSION,
            category: None,
            internal: false,
            description: String::new(),
            config: Vec::new(),
            pattern: None,
            pattern_source: None,
        }
    }

    /// URL 패턴 설정 (시작 위치에 고정해서 컴파일)
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.pattern = Some(Regex::new(&format!("^(?:{})", pattern))?);
        self.pattern_source = Some(pattern.to_string());
        Ok(self)
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_api_version(mut self, api_version: u32) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 설정 스키마 항목 추가
    pub fn with_option(mut self, option: ConfigOption) -> Self {
        self.config.push(option);
        self
    }

    /// 내부 플러그인으로 표시 (항상 로드, 목록에서 숨김)
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn key(&self) -> PluginKey {
        PluginKey::new(self.kind, self.name.clone())
    }

    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// URL이 이 플러그인의 패턴에 매칭되는지
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(url))
    }

    /// 호스트 API와 호환되는지
    pub fn is_compatible(&self) -> bool {
        self.api_version == PLUGIN_API_VERSION
    }

    /// 정적 속성 맵 (코드 로드 없이 제공)
    pub fn attributes(&self) -> HashMap<String, Value> {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::from(self.name.as_str()));
        attrs.insert("type".to_string(), Value::from(self.kind.as_str()));
        attrs.insert("version".to_string(), Value::from(self.version));
        attrs.insert("api_version".to_string(), Value::from(self.api_version));
        attrs.insert("internal".to_string(), Value::Bool(self.internal));
        attrs.insert(
            "description".to_string(),
            Value::from(self.description.as_str()),
        );
        if let Some(pattern) = &self.pattern_source {
            attrs.insert("pattern".to_string(), Value::from(pattern.as_str()));
        }
        if let Some(category) = &self.category {
            attrs.insert("category".to_string(), Value::from(category.as_str()));
        }
        if !self.config.is_empty() {
            attrs.insert(
                "config".to_string(),
                serde_json::to_value(&self.config).unwrap_or(Value::Null),
            );
        }
        attrs
    }
}
