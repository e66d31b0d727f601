//! Addon types - 서비스/정보 디스크립터와 조회 결과

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 애드온이 노출하는 서비스
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    /// 메서드 이름
    pub name: String,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub description: String,

    /// 인자 이름 목록
    #[serde(default)]
    pub arg_spec: Vec<String>,

    /// 패키지 단위로 호출 가능한지
    #[serde(default)]
    pub package_scope: bool,

    /// 적용 미디어 타입 마스크 (0 = 없음)
    #[serde(default)]
    pub media_scope: u32,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            description: String::new(),
            arg_spec: Vec::new(),
            package_scope: false,
            media_scope: 0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arg_spec = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn package_scope(mut self) -> Self {
        self.package_scope = true;
        self
    }

    pub fn with_media_scope(mut self, media_scope: u32) -> Self {
        self.media_scope = media_scope;
        self
    }
}

/// 애드온 info 속성
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoProperty {
    pub name: String,
    pub description: String,
    /// 현재 값 (조회 시 채워짐)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// `iter_addons` 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonSummary {
    pub name: String,
    pub internal: bool,
    pub active: bool,
    pub instances: usize,
    pub services: Vec<String>,
    /// `(method, event)` 바인딩
    pub events: Vec<(String, String)>,
}

/// `build_index` 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub active: Vec<String>,
    pub deactivated: Vec<String>,
}
