//! Plugin Matchers - URL/플러그인 해석 가로채기
//!
//! 매처는 패턴 스캔보다 먼저 URL을 특정 플러그인으로 보내거나,
//! 플러그인 조회 시 `(type, name)`을 다른 플러그인으로 바꿀 수 있습니다.

use super::types::{PluginKey, PluginType};
use haul_foundation::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// 매처가 구현하는 기능
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherCapability {
    MatchUrl,
    MatchPlugin,
}

/// 매처 계약
///
/// 최소 하나의 기능을 선언해야 체인에 등록됩니다.
pub trait PluginMatcher: Send + Sync {
    /// 이름 (로그용)
    fn name(&self) -> &str;

    /// 구현한 기능
    fn capabilities(&self) -> Vec<MatcherCapability>;

    /// URL을 처리할 플러그인
    fn match_url(&self, _url: &str) -> Option<PluginKey> {
        None
    }

    /// `(kind, name)` 대신 사용할 플러그인
    fn match_plugin(&self, _kind: PluginType, _name: &str) -> Option<PluginKey> {
        None
    }
}

fn same_matcher(a: &Arc<dyn PluginMatcher>, b: &Arc<dyn PluginMatcher>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

// ============================================================================
// MatcherChain
// ============================================================================

/// 순서 있는 매처 목록
#[derive(Default)]
pub struct MatcherChain {
    matchers: Vec<Arc<dyn PluginMatcher>>,
}

impl MatcherChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 매처 추가
    ///
    /// 이미 있는 매처는 먼저 제거됩니다. `index`가 없으면 맨 앞에 삽입합니다.
    pub fn add(&mut self, matcher: Arc<dyn PluginMatcher>, index: Option<usize>) -> Result<()> {
        if matcher.capabilities().is_empty() {
            return Err(Error::MatcherType(matcher.name().to_string()));
        }

        self.remove(&matcher);
        let index = index.unwrap_or(0).min(self.matchers.len());
        debug!(matcher = %matcher.name(), index, "Added plugin matcher");
        self.matchers.insert(index, matcher);
        Ok(())
    }

    /// 매처 제거. 없으면 false
    pub fn remove(&mut self, matcher: &Arc<dyn PluginMatcher>) -> bool {
        let before = self.matchers.len();
        self.matchers.retain(|m| !same_matcher(m, matcher));
        before != self.matchers.len()
    }

    pub fn contains(&self, matcher: &Arc<dyn PluginMatcher>) -> bool {
        self.matchers.iter().any(|m| same_matcher(m, matcher))
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// 첫 번째 URL 매치 (hoster/crypter 결과만 인정)
    pub fn match_url(&self, url: &str) -> Option<PluginKey> {
        self.matchers
            .iter()
            .filter(|m| m.capabilities().contains(&MatcherCapability::MatchUrl))
            .filter_map(|m| m.match_url(url))
            .find(|key| key.kind.is_url_category())
    }

    /// 모든 매처를 순서대로 적용해서 플러그인 키 변환
    pub fn match_plugin(&self, kind: PluginType, name: &str) -> PluginKey {
        let mut key = PluginKey::new(kind, name);
        for matcher in &self.matchers {
            if !matcher
                .capabilities()
                .contains(&MatcherCapability::MatchPlugin)
            {
                continue;
            }
            if let Some(next) = matcher.match_plugin(key.kind, &key.name) {
                key = next;
            }
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Redirect {
        name: &'static str,
        to: &'static str,
    }

    impl PluginMatcher for Redirect {
        fn name(&self) -> &str {
            self.name
        }

        fn capabilities(&self) -> Vec<MatcherCapability> {
            vec![MatcherCapability::MatchUrl, MatcherCapability::MatchPlugin]
        }

        fn match_url(&self, url: &str) -> Option<PluginKey> {
            url.contains(self.name)
                .then(|| PluginKey::new(PluginType::Hoster, self.to))
        }

        fn match_plugin(&self, kind: PluginType, name: &str) -> Option<PluginKey> {
            (name == self.name).then(|| PluginKey::new(kind, self.to))
        }
    }

    struct Empty;

    impl PluginMatcher for Empty {
        fn name(&self) -> &str {
            "empty"
        }

        fn capabilities(&self) -> Vec<MatcherCapability> {
            Vec::new()
        }
    }

    #[test]
    fn test_rejects_matcher_without_capabilities() {
        let mut chain = MatcherChain::new();
        let result = chain.add(Arc::new(Empty), None);
        assert!(matches!(result, Err(Error::MatcherType(_))));
        assert!(chain.is_empty());
    }

    #[test]
    fn test_add_dedupes_and_defaults_to_front() {
        let mut chain = MatcherChain::new();
        let a: Arc<dyn PluginMatcher> = Arc::new(Redirect { name: "a", to: "A" });
        let b: Arc<dyn PluginMatcher> = Arc::new(Redirect { name: "a", to: "B" });

        chain.add(Arc::clone(&a), None).unwrap();
        chain.add(Arc::clone(&b), None).unwrap();
        assert_eq!(chain.len(), 2);
        // b가 앞에 있음
        assert_eq!(chain.match_url("http://a/").unwrap().name, "B");

        // 같은 매처를 다시 추가하면 이동만 함
        chain.add(Arc::clone(&a), Some(0)).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.match_url("http://a/").unwrap().name, "A");

        // 범위 밖 인덱스는 끝에 추가
        chain.add(Arc::clone(&a), Some(99)).unwrap();
        assert_eq!(chain.match_url("http://a/").unwrap().name, "B");

        assert!(chain.remove(&a));
        assert!(!chain.remove(&a));
        assert!(!chain.contains(&a));
    }

    #[test]
    fn test_match_plugin_chains_rewrites() {
        let mut chain = MatcherChain::new();
        chain
            .add(Arc::new(Redirect { name: "X", to: "Y" }), None)
            .unwrap();
        chain
            .add(Arc::new(Redirect { name: "Y", to: "Z" }), Some(1))
            .unwrap();

        let key = chain.match_plugin(PluginType::Hoster, "X");
        assert_eq!(key, PluginKey::new(PluginType::Hoster, "Z"));

        let untouched = chain.match_plugin(PluginType::Crypter, "Other");
        assert_eq!(untouched, PluginKey::new(PluginType::Crypter, "Other"));
    }
}
