//! Match History - 최근 매치된 플러그인 (MRU)

use super::types::{PluginKey, MATCH_HISTORY};

/// 최근 사용 순서의 플러그인 목록
///
/// 중복 없이 최대 `capacity`개를 유지합니다. 맨 앞이 가장 최근입니다.
#[derive(Debug, Clone)]
pub struct MatchHistory {
    entries: Vec<PluginKey>,
    capacity: usize,
}

impl Default for MatchHistory {
    fn default() -> Self {
        Self::new(MATCH_HISTORY)
    }
}

impl MatchHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn entries(&self) -> &[PluginKey] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 기존 항목을 맨 앞으로 이동. 없으면 false
    pub fn promote(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        if index > 0 {
            let key = self.entries.remove(index);
            self.entries.insert(0, key);
        }
        true
    }

    /// 맨 앞에 삽입하고 용량 초과분 제거
    pub fn insert(&mut self, key: PluginKey) {
        if self.capacity == 0 {
            return;
        }
        self.entries.retain(|k| k != &key);
        self.entries.insert(0, key);
        self.entries.truncate(self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginType;

    fn key(name: &str) -> PluginKey {
        PluginKey::new(PluginType::Hoster, name)
    }

    #[test]
    fn test_insert_truncates() {
        let mut history = MatchHistory::new(3);
        for name in ["a", "b", "c", "d"] {
            history.insert(key(name));
        }
        assert_eq!(history.entries(), &[key("d"), key("c"), key("b")]);
    }

    #[test]
    fn test_insert_has_no_duplicates() {
        let mut history = MatchHistory::default();
        history.insert(key("a"));
        history.insert(key("b"));
        history.insert(key("a"));
        assert_eq!(history.entries(), &[key("a"), key("b")]);
        assert_eq!(history.capacity(), MATCH_HISTORY);
    }

    #[test]
    fn test_promote() {
        let mut history = MatchHistory::default();
        history.insert(key("a"));
        history.insert(key("b"));
        history.insert(key("c"));

        assert!(history.promote(2));
        assert_eq!(history.entries(), &[key("a"), key("c"), key("b")]);
        assert!(history.promote(0));
        assert!(!history.promote(5));
    }
}
