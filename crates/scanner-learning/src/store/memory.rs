//! 인메모리 학습 저장소.
//!
//! 영속성이 필요 없는 단위 테스트와 임베디드 실행용.

use crate::error::LearningResult;
use crate::model::{
    normalize_pair, ConfidenceProfile, PatternCooccurrence, PatternFrequency, ScanRecord,
    SuppressionRule,
};
use crate::store::LearningStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    profiles: HashMap<String, ConfidenceProfile>,
    rules: HashMap<String, SuppressionRule>,
    frequencies: HashMap<String, PatternFrequency>,
    cooccurrences: HashMap<(String, String), PatternCooccurrence>,
    scan_history: Vec<ScanRecord>,
}

/// RwLock 기반 인메모리 구현
#[derive(Default)]
pub struct MemoryLearningStore {
    state: RwLock<MemoryState>,
}

impl MemoryLearningStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LearningStore for MemoryLearningStore {
    async fn get_confidence_profile(
        &self,
        pattern_type: &str,
    ) -> LearningResult<Option<ConfidenceProfile>> {
        Ok(self.state.read().await.profiles.get(pattern_type).cloned())
    }

    async fn upsert_confidence_profile(&self, profile: &ConfidenceProfile) -> LearningResult<()> {
        self.state
            .write()
            .await
            .profiles
            .insert(profile.pattern_type.clone(), profile.clone());
        Ok(())
    }

    async fn get_suppression_rule(
        &self,
        pattern_type: &str,
    ) -> LearningResult<Option<SuppressionRule>> {
        Ok(self.state.read().await.rules.get(pattern_type).cloned())
    }

    async fn upsert_suppression_rule(&self, rule: &SuppressionRule) -> LearningResult<()> {
        self.state
            .write()
            .await
            .rules
            .insert(rule.pattern_type.clone(), rule.clone());
        Ok(())
    }

    async fn get_pattern_frequency(
        &self,
        pattern_name: &str,
    ) -> LearningResult<Option<PatternFrequency>> {
        Ok(self
            .state
            .read()
            .await
            .frequencies
            .get(pattern_name)
            .cloned())
    }

    async fn upsert_pattern_frequency(&self, frequency: &PatternFrequency) -> LearningResult<()> {
        self.state
            .write()
            .await
            .frequencies
            .insert(frequency.pattern_name.clone(), frequency.clone());
        Ok(())
    }

    async fn all_pattern_frequencies(&self) -> LearningResult<Vec<PatternFrequency>> {
        Ok(self
            .state
            .read()
            .await
            .frequencies
            .values()
            .cloned()
            .collect())
    }

    async fn get_cooccurrence(
        &self,
        pattern_a: &str,
        pattern_b: &str,
    ) -> LearningResult<Option<PatternCooccurrence>> {
        let key = normalize_pair(pattern_a, pattern_b);
        Ok(self.state.read().await.cooccurrences.get(&key).cloned())
    }

    async fn upsert_cooccurrence(&self, pair: &PatternCooccurrence) -> LearningResult<()> {
        let key = (pair.pattern_a.clone(), pair.pattern_b.clone());
        self.state
            .write()
            .await
            .cooccurrences
            .insert(key, pair.clone());
        Ok(())
    }

    async fn cooccurrences_for(
        &self,
        pattern: Option<&str>,
    ) -> LearningResult<Vec<PatternCooccurrence>> {
        let state = self.state.read().await;
        Ok(state
            .cooccurrences
            .values()
            .filter(|pair| match pattern {
                Some(name) => pair.pattern_a == name || pair.pattern_b == name,
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn append_scan_history(&self, record: &ScanRecord) -> LearningResult<()> {
        self.state.write().await.scan_history.push(record.clone());
        Ok(())
    }

    async fn count_scans_since(&self, since: DateTime<Utc>) -> LearningResult<u64> {
        Ok(self
            .state
            .read()
            .await
            .scan_history
            .iter()
            .filter(|record| record.recorded_at >= since)
            .count() as u64)
    }

    async fn last_frame_hash(&self) -> LearningResult<Option<String>> {
        Ok(self
            .state
            .read()
            .await
            .scan_history
            .last()
            .map(|record| record.frame_hash.clone()))
    }

    async fn purge_scan_history_before(&self, cutoff: DateTime<Utc>) -> LearningResult<u64> {
        let mut state = self.state.write().await;
        let before = state.scan_history.len();
        state.scan_history.retain(|record| record.recorded_at >= cutoff);
        Ok((before - state.scan_history.len()) as u64)
    }
}
