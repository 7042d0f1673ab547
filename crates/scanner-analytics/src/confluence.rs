//! 다중 타임프레임 confluence 캐시.
//!
//! 최근 타임프레임별 감지 결과를 TTL(90초)과 함께 보관하고 타임프레임
//! 간 합의 점수를 계산합니다. 서로 독립적으로 샘플링된 타임프레임에서
//! 같은 라벨이 겹치는 것은 단일 감지기의 confidence보다 강한 유효성
//! 신호입니다.
//!
//! UI 스레드의 스캔과 워커 스레드의 백그라운드 학습이 동시에 접근할 수
//! 있으므로 내부 맵은 RwLock으로 보호됩니다.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use scanner_core::{clamp01, ConfluenceConfig, Detection};
use tokio::sync::RwLock;
use tracing::trace;

/// 타임프레임 하나의 캐시 엔트리.
///
/// 타임프레임 키당 최대 하나이며 새 `add`에서 덮어써집니다.
#[derive(Debug, Clone)]
struct ConfluenceEntry {
    detections: Vec<Detection>,
    inserted_at: DateTime<Utc>,
}

/// 다중 타임프레임 confluence 캐시.
#[derive(Clone)]
pub struct ConfluenceCache {
    store: Arc<RwLock<HashMap<String, ConfluenceEntry>>>,
    ttl: Duration,
}

impl ConfluenceCache {
    /// 설정으로 캐시 생성.
    pub fn new(config: &ConfluenceConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::seconds(config.ttl_secs),
        }
    }

    /// 기본 TTL(90초)로 캐시 생성.
    pub fn with_defaults() -> Self {
        Self::new(&ConfluenceConfig::default())
    }

    /// 타임프레임의 감지 결과 저장 (기존 엔트리는 덮어씀) 후 만료 정리.
    pub async fn add(&self, timeframe_key: impl Into<String>, detections: Vec<Detection>) {
        self.add_at(timeframe_key, detections, Utc::now()).await
    }

    /// 명시적 시각으로 저장 (테스트/리플레이용).
    pub async fn add_at(
        &self,
        timeframe_key: impl Into<String>,
        detections: Vec<Detection>,
        now: DateTime<Utc>,
    ) {
        let mut store = self.store.write().await;
        store.insert(
            timeframe_key.into(),
            ConfluenceEntry {
                detections,
                inserted_at: now,
            },
        );
        let before = store.len();
        store.retain(|_, entry| now - entry.inserted_at <= self.ttl);
        if store.len() < before {
            trace!(expired = before - store.len(), "Confluence entries expired");
        }
    }

    /// 타임프레임 간 합의 점수 (0.0 ~ 1.0).
    ///
    /// `0.7 · overlap + 0.3 · coverage`를 [0, 1]로 클램프합니다.
    /// - overlap: 캐시된 전체 감지 라벨 중 중복 라벨의 비율
    ///   `(total - unique) / total`
    /// - coverage: `min(타임프레임 수, 3) / 3`
    ///
    /// 한 타임프레임 안에서 같은 라벨이 여러 번 나온 경우도 overlap에
    /// 포함됩니다.
    pub async fn confluence_score(&self) -> f32 {
        self.confluence_score_at(Utc::now()).await
    }

    /// 명시적 시각 기준 합의 점수.
    pub async fn confluence_score_at(&self, now: DateTime<Utc>) -> f32 {
        let store = self.store.read().await;
        let live: Vec<&ConfluenceEntry> = store
            .values()
            .filter(|entry| now - entry.inserted_at <= self.ttl)
            .collect();

        if live.is_empty() {
            return 0.0;
        }

        let all: Vec<&str> = live
            .iter()
            .flat_map(|entry| entry.detections.iter().map(|d| d.name.as_str()))
            .collect();
        if all.is_empty() {
            return 0.0;
        }

        let unique: HashSet<&str> = all.iter().copied().collect();
        let overlap = (all.len() - unique.len()) as f32 / all.len() as f32;
        let coverage = (live.len().min(3)) as f32 / 3.0;

        clamp01(overlap * 0.7 + coverage * 0.3)
    }

    /// 둘 이상의 캐시된 감지에 나타나는 라벨 목록.
    pub async fn agreeing_labels(&self) -> Vec<String> {
        self.agreeing_labels_at(Utc::now()).await
    }

    /// 명시적 시각 기준 합의 라벨.
    pub async fn agreeing_labels_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let store = self.store.read().await;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for entry in store.values() {
            if now - entry.inserted_at > self.ttl {
                continue;
            }
            for det in &entry.detections {
                *counts.entry(det.name.as_str()).or_default() += 1;
            }
        }
        let mut labels: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_string())
            .collect();
        labels.sort();
        labels
    }

    /// 현재 캐시된 타임프레임 수 (만료 제외).
    pub async fn timeframe_count(&self) -> usize {
        let now = Utc::now();
        let store = self.store.read().await;
        store
            .values()
            .filter(|entry| now - entry.inserted_at <= self.ttl)
            .count()
    }
}
