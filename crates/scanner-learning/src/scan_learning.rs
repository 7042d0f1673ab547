//! 스캔 학습 엔진.
//!
//! 스캔 결과를 세션 단위로 기록하고 패턴 빈도/동시 출현 통계를
//! 누적한다. 거래 결과가 필요 없는 수동 학습 경로다.

use crate::model::{PatternCooccurrence, PatternFrequency, ScanRecord, ScanStatistics};
use crate::store::LearningStore;
use chrono::{Duration, Utc};
use futures::future::join_all;
use scanner_core::{downscale_mean, Detection, FrameBuffer, LearningConfig};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Perceptual 해시 축소 그리드 크기
const HASH_GRID: u32 = 8;

/// 해시 문자열 길이 (hex)
const HASH_LEN: usize = 16;

/// 프레임이 없을 때의 해시 자리표시자
const UNKNOWN_HASH: &str = "unknown";

/// 스캔 이력/빈도/동시 출현 학습기
pub struct ScanLearningEngine {
    store: Arc<dyn LearningStore>,
    config: LearningConfig,
    session_id: RwLock<Uuid>,
}

impl ScanLearningEngine {
    pub fn new(store: Arc<dyn LearningStore>, config: LearningConfig) -> Self {
        Self {
            store,
            config,
            session_id: RwLock::new(Uuid::new_v4()),
        }
    }

    /// 새 스캔 세션을 시작한다.
    pub async fn start_new_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        *self.session_id.write().await = id;
        debug!(session = %id, "New scan session started");
        id
    }

    /// 스캔 한 건을 학습한다.
    ///
    /// 최소 신뢰도 미만 검출은 제외한다. 직전 스캔과 프레임 해시가
    /// 같으면 이력 기록만 건너뛴다 (정적 화면 반복 스캔). 빈도와
    /// 동시 출현 통계는 항상 누적한다.
    pub async fn learn_from_scan(
        &self,
        detections: &[Detection],
        timeframe: &str,
        duration_ms: u64,
        frame: Option<&dyn FrameBuffer>,
    ) {
        let eligible: Vec<&Detection> = detections
            .iter()
            .filter(|d| d.confidence >= self.config.min_confidence_for_learning)
            .collect();

        if eligible.is_empty() {
            trace!(timeframe, "No detections above learning floor");
            return;
        }

        let frame_hash = frame.map(perceptual_hash).unwrap_or_else(|| UNKNOWN_HASH.to_string());

        self.append_history(&eligible, timeframe, duration_ms, &frame_hash)
            .await;
        self.update_frequencies(&eligible).await;
        self.update_cooccurrences(&eligible).await;
    }

    async fn append_history(
        &self,
        eligible: &[&Detection],
        timeframe: &str,
        duration_ms: u64,
        frame_hash: &str,
    ) {
        if frame_hash != UNKNOWN_HASH {
            match self.store.last_frame_hash().await {
                Ok(Some(last)) if last == frame_hash => {
                    debug!(timeframe, hash = frame_hash, "Duplicate frame, history skipped");
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Last hash lookup failed");
                }
            }
        }

        let record = ScanRecord {
            recorded_at: Utc::now(),
            session_id: *self.session_id.read().await,
            patterns: eligible.iter().map(|d| d.name.clone()).collect(),
            confidences: eligible.iter().map(|d| d.confidence).collect(),
            timeframe: timeframe.to_string(),
            duration_ms,
            frame_hash: frame_hash.to_string(),
        };

        if let Err(e) = self.store.append_scan_history(&record).await {
            warn!(error = %e, "Scan history append failed");
        }
    }

    async fn update_frequencies(&self, eligible: &[&Detection]) {
        // 패턴명별 그룹핑. 서로 다른 패턴 행은 독립이라 병렬 갱신한다.
        let mut grouped: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for detection in eligible {
            grouped
                .entry(detection.name.as_str())
                .or_default()
                .push(detection.confidence as f64);
        }

        join_all(grouped.into_iter().map(|(name, confidences)| async move {
            let scan_avg = confidences.iter().sum::<f64>() / confidences.len() as f64;

            let mut frequency = match self.store.get_pattern_frequency(name).await {
                Ok(Some(frequency)) => frequency,
                Ok(None) => PatternFrequency::new(name),
                Err(e) => {
                    warn!(pattern = name, error = %e, "Frequency load failed");
                    return;
                }
            };

            frequency.record_scan(confidences.len() as u64, scan_avg);

            if let Err(e) = self.store.upsert_pattern_frequency(&frequency).await {
                warn!(pattern = name, error = %e, "Frequency save failed");
            }
        }))
        .await;
    }

    async fn update_cooccurrences(&self, eligible: &[&Detection]) {
        let mut names: Vec<&str> = eligible.iter().map(|d| d.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();

        let pairs: Vec<(&str, &str)> = names
            .iter()
            .enumerate()
            .flat_map(|(left_index, a)| names[left_index + 1..].iter().map(move |b| (*a, *b)))
            .collect();

        join_all(pairs.into_iter().map(|(a, b)| async move {
            let mut pair = match self.store.get_cooccurrence(a, b).await {
                Ok(Some(pair)) => pair,
                Ok(None) => PatternCooccurrence::new(a, b),
                Err(e) => {
                    warn!(pattern_a = a, pattern_b = b, error = %e, "Cooccurrence load failed");
                    return;
                }
            };

            pair.record_cooccurrence();

            if let Err(e) = self.store.upsert_cooccurrence(&pair).await {
                warn!(pattern_a = a, pattern_b = b, error = %e, "Cooccurrence save failed");
            }
        }))
        .await;
    }

    /// 누적 검출 수 기준 상위 패턴.
    pub async fn get_most_frequent_patterns(&self, limit: usize) -> Vec<PatternFrequency> {
        let mut frequencies = match self.store.all_pattern_frequencies().await {
            Ok(frequencies) => frequencies,
            Err(e) => {
                warn!(error = %e, "Frequency list load failed");
                return Vec::new();
            }
        };
        frequencies.sort_by(|a, b| b.total_detections.cmp(&a.total_detections));
        frequencies.truncate(limit);
        frequencies
    }

    /// 동시 출현 쌍. pattern이 Some이면 해당 패턴이 포함된 쌍만.
    pub async fn get_pattern_cooccurrences(
        &self,
        pattern: Option<&str>,
    ) -> Vec<PatternCooccurrence> {
        let mut pairs = match self.store.cooccurrences_for(pattern).await {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!(error = %e, "Cooccurrence list load failed");
                return Vec::new();
            }
        };
        pairs.sort_by(|a, b| b.cooccurrence_count.cmp(&a.cooccurrence_count));
        pairs
    }

    /// 관측 이력 기반 스캔 임계값.
    ///
    /// 평균 신뢰도가 높게 유지되는 패턴은 임계값을 올려 노이즈를
    /// 줄이고, 낮은 패턴은 내려서 놓치지 않는다. 누적 검출 10회 미만은
    /// 기본값 0.5.
    pub async fn get_optimized_threshold(&self, pattern_name: &str) -> f32 {
        let frequency = match self.store.get_pattern_frequency(pattern_name).await {
            Ok(Some(frequency)) => frequency,
            Ok(None) => return 0.5,
            Err(e) => {
                warn!(pattern = pattern_name, error = %e, "Frequency load failed, default threshold");
                return 0.5;
            }
        };

        if frequency.total_detections < 10 {
            return 0.5;
        }
        if frequency.avg_confidence >= 0.8 {
            0.6
        } else if frequency.avg_confidence >= 0.6 {
            0.5
        } else {
            0.4
        }
    }

    /// 주간/월간 스캔 수와 패턴 다양성 요약.
    pub async fn scan_stats(&self) -> ScanStatistics {
        let now = Utc::now();
        let week = self
            .store
            .count_scans_since(now - Duration::days(7))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Weekly count failed");
                0
            });
        let month = self
            .store
            .count_scans_since(now - Duration::days(30))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Monthly count failed");
                0
            });

        let frequencies = self.store.all_pattern_frequencies().await.unwrap_or_else(|e| {
            warn!(error = %e, "Frequency list load failed");
            Vec::new()
        });
        let most_common = frequencies
            .iter()
            .max_by_key(|f| f.total_detections)
            .map(|f| f.pattern_name.clone());

        ScanStatistics {
            total_scans_week: week,
            total_scans_month: month,
            unique_patterns: frequencies.len() as u64,
            most_common_pattern: most_common,
        }
    }

    /// 보존 기간이 지난 스캔 이력을 정리한다.
    pub async fn purge_old_history(&self) -> u64 {
        let cutoff = Utc::now() - Duration::days(self.config.scan_history_retention_days);
        match self.store.purge_scan_history_before(cutoff).await {
            Ok(purged) => {
                if purged > 0 {
                    debug!(purged, "Old scan history purged");
                }
                purged
            }
            Err(e) => {
                warn!(error = %e, "History purge failed");
                0
            }
        }
    }
}

/// 프레임 perceptual 해시.
///
/// 8x8 평균 축소 후 SHA-256의 앞 16 hex 문자를 쓴다. 중복/정적
/// 스캔 판별 전용이며 학습 여부를 좌우하지 않는다.
pub fn perceptual_hash(frame: &dyn FrameBuffer) -> String {
    let reduced = downscale_mean(frame, HASH_GRID, HASH_GRID);
    let digest = Sha256::digest(&reduced);
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_LEN);
    hash
}
