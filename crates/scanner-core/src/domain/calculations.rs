//! 공용 수치 계산 헬퍼.

/// 값을 [0, 1] 범위로 클램프합니다.
#[inline]
pub fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// 승률의 증분 업데이트.
///
/// 기존 (승률, 표본 수)에 새 결과 하나를 반영한 (새 승률, 새 표본 수)를
/// 반환합니다. 전체 결과 목록을 다시 읽지 않고 프로파일 행만으로 갱신할 수
/// 있도록 정수 승수 기반으로 계산합니다.
pub fn update_win_rate(old_rate: f64, old_count: u32, won: bool) -> (f64, u32) {
    let old_wins = (old_rate * old_count as f64).round() as u32;
    let new_wins = if won { old_wins + 1 } else { old_wins };
    let new_count = old_count + 1;
    (new_wins as f64 / new_count as f64, new_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp01() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(0.5), 0.5);
        assert_eq!(clamp01(1.5), 1.0);
    }

    #[test]
    fn test_update_win_rate_from_empty() {
        let (rate, count) = update_win_rate(0.0, 0, true);
        assert_eq!(rate, 1.0);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_update_win_rate_sequence() {
        // W, W, L → 2/3
        let (rate, count) = update_win_rate(0.0, 0, true);
        let (rate, count) = update_win_rate(rate, count, true);
        let (rate, count) = update_win_rate(rate, count, false);
        assert_eq!(count, 3);
        assert!((rate - 2.0 / 3.0).abs() < 1e-9);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn clamp01_stays_in_unit_interval(x in -10.0f32..10.0) {
                let clamped = clamp01(x);
                prop_assert!((0.0..=1.0).contains(&clamped));
            }

            #[test]
            fn update_win_rate_matches_exact_count(outcomes in proptest::collection::vec(any::<bool>(), 1..200)) {
                let mut rate = 0.0;
                let mut count = 0;
                for &won in &outcomes {
                    let next = update_win_rate(rate, count, won);
                    rate = next.0;
                    count = next.1;
                }
                let wins = outcomes.iter().filter(|&&w| w).count();
                prop_assert_eq!(count as usize, outcomes.len());
                prop_assert!((rate - wins as f64 / outcomes.len() as f64).abs() < 1e-9);
            }
        }
    }
}
