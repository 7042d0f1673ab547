//! Non-Max Suppression.
//!
//! ML 어댑터의 디코드 경로에서 같은 패턴 클래스의 겹치는 박스를
//! 제거합니다. 박스가 없는 감지는 겹침을 판정할 수 없으므로 유지합니다.

use scanner_core::Detection;

/// 클래스별 greedy NMS.
///
/// confidence 내림차순으로 정렬한 뒤, 이미 선택된 같은 이름의 감지와
/// IoU가 `iou_threshold`를 넘는 감지를 제거합니다. 결과는 최대
/// `max_detections`개로 제한됩니다.
pub fn non_max_suppression(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in detections {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            if k.name != candidate.name {
                return false;
            }
            match (&k.bounding_box, &candidate.bounding_box) {
                (Some(a), Some(b)) => a.iou(b) > iou_threshold,
                _ => false,
            }
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanner_core::{BoundingBox, DetectionMethod};

    fn det(name: &str, conf: f32, bbox: BoundingBox) -> Detection {
        Detection::new(name, conf, DetectionMethod::Ml).with_bounding_box(bbox)
    }

    #[test]
    fn test_overlapping_same_class_suppressed() {
        let dets = vec![
            det("Triangle", 0.9, BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            det("Triangle", 0.7, BoundingBox::new(1.0, 1.0, 10.0, 10.0)),
        ];
        let kept = non_max_suppression(dets, 0.45, 100);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_different_class_not_suppressed() {
        let dets = vec![
            det("Triangle", 0.9, BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            det("W_Bottom", 0.7, BoundingBox::new(1.0, 1.0, 10.0, 10.0)),
        ];
        let kept = non_max_suppression(dets, 0.45, 100);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_disjoint_same_class_kept() {
        let dets = vec![
            det("Triangle", 0.9, BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            det("Triangle", 0.7, BoundingBox::new(50.0, 50.0, 10.0, 10.0)),
        ];
        let kept = non_max_suppression(dets, 0.45, 100);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_max_detections_cap() {
        let dets: Vec<Detection> = (0..150)
            .map(|i| {
                det(
                    "Triangle",
                    0.5,
                    BoundingBox::new(i as f32 * 20.0, 0.0, 10.0, 10.0),
                )
            })
            .collect();
        let kept = non_max_suppression(dets, 0.45, 100);
        assert_eq!(kept.len(), 100);
    }

    #[test]
    fn test_boxless_detection_kept() {
        let dets = vec![
            det("Triangle", 0.9, BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            Detection::new("Triangle", 0.8, DetectionMethod::Ml),
        ];
        let kept = non_max_suppression(dets, 0.45, 100);
        assert_eq!(kept.len(), 2);
    }
}
