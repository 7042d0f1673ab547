//! ONNX 기반 ML 패턴 감지 어댑터.
//!
//! YOLO 계열 단일 스테이지 감지 모델을 ONNX Runtime으로 실행합니다.
//! 모델은 별도로 학습되어 ONNX 형식으로 내보내야 하며 다음을 가정합니다:
//! - 입력: [1, 3, input_size, input_size] float32 텐서 (0~1 정규화)
//! - 출력: [1, 4 + num_classes, num_anchors] float32 텐서
//!   (cx, cy, w, h + 클래스 점수)
//!
//! 어댑터는 내부에서 클래스별 confidence 임계값과 NMS를 적용하고
//! 출력을 최대 감지 수로 제한합니다.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ort::session::Session;
use scanner_core::{BoundingBox, Detection, DetectionMethod, FrameBuffer};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backend::{DetectorBackend, DisabledBackend};
use crate::error::{DetectError, DetectResult};
use crate::nms::non_max_suppression;

/// ONNX 감지 어댑터 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnnxDetectorConfig {
    /// ONNX 모델 파일 경로
    pub model_path: PathBuf,
    /// 모델 입력 한 변 크기 (정사각형)
    pub input_size: u32,
    /// 클래스별 confidence 임계값
    pub confidence_threshold: f32,
    /// NMS IoU 임계값
    pub iou_threshold: f32,
    /// 최대 감지 수
    pub max_detections: usize,
    /// 클래스 인덱스 순서의 패턴 라벨
    pub labels: Vec<String>,
    /// 로깅/식별을 위한 모델 이름
    pub model_name: String,
}

impl Default for OnnxDetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/chart-pattern-detector.onnx"),
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 100,
            labels: vec![
                "Head and Shoulders Bottom".to_string(),
                "Head and Shoulders Top".to_string(),
                "M_Head".to_string(),
                "StockLine".to_string(),
                "Triangle".to_string(),
                "W_Bottom".to_string(),
            ],
            model_name: "chart_pattern_detector".to_string(),
        }
    }
}

impl OnnxDetectorConfig {
    /// 주어진 모델 경로로 새 설정 생성.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Default::default()
        }
    }

    /// 라벨 목록 설정.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// confidence 임계값 설정.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }
}

/// ONNX 기반 패턴 감지 어댑터.
pub struct OnnxPatternBackend {
    session: Mutex<Session>,
    config: OnnxDetectorConfig,
}

impl OnnxPatternBackend {
    /// 지정된 경로에서 ONNX 모델 로드.
    pub fn load(config: OnnxDetectorConfig) -> DetectResult<Self> {
        let path = &config.model_path;

        if !path.exists() {
            return Err(DetectError::ModelLoad(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        info!("Loading ONNX model from: {}", path.display());

        let session = Session::builder()
            .map_err(|e| DetectError::ModelLoad(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| DetectError::ModelLoad(format!("Failed to set optimization level: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| DetectError::ModelLoad(format!("Failed to load model: {}", e)))?;

        info!("ONNX model loaded successfully: {}", config.model_name);

        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    /// 기본 설정으로 파일 경로에서 모델 로드.
    pub fn from_file(path: impl AsRef<Path>) -> DetectResult<Self> {
        Self::load(OnnxDetectorConfig::new(path.as_ref()))
    }

    /// 모델 로드를 시도하고, 실패 시 영구적으로 빈 어댑터로 degrade.
    ///
    /// 모델 누락은 로드 시점에 감지되며 템플릿 감지에는 영향을 주지
    /// 않습니다.
    pub fn load_or_disabled(config: OnnxDetectorConfig) -> std::sync::Arc<dyn DetectorBackend> {
        match Self::load(config) {
            Ok(backend) => std::sync::Arc::new(backend),
            Err(e) => {
                warn!("ML adapter unavailable, degrading to empty results: {}", e);
                std::sync::Arc::new(DisabledBackend::new("onnx_disabled", DetectionMethod::Ml))
            }
        }
    }

    /// 어댑터 설정 반환.
    pub fn config(&self) -> &OnnxDetectorConfig {
        &self.config
    }

    /// 프레임을 [1, 3, S, S] 입력 텐서 데이터로 변환.
    ///
    /// 휘도 채널을 3채널로 복제하고 nearest-neighbor로 리사이즈합니다.
    fn preprocess(&self, frame: &dyn FrameBuffer) -> Vec<f32> {
        let size = self.config.input_size;
        let plane = (size as usize) * (size as usize);
        let mut data = vec![0.0f32; 3 * plane];

        let fw = frame.width().max(1);
        let fh = frame.height().max(1);
        for y in 0..size {
            let src_y = y * fh / size;
            for x in 0..size {
                let src_x = x * fw / size;
                let luma = frame.luma_at(src_x, src_y) as f32 / 255.0;
                let idx = (y as usize) * (size as usize) + (x as usize);
                data[idx] = luma;
                data[plane + idx] = luma;
                data[2 * plane + idx] = luma;
            }
        }
        data
    }

    /// 모델 출력을 감지 목록으로 디코드.
    ///
    /// 박스 좌표는 모델 입력 좌표계에서 프레임 좌표계로 환산합니다.
    fn decode(
        &self,
        output: &[f32],
        rows: usize,
        anchors: usize,
        frame_width: u32,
        frame_height: u32,
    ) -> Vec<Detection> {
        let num_classes = rows.saturating_sub(4).min(self.config.labels.len());
        let scale_x = frame_width as f32 / self.config.input_size as f32;
        let scale_y = frame_height as f32 / self.config.input_size as f32;

        let mut detections = Vec::new();
        for a in 0..anchors {
            let mut best_class = 0usize;
            let mut best_score = 0.0f32;
            for c in 0..num_classes {
                let score = output[(4 + c) * anchors + a];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }
            if best_score < self.config.confidence_threshold {
                continue;
            }

            let cx = output[a];
            let cy = output[anchors + a];
            let w = output[2 * anchors + a];
            let h = output[3 * anchors + a];

            let bbox = BoundingBox::new(
                (cx - w / 2.0) * scale_x,
                (cy - h / 2.0) * scale_y,
                w * scale_x,
                h * scale_y,
            );
            detections.push(
                Detection::new(
                    self.config.labels[best_class].clone(),
                    best_score,
                    DetectionMethod::Ml,
                )
                .with_bounding_box(bbox),
            );
        }
        detections
    }
}

#[async_trait]
impl DetectorBackend for OnnxPatternBackend {
    fn name(&self) -> &str {
        &self.config.model_name
    }

    fn method(&self) -> DetectionMethod {
        DetectionMethod::Ml
    }

    async fn detect(&self, frame: &dyn FrameBuffer) -> DetectResult<Vec<Detection>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(DetectError::InvalidInput("empty frame".to_string()));
        }

        let input_data = self.preprocess(frame);
        let size = self.config.input_size as i64;
        let input_shape = [1i64, 3, size, size];

        let input_tensor =
            ort::value::Tensor::from_array((input_shape, input_data.into_boxed_slice()))
                .map_err(|e| DetectError::Inference(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self.session.lock().await;
        let outputs = session
            .run(ort::inputs!["images" => input_tensor])
            .map_err(|e| DetectError::Inference(format!("Inference failed: {}", e)))?;

        let output_name = outputs
            .iter()
            .next()
            .map(|(name, _)| name.to_string())
            .ok_or_else(|| DetectError::Inference("No output tensor found".to_string()))?;

        let output = outputs
            .get(&output_name)
            .ok_or_else(|| DetectError::Inference("Failed to get output by name".to_string()))?;

        let (shape, output_slice) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::Inference(format!("Failed to extract output tensor: {}", e)))?;

        let dims: Vec<usize> = shape.iter().map(|d| *d as usize).collect();
        if dims.len() != 3 || dims[1] < 5 {
            return Err(DetectError::Inference(format!(
                "Unexpected output shape: {:?}",
                dims
            )));
        }
        let rows = dims[1];
        let anchors = dims[2];

        let raw = self.decode(output_slice, rows, anchors, frame.width(), frame.height());
        drop(outputs);

        let kept = non_max_suppression(
            raw,
            self.config.iou_threshold,
            self.config.max_detections,
        );
        debug!(
            model = %self.config.model_name,
            detections = kept.len(),
            "ONNX detection complete"
        );
        Ok(kept)
    }
}
