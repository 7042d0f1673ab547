//! 프레임 버퍼 capability 추상화.
//!
//! 플랫폼 비트맵 타입 대신 최소한의 픽셀 접근 인터페이스만 노출합니다.
//! 분류기와 감지 어댑터는 이 trait에만 의존합니다.

/// 읽기 전용 프레임 버퍼 capability.
///
/// 코어는 분류와 감지가 끝나면 프레임 참조를 유지하지 않습니다.
pub trait FrameBuffer: Send + Sync {
    /// 프레임 너비 (픽셀)
    fn width(&self) -> u32;

    /// 프레임 높이 (픽셀)
    fn height(&self) -> u32;

    /// (x, y) 위치의 휘도 값 (0 ~ 255). 범위 밖이면 0.
    fn luma_at(&self, x: u32, y: u32) -> u8;
}

/// 소유된 그레이스케일 프레임.
///
/// 테스트와 perceptual hash 계산에서 사용하는 기본 구현입니다.
#[derive(Debug, Clone)]
pub struct GrayFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl GrayFrame {
    /// row-major 휘도 버퍼에서 프레임 생성.
    ///
    /// 버퍼 길이가 `width * height`와 다르면 `None`을 반환합니다.
    pub fn from_luma(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// 단색으로 채워진 프레임 생성.
    pub fn filled(width: u32, height: u32, luma: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![luma; (width as usize) * (height as usize)],
        }
    }
}

impl FrameBuffer for GrayFrame {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn luma_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.pixels[(y as usize) * (self.width as usize) + (x as usize)]
    }
}

/// 프레임을 `cols x rows` 격자로 나눠 각 셀의 평균 휘도를 계산합니다.
///
/// 스캔 중복 감지용 perceptual hash의 전처리 단계입니다.
pub fn downscale_mean(frame: &dyn FrameBuffer, cols: u32, rows: u32) -> Vec<u8> {
    let width = frame.width();
    let height = frame.height();
    if width == 0 || height == 0 || cols == 0 || rows == 0 {
        return vec![0; (cols as usize) * (rows as usize)];
    }

    let mut cells = Vec::with_capacity((cols as usize) * (rows as usize));
    for row in 0..rows {
        for col in 0..cols {
            let x0 = col * width / cols;
            let x1 = ((col + 1) * width / cols).max(x0 + 1).min(width);
            let y0 = row * height / rows;
            let y1 = ((row + 1) * height / rows).max(y0 + 1).min(height);

            let mut sum: u64 = 0;
            let mut count: u64 = 0;
            for y in y0..y1 {
                for x in x0..x1 {
                    sum += frame.luma_at(x, y) as u64;
                    count += 1;
                }
            }
            cells.push(if count == 0 { 0 } else { (sum / count) as u8 });
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_luma_length_check() {
        assert!(GrayFrame::from_luma(2, 2, vec![0; 4]).is_some());
        assert!(GrayFrame::from_luma(2, 2, vec![0; 3]).is_none());
    }

    #[test]
    fn test_luma_at_bounds() {
        let frame = GrayFrame::filled(4, 4, 200);
        assert_eq!(frame.luma_at(3, 3), 200);
        assert_eq!(frame.luma_at(4, 0), 0);
        assert_eq!(frame.luma_at(0, 10), 0);
    }

    #[test]
    fn test_downscale_mean_uniform() {
        let frame = GrayFrame::filled(32, 32, 128);
        let cells = downscale_mean(&frame, 8, 8);
        assert_eq!(cells.len(), 64);
        assert!(cells.iter().all(|&c| c == 128));
    }

    #[test]
    fn test_downscale_mean_smaller_than_grid() {
        // 8x8 격자보다 작은 프레임도 패닉 없이 처리되어야 함
        let frame = GrayFrame::filled(3, 3, 50);
        let cells = downscale_mean(&frame, 8, 8);
        assert_eq!(cells.len(), 64);
    }
}
