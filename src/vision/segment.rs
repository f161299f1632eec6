// 该文件是 Hongguo （红果） 项目的一部分。
// src/vision/segment.rs - 红色区域分割
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::Luma;
use imageproc::distance_transform::Norm;
use imageproc::filter::median_filter;
use imageproc::morphology::{close, open};
use tracing::debug;

use crate::frame::{Frame, Mask};
use crate::vision::color::rgb_to_hsv;

const MASK_ON: u8 = 255;
const MASK_OFF: u8 = 0;

// 5x5 方形结构元素与 5x5 中值滤波
const MORPHOLOGY_RADIUS: u8 = 2;
const MEDIAN_RADIUS: u32 = 2;

/// HSV 闭区间，色相 `[0, 180]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
  pub lower: [u8; 3],
  pub upper: [u8; 3],
}

impl HsvRange {
  pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
    Self { lower, upper }
  }

  pub fn contains(&self, hsv: [u8; 3]) -> bool {
    hsv
      .iter()
      .zip(self.lower.iter().zip(self.upper.iter()))
      .all(|(value, (lower, upper))| lower <= value && value <= upper)
  }
}

/// 默认的红色波段：0° 附近、180° 附近，以及偏暗的红色
pub const RED_BANDS: [HsvRange; 3] = [
  HsvRange::new([0, 50, 50], [15, 255, 255]),
  HsvRange::new([160, 50, 50], [180, 255, 255]),
  HsvRange::new([0, 50, 20], [15, 255, 200]),
];

#[derive(Debug, Clone)]
pub struct ColorSegmenter {
  bands: Vec<HsvRange>,
  morphology_radius: u8,
  median_radius: u32,
}

impl Default for ColorSegmenter {
  fn default() -> Self {
    Self::new(RED_BANDS.to_vec())
  }
}

impl ColorSegmenter {
  pub fn new(bands: Vec<HsvRange>) -> Self {
    Self {
      bands,
      morphology_radius: MORPHOLOGY_RADIUS,
      median_radius: MEDIAN_RADIUS,
    }
  }

  pub fn bands(&self) -> &[HsvRange] {
    &self.bands
  }

  /// 仅做阈值，不做形态学清理
  pub fn threshold(&self, frame: &Frame) -> Mask {
    let (width, height) = frame.dimensions();
    Mask::from_fn(width, height, |x, y| {
      let hsv = rgb_to_hsv(frame.get_pixel(x, y));
      // 多个波段的并集，等价于饱和加法
      if self.bands.iter().any(|band| band.contains(hsv)) {
        Luma([MASK_ON])
      } else {
        Luma([MASK_OFF])
      }
    })
  }

  /// 阈值后做开运算、闭运算与中值滤波
  pub fn segment(&self, frame: &Frame) -> Mask {
    let mask = self.threshold(frame);
    let mask = open(&mask, Norm::LInf, self.morphology_radius);
    let mask = close(&mask, Norm::LInf, self.morphology_radius);
    let mask = median_filter(&mask, self.median_radius, self.median_radius);
    debug!(
      "分割掩码前景像素: {}",
      mask.pixels().filter(|p| p[0] == MASK_ON).count()
    );
    mask
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn disk_frame(center: (i32, i32), radius: i32, color: [u8; 3]) -> Frame {
    Frame::from_fn(120, 100, |x, y| {
      let (dx, dy) = (x as i32 - center.0, y as i32 - center.1);
      if dx * dx + dy * dy <= radius * radius {
        Rgb(color)
      } else {
        Rgb([128, 128, 128])
      }
    })
  }

  #[test]
  fn band_contains_is_inclusive() {
    let band = RED_BANDS[0];
    assert!(band.contains([0, 50, 50]));
    assert!(band.contains([15, 255, 255]));
    assert!(!band.contains([16, 255, 255]));
    assert!(!band.contains([10, 49, 255]));
  }

  #[test]
  fn dark_red_band_reaches_lower_values() {
    let hsv = [5, 200, 30];
    assert!(!RED_BANDS[0].contains(hsv));
    assert!(RED_BANDS[2].contains(hsv));
  }

  #[test]
  fn gray_frame_gives_empty_mask() {
    let frame = Frame::from_pixel(64, 64, Rgb([128, 128, 128]));
    let mask = ColorSegmenter::default().segment(&frame);
    assert!(mask.pixels().all(|p| p[0] == MASK_OFF));
  }

  #[test]
  fn both_ends_of_hue_circle_are_red() {
    let segmenter = ColorSegmenter::default();
    let orange_red = Frame::from_pixel(4, 4, Rgb([220, 40, 20]));
    let crimson = Frame::from_pixel(4, 4, Rgb([220, 20, 60]));
    let green = Frame::from_pixel(4, 4, Rgb([20, 200, 40]));
    assert!(segmenter.threshold(&orange_red).pixels().all(|p| p[0] == MASK_ON));
    assert!(segmenter.threshold(&crimson).pixels().all(|p| p[0] == MASK_ON));
    assert!(segmenter.threshold(&green).pixels().all(|p| p[0] == MASK_OFF));
  }

  #[test]
  fn speckle_is_removed() {
    let mut frame = Frame::from_pixel(64, 64, Rgb([128, 128, 128]));
    frame.put_pixel(10, 10, Rgb([255, 0, 0]));
    frame.put_pixel(40, 22, Rgb([255, 0, 0]));
    let mask = ColorSegmenter::default().segment(&frame);
    assert!(mask.pixels().all(|p| p[0] == MASK_OFF));
  }

  #[test]
  fn disk_survives_cleanup() {
    let frame = disk_frame((60, 50), 20, [200, 30, 30]);
    let mask = ColorSegmenter::default().segment(&frame);
    assert_eq!(mask.get_pixel(60, 50)[0], MASK_ON);
    assert_eq!(mask.get_pixel(60, 35)[0], MASK_ON);
    assert_eq!(mask.get_pixel(5, 5)[0], MASK_OFF);
  }
}
