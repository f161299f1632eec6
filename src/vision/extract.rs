// 该文件是 Hongguo （红果） 项目的一部分。
// src/vision/extract.rs - 候选区域提取
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

use std::f64::consts::PI;

use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::geometry::{arc_length, contour_area};
use imageproc::point::Point;
use tracing::debug;

use crate::frame::{BoundingBox, Mask};

const DEFAULT_MIN_AREA: f64 = 500.0;
const DEFAULT_MIN_CIRCULARITY: f64 = 0.5;

/// 圆度：`4π·面积/周长²`，理想圆为 1
pub fn circularity(area: f64, perimeter: f64) -> f64 {
  4.0 * PI * area / (perimeter * perimeter)
}

fn bounding_rect(points: &[Point<i32>]) -> Option<BoundingBox> {
  let min_x = points.iter().map(|p| p.x).min()?;
  let max_x = points.iter().map(|p| p.x).max()?;
  let min_y = points.iter().map(|p| p.y).min()?;
  let max_y = points.iter().map(|p| p.y).max()?;

  Some(BoundingBox::new(
    min_x as u32,
    min_y as u32,
    (max_x - min_x + 1) as u32,
    (max_y - min_y + 1) as u32,
  ))
}

/// 候选区域提取器
///
/// 只考虑最外层轮廓，按面积与圆度过滤。结果顺序为轮廓被发现的顺序，
/// 即逐行扫描时各区域最先遇到的边界像素的顺序。
#[derive(Debug, Clone)]
pub struct CandidateExtractor {
  min_area: f64,
  min_circularity: f64,
}

impl Default for CandidateExtractor {
  fn default() -> Self {
    Self::new(DEFAULT_MIN_AREA, DEFAULT_MIN_CIRCULARITY)
  }
}

impl CandidateExtractor {
  pub fn new(min_area: f64, min_circularity: f64) -> Self {
    Self {
      min_area,
      min_circularity,
    }
  }

  fn accept(&self, contour: &Contour<i32>) -> bool {
    let area = contour_area(&contour.points);
    if area <= self.min_area {
      return false;
    }

    let perimeter = arc_length(&contour.points, true);
    if perimeter <= 0.0 {
      return false;
    }

    let roundness = circularity(area, perimeter);
    debug!(
      "轮廓: 面积 {:.1}, 周长 {:.1}, 圆度 {:.3}",
      area, perimeter, roundness
    );
    roundness > self.min_circularity
  }

  pub fn extract(&self, mask: &Mask) -> Vec<BoundingBox> {
    find_contours::<i32>(mask)
      .iter()
      .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
      .filter(|contour| self.accept(contour))
      .filter_map(|contour| bounding_rect(&contour.points))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Luma;

  fn mask_with(draw: impl Fn(i32, i32) -> bool) -> Mask {
    Mask::from_fn(200, 160, |x, y| {
      if draw(x as i32, y as i32) {
        Luma([255])
      } else {
        Luma([0])
      }
    })
  }

  fn disk(cx: i32, cy: i32, r: i32) -> impl Fn(i32, i32) -> bool {
    move |x, y| (x - cx) * (x - cx) + (y - cy) * (y - cy) <= r * r
  }

  #[test]
  fn empty_mask_yields_nothing() {
    let mask = mask_with(|_, _| false);
    assert!(CandidateExtractor::default().extract(&mask).is_empty());
  }

  #[test]
  fn single_disk_is_centered() {
    let mask = mask_with(disk(90, 70, 25));
    let boxes = CandidateExtractor::default().extract(&mask);
    assert_eq!(boxes.len(), 1);

    let (cx, cy) = boxes[0].center();
    assert!((cx - 90.5).abs() <= 1.0, "center x {cx}");
    assert!((cy - 70.5).abs() <= 1.0, "center y {cy}");
    assert_eq!(boxes[0].width, 51);
    assert_eq!(boxes[0].height, 51);
  }

  #[test]
  fn small_regions_are_dropped() {
    // 面积约 π·10² ≈ 314
    let mask = mask_with(disk(50, 50, 10));
    assert!(CandidateExtractor::default().extract(&mask).is_empty());
  }

  #[test]
  fn elongated_regions_are_dropped() {
    // 180x6 的长条，面积足够但圆度很低
    let mask = mask_with(|x, y| (10..190).contains(&x) && (70..76).contains(&y));
    assert!(CandidateExtractor::default().extract(&mask).is_empty());
  }

  #[test]
  fn inner_regions_are_ignored() {
    // 环内再放一个圆盘，只保留外轮廓
    let outer = disk(100, 80, 60);
    let hole = disk(100, 80, 45);
    let inner = disk(100, 80, 30);
    let mask = mask_with(|x, y| (outer(x, y) && !hole(x, y)) || inner(x, y));
    let boxes = CandidateExtractor::default().extract(&mask);
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].width, 121);
  }

  #[test]
  fn discovery_order_is_stable() {
    let left = disk(40, 100, 20);
    let right = disk(150, 40, 20);
    let mask = mask_with(|x, y| left(x, y) || right(x, y));
    let extractor = CandidateExtractor::default();
    let first = extractor.extract(&mask);
    let second = extractor.extract(&mask);
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    // 右上角的圆盘在扫描中先出现
    assert!(first[0].y < first[1].y);
  }

  #[test]
  fn circularity_of_ideal_circle_is_one() {
    let r = 10.0;
    let value = circularity(PI * r * r, 2.0 * PI * r);
    assert!((value - 1.0).abs() < 1e-9);
  }
}
