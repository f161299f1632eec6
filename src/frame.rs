// 该文件是 Hongguo （红果） 项目的一部分。
// src/frame.rs - 帧、掩码与区域定义
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

use serde::Serialize;

/// RGB 帧，每通道 8 位
pub type Frame = image::RgbImage;

/// 单通道掩码，255 表示候选颜色，0 表示背景
pub type Mask = image::GrayImage;

/// ROI 每侧扩展比例
const ROI_PADDING_RATIO: f64 = 0.1;

/// 像素坐标下的轴对齐矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

impl BoundingBox {
  pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// 右边界（不含）
  pub fn right(&self) -> u32 {
    self.x + self.width
  }

  /// 下边界（不含）
  pub fn bottom(&self) -> u32 {
    self.y + self.height
  }

  pub fn center(&self) -> (f32, f32) {
    (
      self.x as f32 + self.width as f32 / 2.0,
      self.y as f32 + self.height as f32 / 2.0,
    )
  }

  pub fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
    self.right() <= frame_width && self.bottom() <= frame_height
  }

  /// 每侧扩展 10%，并裁剪到帧范围内
  pub fn extend(&self, frame_width: u32, frame_height: u32) -> BoundingBox {
    let (x, y) = (self.x as f64, self.y as f64);
    let (w, h) = (self.width as f64, self.height as f64);

    let x_ext = ((x - ROI_PADDING_RATIO * w).max(0.0) as u32).min(frame_width);
    let y_ext = ((y - ROI_PADDING_RATIO * h).max(0.0) as u32).min(frame_height);
    let w_ext = (((1.0 + 2.0 * ROI_PADDING_RATIO) * w) as u32).min(frame_width - x_ext);
    let h_ext = (((1.0 + 2.0 * ROI_PADDING_RATIO) * h) as u32).min(frame_height - y_ext);

    BoundingBox::new(x_ext, y_ext, w_ext, h_ext)
  }
}

/// 候选目标：掩码给出的紧框，以及送入分类器的扩展 ROI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
  pub bbox: BoundingBox,
  pub roi: BoundingBox,
}

impl Candidate {
  pub fn new(bbox: BoundingBox, frame_width: u32, frame_height: u32) -> Self {
    Self {
      bbox,
      roi: bbox.extend(frame_width, frame_height),
    }
  }
}
