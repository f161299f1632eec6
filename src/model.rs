// 该文件是 Hongguo （红果） 项目的一部分。
// src/model.rs - 成熟度分类模型
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

use std::fmt;

use image::imageops::{FilterType, resize};
use serde::Serialize;

use crate::frame::{BoundingBox, Frame};

/// 分类器输入边长
pub const CLASSIFIER_INPUT_SIZE: u32 = 224;

const RGB_CHANNELS: usize = 3;
const RIPE_THRESHOLD: f32 = 0.5;

/// 推理能力接口，模型加载由各实现的构建器负责
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 送入模型的通道顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
  Rgb,
  /// 现有模型以 BGR 图像训练
  #[default]
  Bgr,
}

/// NHWC 布局的 `1×224×224×3` 浮点张量，取值 `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct RoiTensor {
  data: Box<[f32]>,
}

impl RoiTensor {
  pub const SHAPE: [usize; 4] = [
    1,
    CLASSIFIER_INPUT_SIZE as usize,
    CLASSIFIER_INPUT_SIZE as usize,
    RGB_CHANNELS,
  ];

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn to_vec(&self) -> Vec<f32> {
    self.data.to_vec()
  }
}

/// 将 ROI 裁剪缩放、归一化为模型输入
#[derive(Debug, Clone, Copy, Default)]
pub struct RoiPreprocessor {
  channel_order: ChannelOrder,
}

impl RoiPreprocessor {
  pub fn new(channel_order: ChannelOrder) -> Self {
    Self { channel_order }
  }

  pub fn prepare(&self, crop: &Frame) -> RoiTensor {
    let resized = resize(
      crop,
      CLASSIFIER_INPUT_SIZE,
      CLASSIFIER_INPUT_SIZE,
      FilterType::Triangle,
    );

    let mut data = Vec::with_capacity(RoiTensor::SHAPE.iter().product());
    for pixel in resized.pixels() {
      let [r, g, b] = pixel.0;
      let ordered = match self.channel_order {
        ChannelOrder::Rgb => [r, g, b],
        ChannelOrder::Bgr => [b, g, r],
      };
      data.extend(ordered.iter().map(|&c| c as f32 / 255.0));
    }

    RoiTensor {
      data: data.into_boxed_slice(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ripeness {
  Ripe,
  Unripe,
}

impl Ripeness {
  /// 按分数判定标签，置信度为获胜类别的概率，总是不小于 0.5
  pub fn from_score(score: f32) -> (Self, f32) {
    if score > RIPE_THRESHOLD {
      (Ripeness::Ripe, score)
    } else {
      (Ripeness::Unripe, 1.0 - score)
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Ripeness::Ripe => "ripe",
      Ripeness::Unripe => "unripe",
    }
  }
}

impl fmt::Display for Ripeness {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 单个候选的分类结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
  pub label: Ripeness,
  pub confidence: f32,
  pub position: BoundingBox,
}

impl Classification {
  pub fn from_score(score: f32, position: BoundingBox) -> Self {
    let (label, confidence) = Ripeness::from_score(score);
    Self {
      label,
      confidence,
      position,
    }
  }

  /// 形如 `ripe (87.5%)` 的标注文本
  pub fn caption(&self) -> String {
    format!("{} ({:.1}%)", self.label, self.confidence * 100.0)
  }
}

mod onnx;
pub use self::onnx::{OnnxClassifier, OnnxClassifierBuilder, OnnxClassifierError};
