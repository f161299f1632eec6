// 该文件是 Hongguo （红果） 项目的一部分。
// src/pipeline.rs - 单帧番茄检测与成熟度分析
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

use image::imageops::crop_imm;
use tracing::debug;

use crate::{
  frame::{Candidate, Frame},
  model::{Classification, Model, RoiPreprocessor, RoiTensor},
  output::AnnotationRenderer,
  vision::{CandidateExtractor, ColorSegmenter, ImageEnhancer},
};

/// 一帧的分析结果
#[derive(Debug, Clone)]
pub struct Analysis {
  /// 增强后并绘制了标注的帧
  pub annotated: Frame,
  /// 按发现顺序排列的分类结果
  pub results: Vec<Classification>,
}

/// 增强 → 分割 → 提取 → 分类 → 标注
#[derive(Clone, Default)]
pub struct AnalysisPipeline {
  enhancer: ImageEnhancer,
  segmenter: ColorSegmenter,
  extractor: CandidateExtractor,
  preprocessor: RoiPreprocessor,
  renderer: AnnotationRenderer,
  single_enhance: bool,
}

impl AnalysisPipeline {
  pub fn new(renderer: AnnotationRenderer) -> Self {
    Self {
      renderer,
      ..Self::default()
    }
  }

  pub fn with_enhancer(mut self, enhancer: ImageEnhancer) -> Self {
    self.enhancer = enhancer;
    self
  }

  pub fn with_segmenter(mut self, segmenter: ColorSegmenter) -> Self {
    self.segmenter = segmenter;
    self
  }

  pub fn with_extractor(mut self, extractor: CandidateExtractor) -> Self {
    self.extractor = extractor;
    self
  }

  pub fn with_preprocessor(mut self, preprocessor: RoiPreprocessor) -> Self {
    self.preprocessor = preprocessor;
    self
  }

  /// 默认在二次增强后的帧上做颜色分割，与现场部署一致；
  /// 设为 `true` 时直接在一次增强的帧上分割
  pub fn with_single_enhance(mut self, single_enhance: bool) -> Self {
    self.single_enhance = single_enhance;
    self
  }

  pub fn enhancer(&self) -> &ImageEnhancer {
    &self.enhancer
  }

  /// 找出候选区域，原帧不变
  pub fn detect(&self, enhanced: &Frame) -> Vec<Candidate> {
    let mask = if self.single_enhance {
      self.segmenter.segment(enhanced)
    } else {
      self.segmenter.segment(&self.enhancer.enhance(enhanced))
    };

    let (width, height) = enhanced.dimensions();
    self
      .extractor
      .extract(&mask)
      .into_iter()
      .map(|bbox| Candidate::new(bbox, width, height))
      .filter(|candidate| !candidate.roi.is_empty())
      .collect()
  }

  pub fn analyze<M>(&self, frame: &Frame, model: &M) -> Result<Analysis, M::Error>
  where
    M: Model<Input = RoiTensor, Output = f32>,
  {
    let enhanced = self.enhancer.enhance(frame);
    let candidates = self.detect(&enhanced);
    debug!("候选区域数量: {}", candidates.len());

    let mut results = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
      let roi = candidate.roi;
      let crop = crop_imm(&enhanced, roi.x, roi.y, roi.width, roi.height).to_image();
      let score = model.infer(&self.preprocessor.prepare(&crop))?;
      let result = Classification::from_score(score, candidate.bbox);
      debug!(
        "候选 {:?} (ROI {:?}): 分数 {:.4} -> {}",
        candidate.bbox,
        roi,
        score,
        result.caption()
      );
      results.push(result);
    }

    let annotated = self.renderer.render(&enhanced, &results);
    Ok(Analysis { annotated, results })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;
  use std::convert::Infallible;

  use image::Rgb;

  use crate::model::Ripeness;
  use crate::output::{RIPE_COLOR, UNRIPE_COLOR};

  struct FixedScore {
    score: f32,
    calls: Cell<usize>,
  }

  impl FixedScore {
    fn new(score: f32) -> Self {
      Self {
        score,
        calls: Cell::new(0),
      }
    }
  }

  impl Model for FixedScore {
    type Input = RoiTensor;
    type Output = f32;
    type Error = Infallible;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
      assert_eq!(input.as_slice().len(), RoiTensor::SHAPE.iter().product::<usize>());
      self.calls.set(self.calls.get() + 1);
      Ok(self.score)
    }
  }

  fn red_disk_frame() -> Frame {
    Frame::from_fn(200, 200, |x, y| {
      let (dx, dy) = (x as f32 - 100.0, y as f32 - 100.0);
      if dx * dx + dy * dy <= 30.0 * 30.0 {
        Rgb([200, 30, 30])
      } else {
        Rgb([128, 128, 128])
      }
    })
  }

  #[test]
  fn grey_frame_returns_enhanced_unmarked_frame() {
    let pipeline = AnalysisPipeline::default();
    let frame = Frame::from_pixel(120, 90, Rgb([128, 128, 128]));
    let model = FixedScore::new(0.9);

    let analysis = pipeline.analyze(&frame, &model).unwrap();
    assert!(analysis.results.is_empty());
    assert_eq!(model.calls.get(), 0);
    assert_eq!(analysis.annotated, pipeline.enhancer().enhance(&frame));
  }

  #[test]
  fn red_disk_is_one_ripe_tomato() {
    let pipeline = AnalysisPipeline::default();
    let frame = red_disk_frame();
    let model = FixedScore::new(0.8);

    let analysis = pipeline.analyze(&frame, &model).unwrap();
    assert_eq!(analysis.results.len(), 1);
    assert_eq!(model.calls.get(), 1);

    let result = analysis.results[0];
    assert_eq!(result.label, Ripeness::Ripe);
    assert!((result.confidence - 0.8).abs() < 1e-6);
    let (cx, cy) = result.position.center();
    assert!((cx - 100.5).abs() <= 3.0 && (cy - 100.5).abs() <= 3.0, "{:?}", result.position);

    let bbox = result.position;
    assert_eq!(analysis.annotated.get_pixel(bbox.x, bbox.y), &RIPE_COLOR);
  }

  #[test]
  fn low_score_draws_unripe_box() {
    let analysis = AnalysisPipeline::default()
      .analyze(&red_disk_frame(), &FixedScore::new(0.2))
      .unwrap();
    let result = analysis.results[0];
    assert_eq!(result.label, Ripeness::Unripe);
    assert_eq!(
      analysis.annotated.get_pixel(result.position.x, result.position.y),
      &UNRIPE_COLOR
    );
  }

  #[test]
  fn analysis_is_deterministic_and_leaves_input_alone() {
    let pipeline = AnalysisPipeline::default();
    let frame = red_disk_frame();
    let original = frame.clone();

    let first = pipeline.analyze(&frame, &FixedScore::new(0.7)).unwrap();
    let second = pipeline.analyze(&frame, &FixedScore::new(0.7)).unwrap();
    assert_eq!(first.annotated, second.annotated);
    assert_eq!(first.results, second.results);
    assert_eq!(frame, original);
  }

  #[test]
  fn single_enhance_still_finds_the_disk() {
    let pipeline = AnalysisPipeline::default().with_single_enhance(true);
    let enhanced = pipeline.enhancer().enhance(&red_disk_frame());
    assert_eq!(pipeline.detect(&enhanced).len(), 1);
  }

  #[test]
  fn model_error_is_propagated() {
    struct Broken;
    impl Model for Broken {
      type Input = RoiTensor;
      type Output = f32;
      type Error = &'static str;
      fn infer(&self, _: &Self::Input) -> Result<Self::Output, Self::Error> {
        Err("boom")
      }
    }

    let result = AnalysisPipeline::default().analyze(&red_disk_frame(), &Broken);
    assert!(matches!(result, Err("boom")));
  }
}
