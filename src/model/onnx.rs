// 该文件是 Hongguo （红果） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 成熟度分类器
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

use std::sync::Mutex;

use ort::{inputs, session::Session, value::Tensor};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Model, RoiTensor},
};

#[derive(Error, Debug)]
pub enum OnnxClassifierError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型输出为空")]
  EmptyOutput,
  #[error("模型输出不是有限数值: {0}")]
  InvalidScore(f32),
  #[error("推理会话锁已损坏")]
  SessionPoisoned,
}

/// 从 `onnx:///path/to/model.onnx` 构建分类器
#[derive(Debug, Clone)]
pub struct OnnxClassifierBuilder {
  model_path: String,
  intra_threads: Option<usize>,
}

impl FromUrlWithScheme for OnnxClassifierBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxClassifierBuilder {
  type Error = OnnxClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxClassifierError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(Self::new(url.path()))
  }
}

impl OnnxClassifierBuilder {
  pub fn new(model_path: impl Into<String>) -> Self {
    Self {
      model_path: model_path.into(),
      intra_threads: None,
    }
  }

  pub fn intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = Some(threads);
    self
  }

  pub fn build(self) -> Result<OnnxClassifier, OnnxClassifierError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let mut builder = Session::builder()?;
    if let Some(threads) = self.intra_threads {
      builder = builder.with_intra_threads(threads)?;
    }
    let session = builder.commit_from_memory(&model_data)?;
    info!("模型加载完成");

    Ok(OnnxClassifier {
      session: Mutex::new(session),
    })
  }
}

/// 二分类成熟度模型
///
/// 输入槽 0 接收 `1×224×224×3` 张量，输出槽 0 的第一个标量为成熟概率。
/// 会话在互斥锁内运行，同一实例上的推理不会并发。
pub struct OnnxClassifier {
  session: Mutex<Session>,
}

impl Model for OnnxClassifier {
  type Input = RoiTensor;
  type Output = f32;
  type Error = OnnxClassifierError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let tensor = Tensor::from_array((RoiTensor::SHAPE, input.to_vec()))?;

    let mut session = self
      .session
      .lock()
      .map_err(|_| OnnxClassifierError::SessionPoisoned)?;
    let outputs = session.run(inputs![tensor])?;
    let (_, scores) = outputs[0].try_extract_tensor::<f32>()?;

    let score = *scores.first().ok_or(OnnxClassifierError::EmptyOutput)?;
    if !score.is_finite() {
      return Err(OnnxClassifierError::InvalidScore(score));
    }
    debug!("模型输出分数: {:.4}", score);

    Ok(score.clamp(0.0, 1.0))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builder_requires_onnx_scheme() {
    let url = Url::parse("yolo:///etc/tedge/tomato_model.onnx").unwrap();
    assert!(matches!(
      OnnxClassifierBuilder::from_url(&url),
      Err(OnnxClassifierError::ModelPathError(_))
    ));
  }

  #[test]
  fn builder_takes_path_from_url() {
    let url = Url::parse("onnx:///etc/tedge/tomato_model.onnx").unwrap();
    let builder = OnnxClassifierBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path, "/etc/tedge/tomato_model.onnx");
  }

  #[test]
  fn missing_model_file_is_a_load_error() {
    let result = OnnxClassifierBuilder::new("/nonexistent/tomato_model.onnx").build();
    assert!(matches!(result, Err(OnnxClassifierError::ModelLoadError(_))));
  }
}
