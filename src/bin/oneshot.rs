// 该文件是 Hongguo （红果） 项目的一部分。
// src/bin/oneshot.rs - 单帧分析工具
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use hongguo::{
  FromUrl,
  input::CameraWrapper,
  model::{ChannelOrder, OnnxClassifierBuilder, RoiPreprocessor},
  output::{AnnotationRenderer, JpegWriter, LabelFont},
  pipeline::AnalysisPipeline,
  task::{OneShotTask, Task},
};

/// 采集一帧，检测番茄并输出标注图像与 JSON 结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: PathBuf,
  /// 标注字体
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,
  /// 以 RGB 通道顺序送入模型
  #[arg(long)]
  pub rgb: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output.display());

  let camera = CameraWrapper::from_url(&args.input)?;
  let model = OnnxClassifierBuilder::from_url(&args.model)?.build()?;
  let font = LabelFont::discover(args.font.as_deref())?;
  let channel_order = if args.rgb {
    ChannelOrder::Rgb
  } else {
    ChannelOrder::Bgr
  };
  let pipeline = AnalysisPipeline::new(AnnotationRenderer::new(Some(font)))
    .with_preprocessor(RoiPreprocessor::new(channel_order));

  let writer = JpegWriter::new(&args.output);
  let analysis = OneShotTask::new(pipeline).run_task(camera, model, &writer)?;

  for result in &analysis.results {
    println!("{}", serde_json::to_string(result)?);
  }

  Ok(())
}
