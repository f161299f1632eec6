// 该文件是 Hongguo （红果） 项目的一部分。
// src/main.rs - 主程序入口
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

mod args;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use hongguo::{
  FromUrl,
  cloud::{CloudConfig, InventoryBinaries},
  input::CameraWrapper,
  model::OnnxClassifierBuilder,
  output::{AnnotationRenderer, JpegWriter, LabelFont},
  pipeline::AnalysisPipeline,
  task::{StreamTask, Task},
};

fn run(args: args::Args) -> Result<()> {
  info!("设备 id: {}", args.operation.device_id);
  info!("运行时长: {} 分钟", args.operation.minutes);
  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output.display());

  let config = CloudConfig::load(&args.config).context("加载 Cumulocity 凭据失败")?;
  let binaries = InventoryBinaries::new(&config, Duration::from_secs(args.http_timeout_secs))?;

  let mut builder = OnnxClassifierBuilder::from_url(&args.model)?;
  if let Some(threads) = args.threads {
    builder = builder.intra_threads(threads);
  }
  let model = builder.build()?;

  let camera = CameraWrapper::from_url(&args.input)?;
  let font = LabelFont::discover(args.font.as_deref())?;
  let pipeline =
    AnalysisPipeline::new(AnnotationRenderer::new(Some(font))).with_single_enhance(args.single_enhance);

  let report = StreamTask::new(
    pipeline,
    JpegWriter::new(&args.output),
    args.operation.duration(),
  )
  .with_interval(Duration::from_secs(args.interval_secs))
  .with_pacing(args.pacing)
  .run_task(camera, model, binaries)?;

  info!("任务结束: {:?}，共 {} 轮", report.state, report.cycles);
  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();
  run(args).inspect_err(|e| error!("任务失败: {:#}", e))
}
