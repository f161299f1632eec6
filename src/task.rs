// 该文件是 Hongguo （红果） 项目的一部分。
// src/task.rs - 单次分析与定时上传任务
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

use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  input::Camera,
  model::{Model, RoiTensor},
  output::{JpegWriter, Publish},
  pipeline::{Analysis, AnalysisPipeline},
};

/// 现场部署的上传周期
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 采集一帧，分析后写入 JPEG 文件
pub struct OneShotTask {
  pipeline: AnalysisPipeline,
}

impl OneShotTask {
  pub fn new(pipeline: AnalysisPipeline) -> Self {
    Self { pipeline }
  }
}

impl<'a, CE, ME, C, M> Task<C, M, &'a JpegWriter> for OneShotTask
where
  CE: std::error::Error + Send + Sync + 'static,
  ME: std::error::Error + Send + Sync + 'static,
  C: Camera<Error = CE>,
  M: Model<Input = RoiTensor, Output = f32, Error = ME>,
{
  type Output = Analysis;
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: C,
    model: M,
    output: &'a JpegWriter,
  ) -> Result<Analysis, Self::Error> {
    info!("开始任务...");
    let frame = input.capture().context("采集图像失败")?;
    info!("输入帧获取成功: {}x{}", frame.width(), frame.height());

    let now = Instant::now();
    let analysis = self.pipeline.analyze(&frame, &model).context("分析失败")?;
    info!(
      "分析完成，检测到 {} 个目标，耗时: {:.2?}",
      analysis.results.len(),
      now.elapsed()
    );

    output
      .write(&analysis.annotated)
      .with_context(|| format!("写入 {} 失败", output.path().display()))?;
    Ok(analysis)
  }
}

#[derive(Error, Debug)]
pub enum StreamError {
  #[error("没有名为 {name}、类型为 {mime} 的二进制文件可供更新")]
  AssetNotFound { name: String, mime: String },
  #[error("运行时长过大: {0:?}")]
  DurationOutOfRange(Duration),
}

/// 每轮结束后的等待方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Pacing {
  /// 按实际耗时精确扣除
  #[default]
  Fractional,
  /// 耗时先截断为整秒再扣除，与旧部署脚本行为一致
  WholeSeconds,
}

impl Pacing {
  pub fn sleep_for(&self, interval: Duration, elapsed: Duration) -> Duration {
    let elapsed = match self {
      Pacing::Fractional => elapsed,
      Pacing::WholeSeconds => Duration::from_secs(elapsed.as_secs()),
    };
    interval.saturating_sub(elapsed)
  }
}

/// 上传任务的状态，经 [`StreamTask::with_state_channel`] 逐次发出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
  Idle,
  /// 每轮开始时发出一次
  Running,
  TimedOut,
  /// 达到指定轮数提前结束
  CycleLimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamReport {
  pub cycles: usize,
  pub state: StreamState,
}

/// 在给定时长内循环：查找目标 → 采集 → 分析 → 写文件 → 上传 → 等待
pub struct StreamTask {
  pipeline: AnalysisPipeline,
  writer: JpegWriter,
  duration: Duration,
  interval: Duration,
  pacing: Pacing,
  cycle_limit: Option<usize>,
  state_tx: Option<Sender<StreamState>>,
}

impl StreamTask {
  pub fn new(pipeline: AnalysisPipeline, writer: JpegWriter, duration: Duration) -> Self {
    Self {
      pipeline,
      writer,
      duration,
      interval: DEFAULT_INTERVAL,
      pacing: Pacing::default(),
      cycle_limit: None,
      state_tx: None,
    }
  }

  pub fn with_interval(mut self, interval: Duration) -> Self {
    self.interval = interval;
    self
  }

  pub fn with_pacing(mut self, pacing: Pacing) -> Self {
    self.pacing = pacing;
    self
  }

  pub fn with_cycle_limit(mut self, cycle_limit: Option<usize>) -> Self {
    self.cycle_limit = cycle_limit;
    self
  }

  pub fn with_state_channel(mut self, state_tx: Sender<StreamState>) -> Self {
    self.state_tx = Some(state_tx);
    self
  }

  // 接收端已关闭时忽略
  fn enter(&self, state: StreamState) -> StreamState {
    if let Some(tx) = &self.state_tx {
      let _ = tx.send(state);
    }
    state
  }

  fn finish(&self, cycles: usize, state: StreamState) -> StreamReport {
    StreamReport {
      cycles,
      state: self.enter(state),
    }
  }
}

impl<CE, ME, PE, C, M, P> Task<C, M, P> for StreamTask
where
  CE: std::error::Error + Send + Sync + 'static,
  ME: std::error::Error + Send + Sync + 'static,
  PE: std::error::Error + Send + Sync + 'static,
  C: Camera<Error = CE>,
  M: Model<Input = RoiTensor, Output = f32, Error = ME>,
  P: Publish<Error = PE>,
{
  type Output = StreamReport;
  type Error = anyhow::Error;

  fn run_task(self, mut input: C, model: M, output: P) -> Result<StreamReport, Self::Error> {
    let deadline = Instant::now()
      .checked_add(self.duration)
      .ok_or(StreamError::DurationOutOfRange(self.duration))?;
    self.enter(StreamState::Idle);
    let mut cycles = 0usize;
    info!(
      "开始上传任务，时长 {:.0?}，周期 {:.0?}",
      self.duration, self.interval
    );
    if let Ok(duration) = chrono::TimeDelta::from_std(self.duration)
      && let Some(ends_at) = chrono::Local::now().checked_add_signed(duration)
    {
      info!("任务预计结束于 {}", ends_at.format("%Y-%m-%d %H:%M:%S"));
    }

    while Instant::now() < deadline {
      if self.cycle_limit.is_some_and(|limit| cycles >= limit) {
        info!("达到指定轮数 {}，退出任务循环", cycles);
        return Ok(self.finish(cycles, StreamState::CycleLimitReached));
      }

      self.enter(StreamState::Running);
      let started = Instant::now();
      cycles += 1;

      let target = output
        .resolve_target()
        .context("查询二进制文件失败")?
        .ok_or_else(|| StreamError::AssetNotFound {
          name: output.target_name().to_string(),
          mime: output.content_type().to_string(),
        })?;
      info!("({}) 二进制文件 id: {}", cycles, target);

      let frame = input.capture().context("采集图像失败")?;
      let analysis = self.pipeline.analyze(&frame, &model).context("分析失败")?;
      for result in &analysis.results {
        debug!("({}) {:?} {}", cycles, result.position, result.caption());
      }

      let jpeg = self
        .writer
        .write(&analysis.annotated)
        .with_context(|| format!("写入 {} 失败", self.writer.path().display()))?;
      output
        .publish(&target, &jpeg)
        .with_context(|| format!("上传二进制文件 {} 失败", target))?;

      let elapsed = started.elapsed();
      info!(
        "({}) 检测到 {} 个目标，已上传，耗时: {:.2?}",
        cycles,
        analysis.results.len(),
        elapsed
      );

      let wait = self.pacing.sleep_for(self.interval, elapsed);
      if wait.is_zero() && !self.interval.is_zero() {
        warn!("({}) 本轮耗时超过周期 {:.0?}", cycles, self.interval);
      }
      std::thread::sleep(wait);
    }

    if cycles == 0 {
      debug!("时长为零，未执行任何轮次");
    }
    info!("任务超时结束，共 {} 轮", cycles);
    Ok(self.finish(cycles, StreamState::TimedOut))
  }
}
