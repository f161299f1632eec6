// 该文件是 Hongguo （红果） 项目的一部分。
// tests/analysis.rs - 从图像文件到上传的端到端测试
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

use std::cell::RefCell;
use std::convert::Infallible;
use std::time::Duration;

use image::{ImageFormat, Rgb};
use url::Url;

use hongguo::{
  FromUrl,
  frame::Frame,
  input::{Camera, CameraWrapper},
  model::{Model, Ripeness, RoiTensor},
  output::{JpegWriter, Publish},
  pipeline::AnalysisPipeline,
  task::{StreamState, StreamTask, Task},
};

/// 按 ROI 平均红色通道打分，红色越多越“熟”
struct RednessModel;

impl Model for RednessModel {
  type Input = RoiTensor;
  type Output = f32;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    // BGR 顺序，红色在第 3 个通道
    let reds: f32 = input.as_slice().chunks_exact(3).map(|px| px[2]).sum();
    let count = (input.as_slice().len() / 3) as f32;
    Ok(reds / count)
  }
}

struct Recorder {
  uploads: RefCell<Vec<Vec<u8>>>,
}

impl Publish for &Recorder {
  type Error = Infallible;

  fn target_name(&self) -> &str {
    "webcam_image.jpg"
  }

  fn content_type(&self) -> &str {
    "image/jpeg"
  }

  fn resolve_target(&self) -> Result<Option<String>, Self::Error> {
    Ok(Some("4711".to_string()))
  }

  fn publish(&self, target: &str, jpeg: &[u8]) -> Result<(), Self::Error> {
    assert_eq!(target, "4711");
    self.uploads.borrow_mut().push(jpeg.to_vec());
    Ok(())
  }
}

fn two_tomatoes() -> Frame {
  Frame::from_fn(320, 240, |x, y| {
    let inside = |cx: f32, cy: f32, r: f32| {
      let (dx, dy) = (x as f32 - cx, y as f32 - cy);
      dx * dx + dy * dy <= r * r
    };
    if inside(80.0, 120.0, 30.0) || inside(230.0, 110.0, 35.0) {
      Rgb([210, 25, 25])
    } else {
      Rgb([110, 120, 115])
    }
  })
}

#[test]
fn image_file_camera_feeds_the_pipeline() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("frame.png");
  two_tomatoes().save(&input).unwrap();

  let url = Url::parse(&format!("image://{}", input.display())).unwrap();
  let mut camera = CameraWrapper::from_url(&url).unwrap();
  let frame = camera.capture().unwrap();

  let analysis = AnalysisPipeline::default()
    .analyze(&frame, &RednessModel)
    .unwrap();
  assert_eq!(analysis.results.len(), 2);
  assert!(analysis.results[0].position.y < analysis.results[1].position.y);
  for result in &analysis.results {
    assert!(result.confidence >= 0.5);
    assert!(result.position.fits_within(320, 240));
  }
}

#[test]
fn grey_scene_has_no_candidates() {
  let frame = Frame::from_pixel(160, 120, Rgb([100, 100, 100]));
  let analysis = AnalysisPipeline::default()
    .analyze(&frame, &RednessModel)
    .unwrap();
  assert!(analysis.results.is_empty());
}

#[test]
fn stream_uploads_the_written_jpeg() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("frame.png");
  two_tomatoes().save(&input).unwrap();
  let output = dir.path().join("tedge/webcam_image.jpg");

  let url = Url::parse(&format!("image://{}", input.display())).unwrap();
  let camera = CameraWrapper::from_url(&url).unwrap();
  let recorder = Recorder {
    uploads: RefCell::new(Vec::new()),
  };

  let report = StreamTask::new(
    AnalysisPipeline::default(),
    JpegWriter::new(&output),
    Duration::from_secs(60),
  )
  .with_interval(Duration::ZERO)
  .with_cycle_limit(Some(2))
  .run_task(camera, RednessModel, &recorder)
  .unwrap();

  assert_eq!(report.cycles, 2);
  assert_eq!(report.state, StreamState::CycleLimitReached);

  let uploads = recorder.uploads.borrow();
  assert_eq!(uploads.len(), 2);
  assert_eq!(uploads[0], uploads[1]);
  assert_eq!(std::fs::read(&output).unwrap(), uploads[1]);

  let decoded = image::load_from_memory_with_format(&uploads[1], ImageFormat::Jpeg).unwrap();
  assert_eq!((decoded.width(), decoded.height()), (320, 240));
}

#[test]
fn redness_model_calls_red_disks_ripe() {
  let analysis = AnalysisPipeline::default()
    .analyze(&two_tomatoes(), &RednessModel)
    .unwrap();
  assert!(analysis.results.iter().all(|r| r.label == Ripeness::Ripe));
}
