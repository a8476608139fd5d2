// 该文件是 Lukuang （路况） 项目的一部分。
// src/task.rs - 真值与检测结果对比任务
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

use anyhow::{Context, bail};
use image::RgbImage;
use tracing::{debug, info, warn};

use crate::{
  cache::{Fingerprint, Memo},
  dataset::{Metadata, Summary},
  detection::BoxSet,
  input::{FrameSource, InputError},
  label::Label,
  model::{DetectorError, Network, RawOutput, Thresholds, YoloV3},
  output::{Comparison, Render},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 数据集：帧来源、标注与统计
pub struct Dataset {
  source: FrameSource,
  metadata: Metadata,
  summary: Summary,
}

impl Dataset {
  pub fn new(source: FrameSource, metadata: Metadata) -> Self {
    let summary = Summary::from_metadata(&metadata);
    Self {
      source,
      metadata,
      summary,
    }
  }

  /// 从数据集根目录读取名为 `labels` 的标注文件
  pub fn open(source: FrameSource, labels: &str) -> Result<Self, InputError> {
    let metadata = source.metadata(labels)?;
    Ok(Self::new(source, metadata))
  }

  pub fn source(&self) -> &FrameSource {
    &self.source
  }

  pub fn metadata(&self) -> &Metadata {
    &self.metadata
  }

  pub fn summary(&self) -> &Summary {
    &self.summary
  }
}

/// 缓存网络输出的帧数
///
/// 任务按帧顺序处理，每帧只在阈值扫描内复用一次前向结果。
pub const FORWARD_CACHE_FRAMES: usize = 1;

/// 持有检测器，并按帧缓存网络输出
///
/// 同一帧换阈值时只重做后处理。缓存最多保留 [`FORWARD_CACHE_FRAMES`] 帧，
/// 命中时还会核对帧名。
pub struct Session<N> {
  detector: YoloV3<N>,
  forwards: Memo<RawOutput>,
}

impl<N> Session<N>
where
  N: Network,
  N::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(detector: YoloV3<N>) -> Self {
    Self {
      detector,
      forwards: Memo::bounded(FORWARD_CACHE_FRAMES),
    }
  }

  pub fn detector(&self) -> &YoloV3<N> {
    &self.detector
  }

  /// 已缓存的网络输出数量
  pub fn cached(&self) -> usize {
    self.forwards.len()
  }

  pub fn invalidate(&mut self) {
    self.forwards.clear();
  }

  pub fn detect(
    &mut self,
    frame: &str,
    image: &RgbImage,
    thresholds: Thresholds,
  ) -> Result<BoxSet, DetectorError> {
    let key = Fingerprint::builder("forward")
      .str(frame)
      .u64(u64::from(image.width()))
      .u64(u64::from(image.height()))
      .bytes(image.as_raw())
      .finish();

    let detector = &self.detector;
    let output = self
      .forwards
      .get_or_try_insert_with(key, frame, || detector.forward(image))?;
    detector.postprocess(output, image, thresholds)
  }
}

/// 按标签数量筛选帧，输出真值与检测结果的对比
#[derive(Debug, Clone)]
pub struct CompareTask {
  label: Label,
  min_elts: u32,
  max_elts: u32,
  frame_index: Option<usize>,
  thresholds: Thresholds,
  sweep: Vec<Thresholds>,
}

impl CompareTask {
  pub fn new(label: Label) -> Self {
    Self {
      label,
      min_elts: 10,
      max_elts: 20,
      frame_index: Some(0),
      thresholds: Thresholds::default(),
      sweep: Vec::new(),
    }
  }

  pub fn with_range(mut self, min_elts: u32, max_elts: u32) -> Self {
    self.min_elts = min_elts;
    self.max_elts = max_elts;
    self
  }

  /// 选中帧中的下标；`None` 表示处理全部选中帧
  pub fn with_frame_index(mut self, frame_index: Option<usize>) -> Self {
    self.frame_index = frame_index;
    self
  }

  pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
    self.thresholds = thresholds;
    self
  }

  /// 额外的阈值组合，只统计检测数量，不输出图像
  pub fn with_sweep(mut self, sweep: Vec<Thresholds>) -> Self {
    self.sweep = sweep;
    self
  }

  fn frames<'d>(&self, dataset: &'d Dataset) -> anyhow::Result<Vec<&'d str>> {
    let summary = dataset.summary();
    let selected = summary.select_frames(self.label, self.min_elts, self.max_elts);

    let counts = summary.objects_per_frame(&selected, self.label);
    debug!("选中帧的 {} 数量: {:?}", self.label, counts);

    match self.frame_index {
      None => Ok(selected),
      Some(_) if selected.is_empty() => Ok(selected),
      Some(index) => match selected.get(index) {
        Some(frame) => Ok(vec![*frame]),
        None => bail!(
          "帧下标 {} 超出范围，共选中 {} 帧",
          index,
          selected.len()
        ),
      },
    }
  }
}

impl<'d, N, O> Task<&'d Dataset, Option<Session<N>>, O> for CompareTask
where
  N: Network,
  N::Error: std::error::Error + Send + Sync + 'static,
  O: Render<RgbImage, Comparison>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    dataset: &'d Dataset,
    session: Option<Session<N>>,
    output: O,
  ) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frames = self.frames(dataset)?;
    if frames.is_empty() {
      warn!("没有满足条件的帧，请选择其他标签或数量范围");
      return Ok(());
    }
    if session.is_none() {
      warn!("未指定模型，只输出真值");
    }

    let mut session = session;
    for (n, frame) in frames.iter().enumerate() {
      info!("真值 {}/{}: {}", n, frames.len(), frame);
      let image = dataset
        .source()
        .load(frame)
        .with_context(|| format!("读取帧 {} 失败", frame))?;
      let truth = dataset.metadata().boxes_for(frame);

      let detection = match session.as_mut() {
        Some(session) => {
          for thresholds in &self.sweep {
            let boxes = session.detect(frame, &image, *thresholds)?;
            info!(
              "阈值 (置信度 {:.2}, 重叠 {:.2}): 检测到 {} 个目标",
              thresholds.confidence,
              thresholds.overlap,
              boxes.len()
            );
          }

          let now = std::time::Instant::now();
          let boxes = session.detect(frame, &image, self.thresholds)?;
          info!(
            "YOLO 检测 (重叠 {:.1}) (置信度 {:.1}): {} 个目标, 耗时 {:.2?}",
            self.thresholds.overlap,
            self.thresholds.confidence,
            boxes.len(),
            now.elapsed()
          );
          Some(boxes)
        }
        None => None,
      };

      let comparison = Comparison {
        frame: frame.to_string(),
        truth,
        detection,
      };
      output.render_result(&image, &comparison)?;
    }

    info!("任务完成，共处理 {} 帧", frames.len());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::{
    cell::{Cell, RefCell},
    rc::Rc,
  };

  use image::Rgb;

  use super::*;
  use crate::{
    assets::{AssetGuard, AssetManifest, AssetSpec, YOLOV3_CONFIG, YOLOV3_NAMES, YOLOV3_WEIGHTS},
    detection::BBox,
    frame::YoloV3Blob,
    model::{Layer, YoloV3Builder},
    taxonomy::Taxonomy,
  };

  static CAR_PEDESTRIAN: [Option<Label>; 2] = [Some(Label::Car), Some(Label::Pedestrian)];

  struct CountingNetwork {
    output: RawOutput,
    calls: Rc<Cell<usize>>,
  }

  impl Network for CountingNetwork {
    type Error = std::convert::Infallible;

    fn forward(&self, _blob: &YoloV3Blob) -> Result<RawOutput, Self::Error> {
      self.calls.set(self.calls.get() + 1);
      Ok(self.output.clone())
    }
  }

  #[derive(Default)]
  struct Collect {
    rendered: RefCell<Vec<Comparison>>,
  }

  impl Render<RgbImage, Comparison> for &Collect {
    type Error = std::convert::Infallible;

    fn render_result(&self, _frame: &RgbImage, result: &Comparison) -> Result<(), Self::Error> {
      self.rendered.borrow_mut().push(result.clone());
      Ok(())
    }
  }

  fn dataset(dir: &std::path::Path) -> Dataset {
    for name in ["a.png", "b.png", "c.png"] {
      RgbImage::from_pixel(100, 100, Rgb([50; 3]))
        .save(dir.join(name))
        .unwrap();
    }
    let metadata = Metadata::from_reader(
      "\
frame,xmin,ymin,xmax,ymax,label
a.png,0,0,10,10,car
b.png,0,0,10,10,car
b.png,20,20,30,30,car
c.png,5,5,6,6,pedestrian
"
      .as_bytes(),
    )
    .unwrap();
    Dataset::new(FrameSource::Directory(dir.to_path_buf()), metadata)
  }

  fn session(dir: &std::path::Path) -> Session<CountingNetwork> {
    let assets = dir.join("assets");
    std::fs::create_dir_all(&assets).unwrap();
    let files: [(&str, &[u8]); 3] = [
      (YOLOV3_NAMES, b"car\nperson\n"),
      (YOLOV3_WEIGHTS, b"weights"),
      (YOLOV3_CONFIG, b"[net]\n"),
    ];
    let mut specs = Vec::new();
    for (name, bytes) in files {
      std::fs::write(assets.join(name), bytes).unwrap();
      let md5 = crate::assets::file_md5(&assets.join(name)).unwrap().unwrap();
      specs.push(AssetSpec::new(name, md5, "mem://"));
    }
    let verified = AssetGuard::new(&assets, AssetManifest::new(specs))
      .verify()
      .unwrap();

    let network = CountingNetwork {
      output: vec![
        Layer::from_rows(&[
          [0.5, 0.5, 0.2, 0.2, 0.0, 0.9, 0.1],
          [0.5, 0.5, 0.2, 0.2, 0.0, 0.1, 0.9],
          [0.1, 0.1, 0.05, 0.05, 0.0, 0.95, 0.0],
        ])
        .unwrap(),
      ]
      .into(),
      calls: Rc::default(),
    };
    let detector = YoloV3Builder::new(verified)
      .taxonomy(Taxonomy::new(&CAR_PEDESTRIAN))
      .build(network)
      .unwrap();
    Session::new(detector)
  }

  #[test]
  fn truth_only_for_selected_frame() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dataset(dir.path());
    let collect = Collect::default();

    CompareTask::new(Label::Car)
      .with_range(2, 25)
      .run_task(&dataset, None::<Session<CountingNetwork>>, &collect)
      .unwrap();

    let rendered = collect.rendered.borrow();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].frame, "b.png");
    assert_eq!(rendered[0].truth.len(), 2);
    assert!(rendered[0].detection.is_none());
  }

  #[test]
  fn empty_selection_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dataset(dir.path());
    let collect = Collect::default();

    CompareTask::new(Label::Truck)
      .with_range(1, 25)
      .run_task(&dataset, None::<Session<CountingNetwork>>, &collect)
      .unwrap();
    assert!(collect.rendered.borrow().is_empty());
  }

  #[test]
  fn frame_index_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dataset(dir.path());
    let collect = Collect::default();

    let result = CompareTask::new(Label::Car)
      .with_range(0, 25)
      .with_frame_index(Some(3))
      .run_task(&dataset, None::<Session<CountingNetwork>>, &collect);
    assert!(result.is_err());
  }

  #[test]
  fn detection_with_sweep_runs_network_once_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dataset(dir.path());
    let session = session(dir.path());
    let calls = session.detector().network().calls.clone();
    let collect = Collect::default();

    CompareTask::new(Label::Car)
      .with_range(0, 25)
      .with_frame_index(None)
      .with_sweep(vec![
        Thresholds {
          confidence: 0.2,
          overlap: 0.1,
        },
        Thresholds {
          confidence: 0.99,
          overlap: 0.3,
        },
      ])
      .run_task(&dataset, Some(session), &collect)
      .unwrap();

    let rendered = collect.rendered.borrow();
    assert_eq!(
      rendered.iter().map(|c| c.frame.as_str()).collect::<Vec<_>>(),
      vec!["a.png", "b.png", "c.png"]
    );
    assert_eq!(calls.get(), 3);
    for comparison in rendered.iter() {
      assert_eq!(
        comparison.detection.as_ref().unwrap().as_slice(),
        &[
          BBox::new(7, 7, 12, 12, Label::Car),
          BBox::new(40, 40, 60, 60, Label::Car),
        ]
      );
    }
  }

  #[test]
  fn session_caches_forward_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let image = RgbImage::from_pixel(100, 100, Rgb([0; 3]));

    let strict = Thresholds {
      confidence: 0.92,
      overlap: 0.3,
    };
    assert_eq!(session.detect("a", &image, Thresholds::default()).unwrap().len(), 2);
    assert_eq!(session.detect("a", &image, strict).unwrap().len(), 1);
    assert_eq!(session.detector().network().calls.get(), 1);
    assert_eq!(session.cached(), 1);

    session.invalidate();
    assert_eq!(session.cached(), 0);
  }

  #[test]
  fn session_keeps_only_the_current_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session(dir.path());
    let strict = Thresholds {
      confidence: 0.92,
      overlap: 0.3,
    };

    for (n, name) in ["a", "b", "c", "d"].into_iter().enumerate() {
      let image = RgbImage::from_pixel(100, 100, Rgb([n as u8; 3]));
      session.detect(name, &image, Thresholds::default()).unwrap();
      session.detect(name, &image, strict).unwrap();
      assert!(session.cached() <= FORWARD_CACHE_FRAMES);
      assert_eq!(session.detector().network().calls.get(), n + 1);
    }

    // 已淘汰的帧需要重新前向
    let first = RgbImage::from_pixel(100, 100, Rgb([0; 3]));
    session.detect("a", &first, strict).unwrap();
    assert_eq!(session.detector().network().calls.get(), 5);
    assert_eq!(session.cached(), 1);
  }
}
