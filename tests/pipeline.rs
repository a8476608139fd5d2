// 该文件是 Lukuang （路况） 项目的一部分。
// tests/pipeline.rs - 端到端流程测试
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

use std::path::Path;

use image::{Rgb, RgbImage};
use lukuang::{
  FromUrl,
  assets::{
    AssetError, AssetGuard, AssetManifest, AssetSpec, VerifiedAssets, YOLOV3_CONFIG,
    YOLOV3_NAMES, YOLOV3_WEIGHTS, file_md5,
  },
  detection::BBox,
  frame::YoloV3Blob,
  input::FrameSource,
  label::Label,
  model::{Layer, Network, RawOutput, Thresholds, YoloV3Builder, postprocess},
  output::{OutputWrapper, draw::annotate},
  taxonomy::{COCO_CLASS_COUNT, Taxonomy},
  task::{CompareTask, Dataset, Session, Task},
};
use url::Url;

struct Fixed(RawOutput);

impl Network for Fixed {
  type Error = std::convert::Infallible;

  fn forward(&self, _blob: &YoloV3Blob) -> Result<RawOutput, Self::Error> {
    Ok(self.0.clone())
  }
}

static CAR_PEDESTRIAN: [Option<Label>; 2] = [Some(Label::Car), Some(Label::Pedestrian)];

fn three_rows() -> RawOutput {
  vec![
    Layer::from_rows(&[
      [0.5, 0.5, 0.2, 0.2, 0.0, 0.9, 0.1],
      [0.5, 0.5, 0.2, 0.2, 0.0, 0.1, 0.9],
      [0.1, 0.1, 0.05, 0.05, 0.0, 0.95, 0.0],
    ])
    .unwrap(),
  ]
  .into()
}

fn write_assets(root: &Path, names: &str) -> AssetManifest {
  std::fs::create_dir_all(root).unwrap();
  let files: [(&str, &[u8]); 3] = [
    (YOLOV3_NAMES, names.as_bytes()),
    (YOLOV3_WEIGHTS, b"\x00\x01\x02\x03"),
    (YOLOV3_CONFIG, b"[net]\nwidth=416\nheight=416\n"),
  ];
  let specs = files
    .into_iter()
    .map(|(name, bytes)| {
      let path = root.join(name);
      std::fs::write(&path, bytes).unwrap();
      AssetSpec::new(name, file_md5(&path).unwrap().unwrap(), "mem://")
    })
    .collect();
  AssetManifest::new(specs)
}

fn verified(root: &Path, names: &str) -> VerifiedAssets {
  let manifest = write_assets(root, names);
  AssetGuard::new(root, manifest).verify().unwrap()
}

#[test]
fn three_row_example() {
  let boxes = postprocess(
    &three_rows(),
    100,
    100,
    &Taxonomy::new(&CAR_PEDESTRIAN),
    Thresholds::default(),
  )
  .unwrap();
  assert_eq!(
    boxes.as_slice(),
    &[
      BBox::new(7, 7, 12, 12, Label::Car),
      BBox::new(40, 40, 60, 60, Label::Car),
    ]
  );

  let image = RgbImage::from_pixel(100, 100, Rgb([0; 3]));
  let annotated = annotate(&image, &boxes);
  assert_eq!(*annotated.get_pixel(50, 50), Rgb([127, 0, 0]));
  assert_eq!(*annotated.get_pixel(60, 60), Rgb([0, 0, 0]));
  assert_eq!(*annotated.get_pixel(7, 11), Rgb([127, 0, 0]));
}

#[test]
fn detector_requires_matching_class_list() {
  let dir = tempfile::tempdir().unwrap();
  let assets = verified(dir.path(), "person\nbicycle\ncar\n");
  let network = Fixed(three_rows());
  // 3 个类别名对 COCO 的 80 项映射表
  assert!(YoloV3Builder::new(assets).build(network).is_err());
}

#[test]
fn corrupted_asset_is_reported() {
  let dir = tempfile::tempdir().unwrap();
  let manifest = write_assets(dir.path(), "car\nperson\n");
  std::fs::write(dir.path().join(YOLOV3_WEIGHTS), b"tampered").unwrap();

  let guard = AssetGuard::new(dir.path(), manifest);
  assert!(!guard.is_verified(YOLOV3_WEIGHTS).unwrap());
  assert!(guard.is_verified(YOLOV3_NAMES).unwrap());
  assert!(matches!(
    guard.verify(),
    Err(AssetError::Corrupted { .. })
  ));
  assert!(guard.is_verified("yolov4.weights").is_err());
}

#[test]
fn coco_taxonomy_covers_every_class() {
  let taxonomy = Taxonomy::COCO;
  assert_eq!(taxonomy.len(), COCO_CLASS_COUNT);
  let mapped: Vec<_> = (0..COCO_CLASS_COUNT)
    .filter_map(|id| taxonomy.remap(id).map(|label| (id, label)))
    .collect();
  assert_eq!(
    mapped,
    vec![
      (0, Label::Pedestrian),
      (1, Label::Biker),
      (2, Label::Car),
      (3, Label::Biker),
      (5, Label::Truck),
      (7, Label::Truck),
      (9, Label::TrafficLight),
    ]
  );
  assert_eq!(taxonomy.remap(COCO_CLASS_COUNT), None);
}

#[cfg(feature = "replay_network")]
#[test]
fn compare_with_replayed_network() {
  let dir = tempfile::tempdir().unwrap();
  let data = dir.path().join("data");
  std::fs::create_dir_all(&data).unwrap();
  RgbImage::from_pixel(100, 100, Rgb([0; 3]))
    .save(data.join("frame.png"))
    .unwrap();
  std::fs::write(
    data.join("labels.csv"),
    "frame,xmin,ymin,xmax,ymax,label\nframe.png,0,0,10,10,car\n",
  )
  .unwrap();

  let recording = dir.path().join("output.json");
  std::fs::write(
    &recording,
    r#"{"layers": [[[0.5, 0.5, 0.2, 0.2, 0.0, 0.9, 0.1], [0.5, 0.5, 0.2, 0.2, 0.0, 0.1, 0.9], [0.1, 0.1, 0.05, 0.05, 0.0, 0.95, 0.0]]]}"#,
  )
  .unwrap();
  let url = Url::parse(&format!("replay://{}", recording.display())).unwrap();
  let network = lukuang::model::ReplayNetwork::from_url(&url).unwrap();

  let assets = verified(&dir.path().join("assets"), "car\nperson\n");
  let detector = YoloV3Builder::new(assets)
    .taxonomy(Taxonomy::new(&CAR_PEDESTRIAN))
    .build(network)
    .unwrap();

  let source = FrameSource::from_url(&Url::from_directory_path(&data).unwrap()).unwrap();
  let dataset = Dataset::open(source, "labels.csv").unwrap();
  let out = dir.path().join("out");
  let output =
    OutputWrapper::from_url(&Url::parse(&format!("folder://{}?record", out.display())).unwrap())
      .unwrap();

  CompareTask::new(Label::Car)
    .with_range(1, 1)
    .run_task(&dataset, Some(Session::new(detector)), output)
    .unwrap();

  let truth = image::open(out.join("frame-truth.png")).unwrap().to_rgb8();
  assert_eq!(*truth.get_pixel(5, 5), Rgb([127, 0, 0]));
  assert_eq!(*truth.get_pixel(50, 50), Rgb([0, 0, 0]));

  let detection = image::open(out.join("frame-detection.png"))
    .unwrap()
    .to_rgb8();
  assert_eq!(*detection.get_pixel(50, 50), Rgb([127, 0, 0]));
  assert_eq!(*detection.get_pixel(5, 5), Rgb([0, 0, 0]));

  let records = std::fs::read_to_string(out.join("frame-detection.csv")).unwrap();
  assert_eq!(
    records,
    "frame,xmin,ymin,xmax,ymax,label\nframe.png,7,7,12,12,car\nframe.png,40,40,60,60,car\n"
  );
}
