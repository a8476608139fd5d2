// 该文件是 Lukuang （路况） 项目的一部分。
// src/main.rs - 真值与 YOLOv3 检测结果对比
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

use anyhow::Result;
use clap::Parser;
use tracing::info;

use lukuang::{
  FromUrl,
  assets::{AssetGuard, AssetManifest, VerifiedAssets},
  input::FrameSource,
  model::{ReplayNetwork, Thresholds, YoloV3Builder},
  output::OutputWrapper,
  task::{CompareTask, Dataset, Session, Task},
};

use crate::args::Args;

fn verified_assets(args: &Args) -> Result<VerifiedAssets> {
  let guard = AssetGuard::new(&args.assets, AssetManifest::yolov3());
  if args.no_download {
    return Ok(guard.verify()?);
  }

  #[cfg(feature = "download")]
  let assets = guard.ensure(&lukuang::assets::HttpFetch)?;
  #[cfg(not(feature = "download"))]
  let assets = guard.verify()?;

  Ok(assets)
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("数据集: {}", args.dataset);
  info!("标注文件: {}", args.labels);
  info!("输出路径: {}", args.output);
  info!(
    "标签 {} 数量范围: [{}, {}]",
    args.label, args.min_elts, args.max_elts
  );

  let thresholds = Thresholds {
    confidence: args.confidence,
    overlap: args.overlap,
  };

  let dataset = Dataset::open(FrameSource::from_url(&args.dataset)?, &args.labels)?;
  info!(
    "共 {} 条标注, {} 帧",
    dataset.metadata().len(),
    dataset.summary().len()
  );
  let output = OutputWrapper::from_url(&args.output)?;

  let session = match &args.model {
    Some(model) => {
      info!("模型输出: {}", model);
      let assets = verified_assets(&args)?;
      let network = ReplayNetwork::from_url(model)?;
      let detector = YoloV3Builder::new(assets)
        .thresholds(thresholds)
        .build(network)?;
      Some(Session::new(detector))
    }
    None => None,
  };

  let frame_index = if args.all {
    None
  } else {
    Some(args.frame_index)
  };

  CompareTask::new(args.label)
    .with_range(args.min_elts, args.max_elts)
    .with_frame_index(frame_index)
    .with_thresholds(thresholds)
    .with_sweep(args.sweep.clone())
    .run_task(&dataset, session, output)?;

  Ok(())
}
