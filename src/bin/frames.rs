// 该文件是 Lukuang （路况） 项目的一部分。
// src/bin/frames.rs - 按标签数量列出帧
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use lukuang::{FromUrl, input::FrameSource, label::Label, task::Dataset};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 数据集根目录
  #[arg(long, value_name = "DATASET")]
  pub dataset: Url,
  /// 标注文件名，`.gz` 结尾时按 gzip 解压
  #[arg(long, value_name = "FILE", default_value = "labels.csv.gz")]
  pub labels: String,
  /// 用于筛选帧的标签
  #[arg(long, default_value = "car")]
  pub label: Label,
  #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(0..=25))]
  pub min_elts: u32,
  #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(0..=25))]
  pub max_elts: u32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("数据集: {}", args.dataset);
  let dataset = Dataset::open(FrameSource::from_url(&args.dataset)?, &args.labels)?;
  let summary = dataset.summary();
  info!("数据集中的标签: {:?}", summary.labels());

  let selected = summary.select_frames(args.label, args.min_elts, args.max_elts);
  if selected.is_empty() {
    warn!("没有满足条件的帧，请选择其他标签或数量范围");
    return Ok(());
  }

  let counts = summary.objects_per_frame(&selected, args.label);
  for (index, (frame, count)) in selected.iter().zip(counts).enumerate() {
    println!("{}\t{}\t{}", index, frame, count);
  }
  info!("共 {} / {} 帧", selected.len(), summary.len());

  Ok(())
}
