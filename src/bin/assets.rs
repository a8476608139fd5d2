// 该文件是 Lukuang （路况） 项目的一部分。
// src/bin/assets.rs - 校验并下载模型资源
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

use lukuang::assets::{AssetGuard, AssetManifest};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型资源目录
  #[arg(long, value_name = "DIR", default_value = ".")]
  pub root: PathBuf,
  /// 只校验，不下载
  #[arg(long)]
  pub verify_only: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let guard = AssetGuard::new(&args.root, AssetManifest::yolov3());

  for spec in guard.manifest().iter() {
    let status = if guard.is_verified(&spec.name)? {
      "ok"
    } else {
      "missing"
    };
    println!("{}\t{}\t{}", status, spec.name, spec.md5);
  }

  if args.verify_only {
    guard.verify()?;
    info!("全部资源校验通过");
    return Ok(());
  }

  #[cfg(feature = "download")]
  let assets = guard.ensure(&lukuang::assets::HttpFetch)?;
  #[cfg(not(feature = "download"))]
  let assets = {
    warn!("未启用 download 特性，只做校验");
    guard.verify()?
  };

  let classes = assets.class_names()?;
  if classes.len() != lukuang::taxonomy::COCO_CLASS_COUNT {
    warn!("类别列表有 {} 项", classes.len());
  }
  info!("全部资源就绪: {}", args.root.display());

  Ok(())
}
