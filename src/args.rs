// 该文件是 Lukuang （路况） 项目的一部分。
// src/args.rs - 命令行参数
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

use clap::Parser;
use lukuang::{label::Label, model::Thresholds};
use url::Url;

pub const DATA_URL_ROOT: &str = "https://streamlit-self-driving.s3-us-west-2.amazonaws.com/";
pub const LABELS_FILENAME: &str = "labels.csv.gz";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 数据集根目录（file:///dir 或 https://host/root/）
  #[arg(long, value_name = "DATASET", default_value = DATA_URL_ROOT)]
  pub dataset: Url,

  /// 数据集根目录下的标注文件名，`.gz` 结尾时按 gzip 解压
  #[arg(long, value_name = "FILE", default_value = LABELS_FILENAME)]
  pub labels: String,

  /// 输出路径
  /// - image:///path/out.png 保存对比图
  /// - folder:///dir[?record] 按帧保存真值图与检测图
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 用于筛选帧的标签
  #[arg(long, default_value = "car")]
  pub label: Label,

  /// 帧中该标签的最少数量
  #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(0..=25))]
  pub min_elts: u32,

  /// 帧中该标签的最多数量
  #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(0..=25))]
  pub max_elts: u32,

  /// 选中帧中的下标
  #[arg(long, default_value_t = 0)]
  pub frame_index: usize,

  /// 处理全部选中帧
  #[arg(long, conflicts_with = "frame_index")]
  pub all: bool,

  /// 记录的网络输出（replay:///path/output.json），不指定时只输出真值
  #[arg(long, value_name = "MODEL")]
  pub model: Option<Url>,

  /// 模型资源目录
  #[arg(long, value_name = "DIR", default_value = ".")]
  pub assets: PathBuf,

  /// 资源缺失时不下载
  #[arg(long)]
  pub no_download: bool,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.5, value_parser = unit_interval)]
  pub confidence: f32,

  /// 重叠阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.3, value_parser = unit_interval)]
  pub overlap: f32,

  /// 额外统计的阈值组合，格式 `置信度:重叠`，可重复
  #[arg(long, value_name = "CONF:OVERLAP", value_parser = thresholds)]
  pub sweep: Vec<Thresholds>,
}

fn unit_interval(s: &str) -> Result<f32, String> {
  let value: f32 = s.parse().map_err(|e| format!("{}", e))?;
  if (0.0..=1.0).contains(&value) {
    Ok(value)
  } else {
    Err(format!("{} 不在 [0, 1] 范围内", value))
  }
}

fn thresholds(s: &str) -> Result<Thresholds, String> {
  let (confidence, overlap) = s
    .split_once(':')
    .ok_or_else(|| format!("'{}' 不是 `置信度:重叠` 格式", s))?;
  Ok(Thresholds {
    confidence: unit_interval(confidence.trim())?,
    overlap: unit_interval(overlap.trim())?,
  })
}
