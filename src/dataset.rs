// 该文件是 Lukuang （路况） 项目的一部分。
// src/dataset.rs - 数据集标注与统计
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

use thiserror::Error;

use crate::label::UnknownLabel;

mod metadata;
mod summary;

pub use self::metadata::{Metadata, Record};
pub use self::summary::Summary;

/// 标注文件必需的列
pub const REQUIRED_COLUMNS: [&str; 6] = ["frame", "xmin", "ymin", "xmax", "ymax", "label"];

#[derive(Error, Debug)]
pub enum DatasetError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标注文件为空")]
  Empty,
  #[error("标注文件缺少列 '{0}'")]
  MissingColumn(&'static str),
  #[error("第 {line} 行只有 {actual} 列，至少需要 {expected} 列")]
  ShortRow {
    line: usize,
    expected: usize,
    actual: usize,
  },
  #[error("第 {line} 行列 '{column}' 的值 '{value}' 不是整数")]
  InvalidNumber {
    line: usize,
    column: &'static str,
    value: String,
  },
  #[error("第 {line} 行: {source}")]
  UnknownLabel {
    line: usize,
    #[source]
    source: UnknownLabel,
  },
}
