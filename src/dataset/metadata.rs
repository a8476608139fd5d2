// 该文件是 Lukuang （路况） 项目的一部分。
// src/dataset/metadata.rs - 标注文件读取
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

use std::{
  collections::HashSet,
  fs::File,
  io::{BufRead, BufReader, Read},
  path::Path,
};

use flate2::read::GzDecoder;
use tracing::{debug, info};

use crate::{
  dataset::{DatasetError, REQUIRED_COLUMNS},
  detection::{BBox, BoxSet},
  label::Label,
};

const GZIP_SUFFIX: &str = ".gz";

/// 标注文件中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
  pub frame: String,
  pub bbox: BBox,
}

/// 整个数据集的标注，保持文件中的行顺序
#[derive(Debug, Clone, Default)]
pub struct Metadata {
  records: Vec<Record>,
}

fn split_fields(line: &str) -> Vec<&str> {
  line
    .split(',')
    .map(|field| field.trim().trim_matches('"'))
    .collect()
}

/// 按表头定位各必需列
fn column_indices(header: &str) -> Result<[usize; 6], DatasetError> {
  let fields = split_fields(header);
  let mut indices = [0usize; 6];
  for (slot, name) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
    *slot = fields
      .iter()
      .position(|field| *field == name)
      .ok_or(DatasetError::MissingColumn(name))?;
  }
  Ok(indices)
}

fn parse_coord(line: usize, column: &'static str, value: &str) -> Result<i32, DatasetError> {
  value.parse().map_err(|_| DatasetError::InvalidNumber {
    line,
    column,
    value: value.to_string(),
  })
}

impl Metadata {
  /// 读取标注文件，扩展名为 `.gz` 时先解压
  pub fn open(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
    let path = path.as_ref();
    info!("读取标注文件: {}", path.display());
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    Self::from_named_reader(name, File::open(path)?)
  }

  /// 按文件名选择解码方式：`*.gz` 为 gzip 压缩的 CSV，其余为纯文本
  pub fn from_named_reader<R: Read>(name: &str, reader: R) -> Result<Self, DatasetError> {
    if name.ends_with(GZIP_SUFFIX) {
      debug!("gzip 解压: {}", name);
      Self::from_reader(GzDecoder::new(reader))
    } else {
      Self::from_reader(reader)
    }
  }

  pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
    let mut lines = BufReader::new(reader).lines();
    let header = lines.next().ok_or(DatasetError::Empty)??;
    let [frame_col, xmin_col, ymin_col, xmax_col, ymax_col, label_col] = column_indices(&header)?;
    let width = frame_col
      .max(xmin_col)
      .max(ymin_col)
      .max(xmax_col)
      .max(ymax_col)
      .max(label_col)
      + 1;

    let mut records = Vec::new();
    for (idx, line) in lines.enumerate() {
      let line = line?;
      // 表头是第 1 行
      let line_no = idx + 2;
      if line.trim().is_empty() {
        continue;
      }

      let fields = split_fields(&line);
      if fields.len() < width {
        return Err(DatasetError::ShortRow {
          line: line_no,
          expected: width,
          actual: fields.len(),
        });
      }

      let label: Label = fields[label_col]
        .parse()
        .map_err(|source| DatasetError::UnknownLabel {
          line: line_no,
          source,
        })?;
      let bbox = BBox::new(
        parse_coord(line_no, "xmin", fields[xmin_col])?,
        parse_coord(line_no, "ymin", fields[ymin_col])?,
        parse_coord(line_no, "xmax", fields[xmax_col])?,
        parse_coord(line_no, "ymax", fields[ymax_col])?,
        label,
      );
      records.push(Record {
        frame: fields[frame_col].to_string(),
        bbox,
      });
    }

    debug!("共读取 {} 条标注", records.len());
    Ok(Self { records })
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn records(&self) -> &[Record] {
    &self.records
  }

  /// 某一帧的真值框，顺序与文件一致
  pub fn boxes_for(&self, frame: &str) -> BoxSet {
    self
      .records
      .iter()
      .filter(|record| record.frame == frame)
      .map(|record| record.bbox)
      .collect()
  }

  /// 去重后的帧，按首次出现的顺序
  pub fn frames(&self) -> Vec<&str> {
    let mut seen = HashSet::new();
    self
      .records
      .iter()
      .map(|record| record.frame.as_str())
      .filter(|frame| seen.insert(*frame))
      .collect()
  }
}
