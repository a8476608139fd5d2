// 该文件是 Lukuang （路况） 项目的一部分。
// src/dataset/summary.rs - 每帧目标数量统计与帧筛选
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

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::{dataset::Metadata, label::Label};

/// 帧 → 各标签目标数量，帧按名称排序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
  counts: BTreeMap<String, [u32; Label::COUNT]>,
  present: [bool; Label::COUNT],
}

impl Summary {
  pub fn from_metadata(metadata: &Metadata) -> Self {
    let mut summary = Summary::default();
    for record in metadata.records() {
      summary.add(&record.frame, record.bbox.label);
    }
    debug!(
      "统计完成: {} 帧, 标签 {:?}",
      summary.counts.len(),
      summary.labels()
    );
    summary
  }

  pub fn add(&mut self, frame: &str, label: Label) {
    let counts = self
      .counts
      .entry(frame.to_string())
      .or_insert([0; Label::COUNT]);
    counts[label.index()] += 1;
    self.present[label.index()] = true;
  }

  pub fn len(&self) -> usize {
    self.counts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.counts.is_empty()
  }

  /// 数据集中出现过的标签
  pub fn labels(&self) -> Vec<Label> {
    Label::ALL
      .into_iter()
      .filter(|label| self.present[label.index()])
      .collect()
  }

  pub fn frames(&self) -> impl Iterator<Item = &str> {
    self.counts.keys().map(String::as_str)
  }

  /// 帧中某标签的数量；帧或标签不存在时为 0
  pub fn count(&self, frame: &str, label: Label) -> u32 {
    self
      .counts
      .get(frame)
      .map_or(0, |counts| counts[label.index()])
  }

  /// 标签数量落在 `[min_elts, max_elts]` 内的帧
  pub fn select_frames(&self, label: Label, min_elts: u32, max_elts: u32) -> Vec<&str> {
    let selected: Vec<&str> = self
      .counts
      .iter()
      .filter(|(_, counts)| (min_elts..=max_elts).contains(&counts[label.index()]))
      .map(|(frame, _)| frame.as_str())
      .collect();

    if selected.is_empty() {
      warn!(
        "没有帧满足条件: {} 数量在 [{}, {}] 之间",
        label, min_elts, max_elts
      );
    } else {
      debug!(
        "{} 数量在 [{}, {}] 之间的帧: {} 个",
        label,
        min_elts,
        max_elts,
        selected.len()
      );
    }
    selected
  }

  /// 选中帧的目标数量序列
  pub fn objects_per_frame(&self, selection: &[&str], label: Label) -> Vec<u32> {
    selection
      .iter()
      .map(|frame| self.count(frame, label))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn summary(rows: &[(&str, Label, u32)]) -> Summary {
    let mut summary = Summary::default();
    for &(frame, label, n) in rows {
      for _ in 0..n {
        summary.add(frame, label);
      }
    }
    summary
  }

  #[test]
  fn bounds_are_inclusive() {
    let summary = summary(&[("f1", Label::Car, 10)]);
    assert_eq!(summary.select_frames(Label::Car, 0, 25), vec!["f1"]);
    assert_eq!(summary.select_frames(Label::Car, 10, 10), vec!["f1"]);
    assert!(summary.select_frames(Label::Car, 11, 25).is_empty());
  }

  #[test]
  fn absent_label_counts_as_zero() {
    let summary = summary(&[("f1", Label::Car, 3), ("f2", Label::Truck, 1)]);
    assert_eq!(summary.count("f2", Label::Car), 0);
    assert_eq!(summary.select_frames(Label::Car, 0, 0), vec!["f2"]);
    assert_eq!(summary.select_frames(Label::Pedestrian, 1, 25), Vec::<&str>::new());
  }

  #[test]
  fn frames_are_ordered_by_id() {
    let summary = summary(&[
      ("c.jpg", Label::Car, 2),
      ("a.jpg", Label::Car, 4),
      ("b.jpg", Label::Car, 3),
    ]);
    let selected = summary.select_frames(Label::Car, 2, 4);
    assert_eq!(selected, vec!["a.jpg", "b.jpg", "c.jpg"]);
    assert_eq!(summary.objects_per_frame(&selected, Label::Car), vec![4, 3, 2]);
  }

  #[test]
  fn labels_present_in_dataset() {
    let metadata = Metadata::from_reader(
      "frame,xmin,ymin,xmax,ymax,label\nx,0,0,1,1,biker\ny,0,0,1,1,car\ny,2,2,3,3,car\n".as_bytes(),
    )
    .unwrap();
    let summary = Summary::from_metadata(&metadata);
    assert_eq!(summary.labels(), vec![Label::Car, Label::Biker]);
    assert_eq!(summary.count("y", Label::Car), 2);
    assert_eq!(summary.len(), 2);
  }

  #[test]
  fn inverted_range_selects_nothing() {
    let summary = summary(&[("f1", Label::Car, 5)]);
    assert!(summary.select_frames(Label::Car, 20, 10).is_empty());
  }
}
