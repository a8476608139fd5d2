// 该文件是 Lukuang （路况） 项目的一部分。
// src/taxonomy.rs - COCO 类别到应用标签的映射
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

use crate::label::Label;

/// YOLOv3 (COCO) 的类别数量
pub const COCO_CLASS_COUNT: usize = 80;

/// COCO 类别索引到应用标签的映射，`None` 表示丢弃该检测
///
/// 表项按位置对应，未映射的类别也显式列出。
pub const COCO_TO_LABEL: [Option<Label>; COCO_CLASS_COUNT] = [
  Some(Label::Pedestrian), //  0 person
  Some(Label::Biker), //  1 bicycle
  Some(Label::Car), //  2 car
  Some(Label::Biker), //  3 motorbike
  None, //  4 aeroplane
  Some(Label::Truck), //  5 bus
  None, //  6 train
  Some(Label::Truck), //  7 truck
  None, //  8 boat
  Some(Label::TrafficLight), //  9 traffic light
  None, // 10 fire hydrant
  None, // 11 stop sign
  None, // 12 parking meter
  None, // 13 bench
  None, // 14 bird
  None, // 15 cat
  None, // 16 dog
  None, // 17 horse
  None, // 18 sheep
  None, // 19 cow
  None, // 20 elephant
  None, // 21 bear
  None, // 22 zebra
  None, // 23 giraffe
  None, // 24 backpack
  None, // 25 umbrella
  None, // 26 handbag
  None, // 27 tie
  None, // 28 suitcase
  None, // 29 frisbee
  None, // 30 skis
  None, // 31 snowboard
  None, // 32 sports ball
  None, // 33 kite
  None, // 34 baseball bat
  None, // 35 baseball glove
  None, // 36 skateboard
  None, // 37 surfboard
  None, // 38 tennis racket
  None, // 39 bottle
  None, // 40 wine glass
  None, // 41 cup
  None, // 42 fork
  None, // 43 knife
  None, // 44 spoon
  None, // 45 bowl
  None, // 46 banana
  None, // 47 apple
  None, // 48 sandwich
  None, // 49 orange
  None, // 50 broccoli
  None, // 51 carrot
  None, // 52 hot dog
  None, // 53 pizza
  None, // 54 donut
  None, // 55 cake
  None, // 56 chair
  None, // 57 sofa
  None, // 58 pottedplant
  None, // 59 bed
  None, // 60 diningtable
  None, // 61 toilet
  None, // 62 tvmonitor
  None, // 63 laptop
  None, // 64 mouse
  None, // 65 remote
  None, // 66 keyboard
  None, // 67 cell phone
  None, // 68 microwave
  None, // 69 oven
  None, // 70 toaster
  None, // 71 sink
  None, // 72 refrigerator
  None, // 73 book
  None, // 74 clock
  None, // 75 vase
  None, // 76 scissors
  None, // 77 teddy bear
  None, // 78 hair drier
  None, // 79 toothbrush
];

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("类别映射表长度为 {expected}，但网络类别数为 {actual}")]
pub struct TaxonomyMismatch {
  pub expected: usize,
  pub actual: usize,
}

/// 按位置查表的类别映射
#[derive(Debug, Clone, Copy)]
pub struct Taxonomy<'a> {
  entries: &'a [Option<Label>],
}

impl Taxonomy<'static> {
  pub const COCO: Taxonomy<'static> = Taxonomy {
    entries: &COCO_TO_LABEL,
  };
}

impl Default for Taxonomy<'static> {
  fn default() -> Self {
    Taxonomy::COCO
  }
}

impl<'a> Taxonomy<'a> {
  pub const fn new(entries: &'a [Option<Label>]) -> Self {
    Self { entries }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// 将网络类别映射为应用标签，`None` 表示丢弃
  ///
  /// 越界的类别同样丢弃；长度在构建检测器时已经校验过。
  pub fn remap(&self, class_id: usize) -> Option<Label> {
    self.entries.get(class_id).copied().flatten()
  }

  /// 校验网络类别数与映射表长度一致
  pub fn check_class_count(&self, actual: usize) -> Result<(), TaxonomyMismatch> {
    if actual != self.entries.len() {
      return Err(TaxonomyMismatch {
        expected: self.entries.len(),
        actual,
      });
    }
    Ok(())
  }
}
