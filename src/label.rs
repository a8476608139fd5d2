// 该文件是 Lukuang （路况） 项目的一部分。
// src/label.rs - 应用标签与调色板
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

use std::{fmt, str::FromStr};

use image::Rgb;
use thiserror::Error;

/// 数据集使用的标签集合
///
/// 标签集合是封闭的：调色板对每个变体都有颜色，真值数据中出现的
/// 其它字符串在解析时即被拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
  Car,
  Pedestrian,
  Truck,
  TrafficLight,
  Biker,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("未知标签 '{0}'，调色板中没有对应颜色")]
pub struct UnknownLabel(pub String);

impl Label {
  pub const COUNT: usize = 5;

  /// 所有标签，顺序与调色板一致
  pub const ALL: [Label; Label::COUNT] = [
    Label::Car,
    Label::Pedestrian,
    Label::Truck,
    Label::TrafficLight,
    Label::Biker,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Label::Car => "car",
      Label::Pedestrian => "pedestrian",
      Label::Truck => "truck",
      Label::TrafficLight => "trafficLight",
      Label::Biker => "biker",
    }
  }

  /// 调色板颜色
  pub fn color(&self) -> Rgb<u8> {
    match self {
      Label::Car => Rgb([255, 0, 0]),
      Label::Pedestrian => Rgb([0, 255, 0]),
      Label::Truck => Rgb([0, 0, 255]),
      Label::TrafficLight => Rgb([255, 255, 0]),
      Label::Biker => Rgb([255, 0, 255]),
    }
  }

  /// 在 `ALL` 中的位置，用作计数表的列号
  pub fn index(&self) -> usize {
    *self as usize
  }
}

impl FromStr for Label {
  type Err = UnknownLabel;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Label::ALL
      .iter()
      .copied()
      .find(|label| label.as_str() == s)
      .ok_or_else(|| UnknownLabel(s.to_string()))
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
