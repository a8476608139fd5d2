// 该文件是 Lukuang （路况） 项目的一部分。
// src/input.rs - 数据集帧读取
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

use crate::dataset::DatasetError;

mod frame_source;

pub use self::frame_source::FrameSource;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("标注文件错误: {0}")]
  DatasetError(#[from] DatasetError),
  #[error("URL 拼接错误: {0}")]
  UrlError(#[from] url::ParseError),
  #[cfg(feature = "download")]
  #[error("HTTP 请求失败: {0}")]
  RequestError(#[from] Box<ureq::Error>),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}
