// 该文件是 Lukuang （路况） 项目的一部分。
// src/input/frame_source.rs - 本地或远程数据集目录
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

use image::RgbImage;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, dataset::Metadata, input::InputError};

/// 数据集根目录：帧图像与标注文件都按名称在其下查找
#[derive(Debug, Clone)]
pub enum FrameSource {
  Directory(PathBuf),
  #[cfg(feature = "download")]
  Remote(Url),
}

impl FromUrl for FrameSource {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      "file" => Ok(FrameSource::Directory(PathBuf::from(url.path()))),
      #[cfg(feature = "download")]
      "http" | "https" => {
        // 保证以 `/` 结尾，join 时才会追加而不是替换最后一段
        let mut root = url.clone();
        if !root.path().ends_with('/') {
          let path = format!("{}/", root.path());
          root.set_path(&path);
        }
        Ok(FrameSource::Remote(root))
      }
      scheme => {
        error!("不支持的数据集来源: {}", scheme);
        Err(InputError::SchemeMismatch(scheme.to_string()))
      }
    }
  }
}

impl FrameSource {
  /// 读取数据集中名为 `name` 的文件
  pub fn read(&self, name: &str) -> Result<Vec<u8>, InputError> {
    match self {
      FrameSource::Directory(root) => {
        let path = root.join(name);
        debug!("读取文件: {}", path.display());
        Ok(std::fs::read(path)?)
      }
      #[cfg(feature = "download")]
      FrameSource::Remote(root) => {
        let url = root.join(name)?;
        debug!("请求: {}", url);
        let response = ureq::get(url.as_str()).call().map_err(Box::new)?;
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut response.into_reader(), &mut bytes)?;
        Ok(bytes)
      }
    }
  }

  /// 读取并解码一帧
  pub fn load(&self, frame: &str) -> Result<RgbImage, InputError> {
    let bytes = self.read(frame)?;
    let image = image::load_from_memory(&bytes)?.into_rgb8();
    debug!("帧 {}: {}x{}", frame, image.width(), image.height());
    Ok(image)
  }

  /// 读取标注文件，`*.gz` 按 gzip 解压
  pub fn metadata(&self, name: &str) -> Result<Metadata, InputError> {
    info!("读取标注文件: {}", name);
    let bytes = self.read(name)?;
    Ok(Metadata::from_named_reader(name, bytes.as_slice())?)
  }
}
