// 该文件是 Lukuang （路况） 项目的一部分。
// src/cache.rs - 计算结果缓存
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
  collections::{HashMap, VecDeque, hash_map::DefaultHasher},
  hash::{Hash, Hasher},
};

use tracing::{trace, warn};

/// 函数名加参数内容得到的 64 位指纹
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
  pub fn builder(name: &str) -> FingerprintBuilder {
    FingerprintBuilder::new(name)
  }
}

pub struct FingerprintBuilder {
  hasher: DefaultHasher,
}

impl FingerprintBuilder {
  pub fn new(name: &str) -> Self {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    Self { hasher }
  }

  pub fn bytes(mut self, bytes: &[u8]) -> Self {
    bytes.hash(&mut self.hasher);
    self
  }

  pub fn str(mut self, s: &str) -> Self {
    s.hash(&mut self.hasher);
    self
  }

  pub fn u64(mut self, v: u64) -> Self {
    v.hash(&mut self.hasher);
    self
  }

  /// 浮点数按位模式参与哈希
  pub fn f32(mut self, v: f32) -> Self {
    v.to_bits().hash(&mut self.hasher);
    self
  }

  pub fn finish(self) -> Fingerprint {
    Fingerprint(self.hasher.finish())
  }
}

#[derive(Debug)]
struct Slot<V> {
  tag: Box<str>,
  value: V,
}

/// 以指纹为键的缓存，作用域为持有者本身
///
/// 每项同时保存一个可读的标签，命中时标签不一致视为指纹冲突并重新计算。
/// 超出容量时先淘汰最早写入的项。
#[derive(Debug)]
pub struct Memo<V> {
  entries: HashMap<Fingerprint, Slot<V>>,
  order: VecDeque<Fingerprint>,
  capacity: usize,
}

impl<V> Default for Memo<V> {
  fn default() -> Self {
    Self::bounded(usize::MAX)
  }
}

impl<V> Memo<V> {
  /// 不限容量
  pub fn new() -> Self {
    Self::default()
  }

  /// 最多保留 `capacity` 项（至少 1 项）
  pub fn bounded(capacity: usize) -> Self {
    Self {
      entries: HashMap::new(),
      order: VecDeque::new(),
      capacity: capacity.max(1),
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// 计算失败时不写入缓存
  pub fn get_or_try_insert_with<F, E>(&mut self, key: Fingerprint, tag: &str, f: F) -> Result<&V, E>
  where
    F: FnOnce() -> Result<V, E>,
  {
    let hit = match self.entries.get(&key) {
      Some(slot) if *slot.tag == *tag => true,
      Some(slot) => {
        warn!("缓存指纹冲突 {:016x}: {} / {}", key.0, slot.tag, tag);
        false
      }
      None => false,
    };
    if hit {
      return Ok(&self.entries[&key].value);
    }

    trace!("缓存未命中: {:016x} ({})", key.0, tag);
    let value = f()?;
    Ok(self.insert(key, tag, value))
  }

  fn insert(&mut self, key: Fingerprint, tag: &str, value: V) -> &V {
    use std::collections::hash_map::Entry;

    if !self.entries.contains_key(&key) {
      while self.entries.len() >= self.capacity {
        let Some(oldest) = self.order.pop_front() else {
          break;
        };
        if let Some(slot) = self.entries.remove(&oldest) {
          trace!("缓存淘汰: {:016x} ({})", oldest.0, slot.tag);
        }
      }
      self.order.push_back(key);
    }

    let slot = Slot {
      tag: tag.into(),
      value,
    };
    match self.entries.entry(key) {
      Entry::Occupied(mut entry) => {
        entry.insert(slot);
        &entry.into_mut().value
      }
      Entry::Vacant(entry) => &entry.insert(slot).value,
    }
  }

  pub fn invalidate(&mut self, key: Fingerprint) -> Option<V> {
    self.order.retain(|k| *k != key);
    self.entries.remove(&key).map(|slot| slot.value)
  }

  pub fn clear(&mut self) {
    self.entries.clear();
    self.order.clear();
  }
}
