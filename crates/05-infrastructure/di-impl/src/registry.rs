//! 能力注册表

use di_abstractions::{ComponentDescriptor, DescriptorKey};
use infrastructure_common::Capability;
use std::collections::HashMap;
use std::sync::Arc;

/// 能力注册表
///
/// 从能力到满足该能力的描述符集合的索引。条目只会合并，不会被覆盖；
/// 每个条目内按注册顺序保存描述符。
#[derive(Default)]
pub struct ComponentRegistry {
    entries: HashMap<Capability, Vec<Arc<dyn ComponentDescriptor>>>,
}

impl ComponentRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 把描述符登记到它满足的每一个能力下
    pub fn add_all<'a, I>(&mut self, descriptors: I)
    where
        I: IntoIterator<Item = &'a Arc<dyn ComponentDescriptor>>,
    {
        for descriptor in descriptors {
            let key = DescriptorKey::of(descriptor);
            for capability in descriptor.capabilities() {
                let entry = self.entries.entry(*capability).or_default();
                if !entry.iter().any(|existing| DescriptorKey::of(existing) == key) {
                    entry.push(descriptor.clone());
                }
            }
        }
    }

    /// 获取能力的全部描述符，从未登记过时返回 `None`
    pub fn try_get_entry(&self, capability: &Capability) -> Option<&[Arc<dyn ComponentDescriptor>]> {
        self.entries.get(capability).map(Vec::as_slice)
    }

    /// 已登记的能力数量
    pub fn capability_count(&self) -> usize {
        self.entries.len()
    }

    /// 清空注册表，只在整个容器释放时使用
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// 单一化结果
pub enum SingleEntry {
    /// 没有描述符
    None,
    /// 恰好一个描述符
    One(Arc<dyn ComponentDescriptor>),
    /// 多个描述符，无法给出唯一答案
    Ambiguous(Vec<Arc<dyn ComponentDescriptor>>),
}

impl SingleEntry {
    /// 把条目归约为"恰好一个或没有"
    pub fn from_entry(entry: &[Arc<dyn ComponentDescriptor>]) -> Self {
        match entry {
            [] => Self::None,
            [single] => Self::One(single.clone()),
            candidates => Self::Ambiguous(candidates.to_vec()),
        }
    }
}
