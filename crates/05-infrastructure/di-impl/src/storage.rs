//! 组件存储
//!
//! 容器本体：持有注册表和依赖图，实现解析约定，驱动注册、组合、释放，
//! 并维护生命周期状态机。
//!
//! 内部状态由一把互斥锁保护，调用描述符代码（实例化、注入、释放）时从不持有该锁，
//! 因此描述符可以在组合期间同步、重入地回调解析接口。

use crate::graph::{topological_sort, DependencyGraph};
use crate::registry::{ComponentRegistry, SingleEntry};
use di_abstractions::{
    ComponentContainer, ComponentDescriptor, ContainerStats, DescriptorKey, ResolveContext,
    ValueResolver,
};
use infrastructure_common::{
    Capability, ComponentStorageState, ContainerConfig, ContainerError, ContainerResult,
    CyclePolicy, DisposalPolicy, TeardownFailure,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 组件存储
pub struct ComponentStorage {
    /// 容器标识
    id: String,
    /// 容器配置
    config: ContainerConfig,
    /// 内部状态
    inner: Mutex<StorageInner>,
    /// 解析请求计数
    resolutions: AtomicUsize,
}

#[derive(Default)]
struct StorageInner {
    state: ComponentStorageState,
    registry: ComponentRegistry,
    /// 按注册顺序保存的全部描述符
    descriptors: Vec<Arc<dyn ComponentDescriptor>>,
    /// 描述符身份到注册序号
    index: HashMap<DescriptorKey, usize>,
    dependencies: DependencyGraph,
    disposed: usize,
}

impl StorageInner {
    fn providers_of(&self, capability: &Capability) -> Vec<usize> {
        self.registry
            .try_get_entry(capability)
            .map(|entry| {
                entry
                    .iter()
                    .filter_map(|d| self.index.get(&DescriptorKey::of(d)).copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 记录 `requester → capability` 是否会闭合一个依赖环，返回环上的描述符序号
    fn find_cycle(&self, requester: usize, capability: &Capability) -> Option<Vec<usize>> {
        self.providers_of(capability).into_iter().find_map(|provider| {
            self.dependencies
                .find_path(provider, requester, |c| self.providers_of(c))
                .map(|path| std::iter::once(requester).chain(path).collect())
        })
    }

    fn describe_chain(&self, chain: &[usize]) -> String {
        chain
            .iter()
            .map(|&i| self.descriptors[i].name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// 计算释放顺序：依赖方先于被依赖方
    fn dispose_order(&self) -> Vec<Arc<dyn ComponentDescriptor>> {
        let items: Vec<usize> = (0..self.descriptors.len()).collect();
        let sorted = topological_sort(&items, |node| {
            self.dependencies
                .requests(node)
                .iter()
                .flat_map(|capability| self.providers_of(capability))
                .collect()
        });

        for (dependent, dependency) in &sorted.broken_edges {
            warn!(
                "释放顺序中存在循环依赖，忽略依赖关系: {} -> {}",
                self.descriptors[*dependent].name(),
                self.descriptors[*dependency].name()
            );
        }

        sorted
            .order
            .into_iter()
            .map(|i| self.descriptors[i].clone())
            .collect()
    }
}

impl ComponentStorage {
    /// 使用默认配置创建组件存储
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_config(id, ContainerConfig::default())
    }

    /// 使用指定配置创建组件存储
    pub fn with_config(id: impl Into<String>, config: ContainerConfig) -> Self {
        Self {
            id: id.into(),
            config,
            inner: Mutex::new(StorageInner::default()),
            resolutions: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 描述符请求过的能力
    pub fn requested_capabilities(&self, descriptor: &Arc<dyn ComponentDescriptor>) -> Vec<Capability> {
        let inner = self.inner.lock();
        inner
            .index
            .get(&DescriptorKey::of(descriptor))
            .map(|&i| inner.dependencies.requests(i).to_vec())
            .unwrap_or_default()
    }

    fn check_resolvable(
        &self,
        inner: &StorageInner,
        capability: &Capability,
    ) -> ContainerResult<()> {
        if inner.state.accepts_resolution() {
            return Ok(());
        }
        let container_id = self.id.clone();
        let capability = capability.name().to_string();
        let state = inner.state;
        Err(if state == ComponentStorageState::Initial {
            ContainerError::NotComposed {
                container_id,
                capability,
                state,
            }
        } else {
            ContainerError::AlreadyDisposed {
                container_id,
                capability,
                state,
            }
        })
    }

    fn register_dependency(
        &self,
        inner: &mut StorageInner,
        capability: &Capability,
        context: &ResolveContext<'_>,
    ) -> ContainerResult<()> {
        let Some(requester) = context.requesting_descriptor() else {
            return Ok(());
        };
        let Some(&requester_index) = inner.index.get(&DescriptorKey::of(requester)) else {
            debug!(
                "请求方 {} 不属于容器 {}，不记录依赖",
                requester.name(),
                self.id
            );
            return Ok(());
        };

        if self.config.cycle_policy == CyclePolicy::Reject {
            if let Some(chain) = inner.find_cycle(requester_index, capability) {
                let dependency_chain = inner.describe_chain(&chain);
                error!("检测到循环依赖: {}", dependency_chain);
                return Err(ContainerError::CircularDependency {
                    capability: capability.name().to_string(),
                    dependency_chain,
                });
            }
        }

        if inner.dependencies.record(requester_index, *capability) {
            debug!("记录依赖: {} -> {}", requester.name(), capability.short_name());
        }
        Ok(())
    }

    /// 实例化并注入一批描述符中需要立即组合的部分
    fn compose_descriptors(
        &self,
        context: &ResolveContext<'_>,
        descriptors: &[Arc<dyn ComponentDescriptor>],
    ) -> ContainerResult<()> {
        let eager: Vec<&Arc<dyn ComponentDescriptor>> =
            descriptors.iter().filter(|d| d.is_eager()).collect();
        debug!(
            "容器 {} 组合 {} 个描述符，其中 {} 个立即实例化",
            self.id,
            descriptors.len(),
            eager.len()
        );

        for descriptor in &eager {
            let descriptor_context = context.with_requester(Arc::clone(descriptor));
            descriptor
                .get_value(&descriptor_context)
                .map_err(|source| ContainerError::component(descriptor.name(), source))?;
        }

        for descriptor in &eager {
            let descriptor_context = context.with_requester(Arc::clone(descriptor));
            descriptor
                .inject_properties(&descriptor_context)
                .map_err(|source| ContainerError::component(descriptor.name(), source))?;
        }

        Ok(())
    }

    fn finish_disposal(&self, disposed: usize) {
        let mut inner = self.inner.lock();
        inner.state = ComponentStorageState::Disposed;
        inner.disposed = disposed;
        inner.registry.clear();
        inner.dependencies.clear();
        inner.index.clear();
        inner.descriptors.clear();
    }
}

/// 释放守卫
///
/// 即使某个释放钩子 panic，容器也会进入 `Disposed` 状态。
struct DisposalGuard<'a> {
    storage: &'a ComponentStorage,
    disposed: usize,
}

impl Drop for DisposalGuard<'_> {
    fn drop(&mut self) {
        self.storage.finish_disposal(self.disposed);
    }
}

impl ValueResolver for ComponentStorage {
    fn resolve(
        &self,
        capability: &Capability,
        context: &ResolveContext<'_>,
    ) -> ContainerResult<Option<Arc<dyn ComponentDescriptor>>> {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        if self.config.trace_resolution {
            debug!("解析: {} ({:?})", capability.short_name(), context);
        }

        let mut inner = self.inner.lock();
        self.check_resolvable(&inner, capability)?;

        let Some(entry) = inner.registry.try_get_entry(capability).map(<[_]>::to_vec) else {
            return Ok(None);
        };
        self.register_dependency(&mut inner, capability, context)?;
        let state = inner.state;
        drop(inner);

        match SingleEntry::from_entry(&entry) {
            SingleEntry::None => Ok(None),
            SingleEntry::One(descriptor) => Ok(Some(descriptor)),
            SingleEntry::Ambiguous(candidates) => {
                let candidates: Vec<String> =
                    candidates.iter().map(|d| d.name().to_string()).collect();
                warn!("能力 {} 存在多个绑定: {:?}", capability.short_name(), candidates);
                Err(ContainerError::AmbiguousBinding {
                    capability: capability.name().to_string(),
                    candidates,
                    state,
                })
            }
        }
    }

    fn resolve_multiple(
        &self,
        capability: &Capability,
        context: &ResolveContext<'_>,
    ) -> ContainerResult<Vec<Arc<dyn ComponentDescriptor>>> {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        if self.config.trace_resolution {
            debug!("解析全部: {} ({:?})", capability.short_name(), context);
        }

        let mut inner = self.inner.lock();
        self.check_resolvable(&inner, capability)?;
        self.register_dependency(&mut inner, capability, context)?;

        Ok(inner
            .registry
            .try_get_entry(capability)
            .map(<[_]>::to_vec)
            .unwrap_or_default())
    }
}

impl ComponentContainer for ComponentStorage {
    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> ComponentStorageState {
        self.inner.lock().state
    }

    fn register_descriptors(
        &self,
        context: &ResolveContext<'_>,
        descriptors: Vec<Arc<dyn ComponentDescriptor>>,
    ) -> ContainerResult<()> {
        let (added, live) = {
            let mut inner = self.inner.lock();
            if !inner.state.accepts_registration() {
                error!("容器 {} 在 {} 状态下拒绝注册描述符", self.id, inner.state);
                return Err(ContainerError::RegistrationRejected {
                    container_id: self.id.clone(),
                    state: inner.state,
                });
            }

            let mut added = Vec::with_capacity(descriptors.len());
            for descriptor in descriptors {
                let key = DescriptorKey::of(&descriptor);
                if inner.index.contains_key(&key) {
                    debug!("描述符 {} 已注册，忽略重复注册", descriptor.name());
                    continue;
                }
                let position = inner.descriptors.len();
                inner.index.insert(key, position);
                inner.descriptors.push(descriptor.clone());
                added.push(descriptor);
            }
            inner.registry.add_all(&added);

            (added, inner.state == ComponentStorageState::Initialized)
        };

        info!("容器 {} 注册了 {} 个描述符", self.id, added.len());

        if live {
            self.compose_descriptors(context, &added)?;
        }
        Ok(())
    }

    fn compose(&self, context: &ResolveContext<'_>) -> ContainerResult<()> {
        let descriptors = {
            let mut inner = self.inner.lock();
            if inner.state != ComponentStorageState::Initial {
                error!("容器 {} 已经组合过", self.id);
                return Err(ContainerError::AlreadyComposed {
                    container_id: self.id.clone(),
                    state: inner.state,
                });
            }
            inner.state = ComponentStorageState::Initialized;
            inner.descriptors.clone()
        };

        info!("开始组合容器 {}", self.id);
        self.compose_descriptors(context, &descriptors)?;
        info!("容器 {} 组合完成", self.id);
        Ok(())
    }

    fn dispose(&self) -> ContainerResult<()> {
        let order = {
            let mut inner = self.inner.lock();
            match inner.state {
                ComponentStorageState::Initial => {
                    debug!("容器 {} 尚未组合，释放为空操作", self.id);
                    return Ok(());
                }
                ComponentStorageState::Initialized => {}
                state => {
                    error!("容器 {} 不能在 {} 状态下释放", self.id, state);
                    return Err(ContainerError::InvalidDisposeState {
                        container_id: self.id.clone(),
                        state,
                    });
                }
            }
            inner.state = ComponentStorageState::Disposing;
            inner.dispose_order()
        };

        info!("开始释放容器 {}，共 {} 个组件", self.id, order.len());

        let mut guard = DisposalGuard {
            storage: self,
            disposed: 0,
        };
        let mut failures = Vec::new();

        for descriptor in &order {
            let Some(disposable) = descriptor.as_disposable() else {
                continue;
            };
            match disposable.dispose() {
                Ok(true) => guard.disposed += 1,
                Ok(false) => {}
                Err(source) => {
                    error!("组件 {} 释放失败: {}", descriptor.name(), source);
                    failures.push(TeardownFailure {
                        descriptor: descriptor.name().to_string(),
                        source,
                    });
                    if self.config.disposal_policy == DisposalPolicy::FailFast {
                        warn!("释放策略为 fail_fast，停止释放剩余组件");
                        break;
                    }
                }
            }
        }

        drop(guard);

        if failures.is_empty() {
            info!("容器 {} 释放完成", self.id);
            Ok(())
        } else {
            Err(ContainerError::DisposeFailed {
                container_id: self.id.clone(),
                failures,
            })
        }
    }

    fn stats(&self) -> ContainerStats {
        let inner = self.inner.lock();
        ContainerStats {
            registered_descriptors: inner.descriptors.len(),
            capabilities: inner.registry.capability_count(),
            resolutions: self.resolutions.load(Ordering::Relaxed),
            dependency_edges: inner.dependencies.edge_count(),
            disposed_descriptors: inner.disposed,
        }
    }

    fn as_resolver(&self) -> &dyn ValueResolver {
        self
    }
}
