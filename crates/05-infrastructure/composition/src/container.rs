//! 组件容器门面

use di_abstractions::{
    ComponentContainer, ComponentDescriptor, ContainerStats, ResolveContext, ValueResolver,
};
use di_impl::ComponentStorage;
use infrastructure_common::{Capability, ComponentStorageState, ContainerResult};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// 基于组件存储的容器
///
/// 对外提供类型化的解析接口。门面发起的解析没有请求方，因此不会产生依赖关系。
#[derive(Clone)]
pub struct StorageComponentContainer {
    storage: Arc<ComponentStorage>,
}

impl StorageComponentContainer {
    pub(crate) fn new(storage: Arc<ComponentStorage>) -> Self {
        Self { storage }
    }

    /// 容器标识
    pub fn id(&self) -> &str {
        self.storage.id()
    }

    /// 当前生命周期状态
    pub fn state(&self) -> ComponentStorageState {
        self.storage.state()
    }

    /// 容器统计信息
    pub fn stats(&self) -> ContainerStats {
        self.storage.stats()
    }

    /// 底层组件存储
    pub fn storage(&self) -> &Arc<ComponentStorage> {
        &self.storage
    }

    fn context(&self) -> ResolveContext<'_> {
        ResolveContext::new(self.storage.as_resolver())
    }

    /// 获取能力 `C` 的实例，未注册时返回 `Ok(None)`
    pub fn get<C>(&self) -> ContainerResult<Option<Arc<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.context().get::<C>()
    }

    /// 获取能力 `C` 的实例，未注册视为错误
    pub fn require<C>(&self) -> ContainerResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.context().require::<C>()
    }

    /// 按注册顺序获取能力 `C` 的全部实例
    pub fn get_all<C>(&self) -> ContainerResult<Vec<Arc<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.context().get_all::<C>()
    }

    /// 解析能力对应的描述符而不取值
    pub fn resolve_descriptor(
        &self,
        capability: &Capability,
    ) -> ContainerResult<Option<Arc<dyn ComponentDescriptor>>> {
        self.storage.resolve(capability, &self.context())
    }

    /// 在已组合的容器中追加注册描述符，新描述符会立即组合
    pub fn register(&self, descriptors: Vec<Arc<dyn ComponentDescriptor>>) -> ContainerResult<()> {
        self.storage.register_descriptors(&self.context(), descriptors)
    }

    /// 释放容器
    pub fn dispose(&self) -> ContainerResult<()> {
        info!("释放容器: {}", self.id());
        self.storage.dispose()
    }
}

impl fmt::Debug for StorageComponentContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageComponentContainer")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish()
    }
}
