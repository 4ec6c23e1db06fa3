//! 依赖注入容器抽象接口
//!
//! 提供组件容器生命周期的核心抽象

use crate::descriptor::ComponentDescriptor;
use crate::resolver::{ResolveContext, ValueResolver};
use infrastructure_common::{ComponentStorageState, ContainerResult};
use std::sync::Arc;

/// 组件容器 trait
///
/// 注册、组合、释放三个操作应在同一个逻辑序列中调用；
/// 组合期间描述符可以同步、重入地回调解析接口。
pub trait ComponentContainer: ValueResolver {
    /// 容器标识
    fn id(&self) -> &str;

    /// 当前生命周期状态
    fn state(&self) -> ComponentStorageState;

    /// 注册描述符
    ///
    /// `Initial` 状态下只登记，`Initialized` 状态下立即组合新描述符。
    fn register_descriptors(
        &self,
        context: &ResolveContext<'_>,
        descriptors: Vec<Arc<dyn ComponentDescriptor>>,
    ) -> ContainerResult<()>;

    /// 组合全部已注册的描述符，只能调用一次
    fn compose(&self, context: &ResolveContext<'_>) -> ContainerResult<()>;

    /// 按依赖安全的顺序释放全部组件
    fn dispose(&self) -> ContainerResult<()>;

    /// 容器统计信息
    fn stats(&self) -> ContainerStats;

    /// 以解析器的形式使用容器
    fn as_resolver(&self) -> &dyn ValueResolver;
}

/// 容器统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// 已注册描述符数量
    pub registered_descriptors: usize,
    /// 已登记能力数量
    pub capabilities: usize,
    /// 解析请求总数
    pub resolutions: usize,
    /// 已记录依赖关系数量
    pub dependency_edges: usize,
    /// 已成功释放的组件数量
    pub disposed_descriptors: usize,
}
