//! 组件描述符抽象接口

use crate::resolver::ResolveContext;
use infrastructure_common::{Capability, ComponentResult, Instantiation, Lifetime};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 组件值
///
/// 为能力 `C` 提供的值总是一个装着 `Arc<C>` 的 `Arc<dyn Any>`，
/// 这样具体类型和 trait 对象可以用同一种方式取回。
pub type ComponentValue = Arc<dyn Any + Send + Sync>;

/// 把能力值包装成组件值
pub fn into_component_value<C>(value: Arc<C>) -> ComponentValue
where
    C: ?Sized + Send + Sync + 'static,
{
    Arc::new(value)
}

/// 从组件值中取回能力值
pub fn downcast_value<C>(value: &ComponentValue) -> Option<Arc<C>>
where
    C: ?Sized + Send + Sync + 'static,
{
    value.downcast_ref::<Arc<C>>().cloned()
}

/// 组件描述符 trait
///
/// 容器对组件的唯一句柄。容器只依赖三种能力：生产（或返回缓存的）实例、
/// 注入属性、可选的释放。描述符以引用身份区分，从不复制或按结构比较。
pub trait ComponentDescriptor: Send + Sync {
    /// 描述符名称，用于日志和错误信息
    fn name(&self) -> &str;

    /// 该描述符满足的全部能力
    fn capabilities(&self) -> &[Capability];

    /// 生命周期
    fn lifetime(&self) -> Lifetime {
        Lifetime::Singleton
    }

    /// 实例化策略
    fn instantiation(&self) -> Instantiation {
        Instantiation::WithEnvironment
    }

    /// 组合时是否需要立即实例化和注入
    fn is_eager(&self) -> bool {
        self.lifetime() == Lifetime::Singleton
            && self.instantiation() == Instantiation::WithEnvironment
    }

    /// 生产实例，单例多次调用返回同一个实例
    fn get_value(&self, context: &ResolveContext<'_>) -> ComponentResult<ComponentValue>;

    /// 以指定能力的形式生产实例
    ///
    /// 描述符不提供该能力时返回 `None`。
    fn get_value_as(
        &self,
        capability: &Capability,
        context: &ResolveContext<'_>,
    ) -> ComponentResult<Option<ComponentValue>>;

    /// 注入属性，必须在实例化之后调用
    fn inject_properties(&self, context: &ResolveContext<'_>) -> ComponentResult<()>;

    /// 释放能力，不支持释放时返回 `None`
    fn as_disposable(&self) -> Option<&dyn Disposable> {
        None
    }
}

impl fmt::Debug for dyn ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name())
            .field("capabilities", &self.capabilities())
            .field("lifetime", &self.lifetime())
            .finish()
    }
}

/// 可释放 trait
///
/// 只会在容器释放时被调用，且最多调用一次。
pub trait Disposable: Send + Sync {
    /// 释放资源，返回是否实际执行了释放钩子
    fn dispose(&self) -> ComponentResult<bool>;
}

/// 描述符身份
///
/// 以 `Arc` 指向的地址作为身份，只在描述符被容器持有期间有效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorKey(usize);

impl DescriptorKey {
    /// 获取描述符身份
    pub fn of(descriptor: &Arc<dyn ComponentDescriptor>) -> Self {
        Self(Arc::as_ptr(descriptor).cast::<()>() as usize)
    }
}
