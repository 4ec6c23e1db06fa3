//! 依赖解析抽象接口
//!
//! 提供依赖解析能力以及标识请求方的解析上下文

use crate::descriptor::{downcast_value, ComponentDescriptor};
use infrastructure_common::{Capability, ContainerError, ContainerResult};
use std::fmt;
use std::sync::Arc;

/// 依赖解析 trait
pub trait ValueResolver: Send + Sync {
    /// 解析单个组件
    ///
    /// - 没有任何注册时返回 `Ok(None)`
    /// - 存在多个候选时返回 [`ContainerError::AmbiguousBinding`]
    fn resolve(
        &self,
        capability: &Capability,
        context: &ResolveContext<'_>,
    ) -> ContainerResult<Option<Arc<dyn ComponentDescriptor>>>;

    /// 解析全部匹配的组件，按注册顺序返回
    fn resolve_multiple(
        &self,
        capability: &Capability,
        context: &ResolveContext<'_>,
    ) -> ContainerResult<Vec<Arc<dyn ComponentDescriptor>>>;
}

/// 解析上下文
///
/// 记录解析请求由谁发起。外部调用方（例如启动代码）没有请求方，
/// 这类请求不会产生依赖关系。
#[derive(Clone)]
pub struct ResolveContext<'a> {
    /// 解析器
    resolver: &'a dyn ValueResolver,
    /// 请求方描述符
    requesting_descriptor: Option<Arc<dyn ComponentDescriptor>>,
}

impl<'a> ResolveContext<'a> {
    /// 创建没有请求方的上下文
    pub fn new(resolver: &'a dyn ValueResolver) -> Self {
        Self {
            resolver,
            requesting_descriptor: None,
        }
    }

    /// 创建以指定描述符为请求方的上下文
    pub fn for_descriptor(
        resolver: &'a dyn ValueResolver,
        descriptor: Arc<dyn ComponentDescriptor>,
    ) -> Self {
        Self {
            resolver,
            requesting_descriptor: Some(descriptor),
        }
    }

    /// 派生一个请求方不同的上下文
    pub fn with_requester(&self, descriptor: Arc<dyn ComponentDescriptor>) -> Self {
        Self::for_descriptor(self.resolver, descriptor)
    }

    pub fn resolver(&self) -> &'a dyn ValueResolver {
        self.resolver
    }

    pub fn requesting_descriptor(&self) -> Option<&Arc<dyn ComponentDescriptor>> {
        self.requesting_descriptor.as_ref()
    }

    /// 以当前上下文解析单个描述符
    pub fn resolve(
        &self,
        capability: &Capability,
    ) -> ContainerResult<Option<Arc<dyn ComponentDescriptor>>> {
        self.resolver.resolve(capability, self)
    }

    /// 以当前上下文解析全部描述符
    pub fn resolve_multiple(
        &self,
        capability: &Capability,
    ) -> ContainerResult<Vec<Arc<dyn ComponentDescriptor>>> {
        self.resolver.resolve_multiple(capability, self)
    }

    /// 解析并取得能力 `C` 的实例，未注册时返回 `Ok(None)`
    pub fn get<C>(&self) -> ContainerResult<Option<Arc<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let capability = Capability::of::<C>();
        match self.resolve(&capability)? {
            Some(descriptor) => self.value_of::<C>(&capability, &descriptor).map(Some),
            None => Ok(None),
        }
    }

    /// 解析并取得能力 `C` 的实例，未注册视为错误
    pub fn require<C>(&self) -> ContainerResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.get::<C>()?.ok_or_else(|| ContainerError::Unresolved {
            capability: Capability::of::<C>().name().to_string(),
        })
    }

    /// 解析并取得能力 `C` 的全部实例
    pub fn get_all<C>(&self) -> ContainerResult<Vec<Arc<C>>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let capability = Capability::of::<C>();
        self.resolve_multiple(&capability)?
            .iter()
            .map(|descriptor| self.value_of::<C>(&capability, descriptor))
            .collect()
    }

    fn value_of<C>(
        &self,
        capability: &Capability,
        descriptor: &Arc<dyn ComponentDescriptor>,
    ) -> ContainerResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let mismatch = || ContainerError::TypeMismatch {
            expected: capability.name().to_string(),
            descriptor: descriptor.name().to_string(),
        };

        let value = descriptor
            .get_value_as(capability, self)
            .map_err(|source| ContainerError::component(descriptor.name(), source))?
            .ok_or_else(mismatch)?;

        downcast_value::<C>(&value).ok_or_else(mismatch)
    }
}

impl fmt::Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveContext")
            .field(
                "requesting_descriptor",
                &self.requesting_descriptor.as_ref().map(|d| d.name().to_string()),
            )
            .field("resolver", &"<resolver>")
            .finish()
    }
}
