//! 描述符实现
//!
//! - [`InstanceDescriptor`] - 由工厂函数生产实例，支持属性注入和释放钩子
//! - [`ValueDescriptor`] - 包装一个已经构建好的实例

use di_abstractions::{
    into_component_value, ComponentDescriptor, ComponentValue, Disposable, ResolveContext,
};
use infrastructure_common::{Capability, ComponentError, ComponentResult, Instantiation, Lifetime};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

/// 组件工厂函数类型
type Factory<T> = Box<dyn Fn(&ResolveContext<'_>) -> ComponentResult<T> + Send + Sync>;

/// 属性注入函数类型
type Injector<T> = Box<dyn Fn(&T, &ResolveContext<'_>) -> ComponentResult<()> + Send + Sync>;

/// 释放钩子类型
type Teardown<T> = Box<dyn Fn(&T) -> ComponentResult<()> + Send + Sync>;

/// 能力投影函数类型
type Projection<T> = Box<dyn Fn(Arc<T>) -> ComponentValue + Send + Sync>;

/// 能力投影表
///
/// 实现类型本身总是第一个能力，其余能力通过显式的转换函数提供。
struct Projections<T: Send + Sync + 'static> {
    capabilities: Vec<Capability>,
    casts: HashMap<Capability, Projection<T>>,
}

impl<T: Send + Sync + 'static> Projections<T> {
    fn new() -> Self {
        Self {
            capabilities: vec![Capability::of::<T>()],
            casts: HashMap::new(),
        }
    }

    fn add<C, F>(&mut self, cast: F)
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static,
    {
        let capability = Capability::of::<C>();
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self.casts
            .insert(capability, Box::new(move |value| into_component_value(cast(value))));
    }

    fn provides(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    fn project(&self, capability: &Capability, value: Arc<T>) -> Option<ComponentValue> {
        if *capability == Capability::of::<T>() {
            return Some(into_component_value(value));
        }
        self.casts.get(capability).map(|cast| cast(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InjectionState {
    Pending,
    Running,
    Done,
}

/// 正在执行工厂函数的线程登记，离开作用域时注销
struct CreationGuard<'a> {
    creating: &'a Mutex<Vec<ThreadId>>,
    thread: ThreadId,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        let mut creating = self.creating.lock();
        if let Some(position) = creating.iter().position(|t| *t == self.thread) {
            creating.swap_remove(position);
        }
    }
}

/// 工厂描述符
///
/// 工厂通过解析上下文获得构造依赖；需要在构造之后注入的属性通过注入函数设置，
/// 组件自身负责为这类属性提供内部可变性（例如 `OnceCell` 字段）。
///
/// 单例实例在第一次生产后缓存，注入只执行一次；瞬时描述符每次生产新实例并立即注入，
/// 不支持释放钩子。
///
/// 只有同一线程在工厂函数中再次请求自身才视为自引用；其他线程并发请求同一个单例时
/// 等待正在进行的实例化和注入完成。
pub struct InstanceDescriptor<T: Send + Sync + 'static> {
    name: String,
    projections: Projections<T>,
    lifetime: Lifetime,
    instantiation: Instantiation,
    factory: Factory<T>,
    injector: Option<Injector<T>>,
    teardown: Option<Teardown<T>>,
    instance: OnceCell<Arc<T>>,
    creating: Mutex<Vec<ThreadId>>,
    injection: ReentrantMutex<Cell<InjectionState>>,
    injected: AtomicBool,
    disposed: AtomicBool,
    self_ref: Weak<Self>,
}

impl<T: Send + Sync + 'static> InstanceDescriptor<T> {
    /// 使用工厂函数创建描述符构建器
    pub fn builder<F>(factory: F) -> InstanceDescriptorBuilder<T>
    where
        F: Fn(&ResolveContext<'_>) -> ComponentResult<T> + Send + Sync + 'static,
    {
        InstanceDescriptorBuilder::new(Box::new(factory))
    }

    /// 已缓存的单例实例
    pub fn instance(&self) -> Option<Arc<T>> {
        self.instance.get().cloned()
    }

    /// 是否已执行过属性注入
    pub fn is_injected(&self) -> bool {
        self.injected.load(Ordering::Acquire)
    }

    fn own_context<'a>(&self, context: &ResolveContext<'a>) -> ResolveContext<'a> {
        match self.self_ref.upgrade() {
            Some(own) => context.with_requester(own),
            None => context.clone(),
        }
    }

    fn value(&self, context: &ResolveContext<'_>) -> ComponentResult<Arc<T>> {
        let context = self.own_context(context);
        match self.lifetime {
            Lifetime::Singleton => {
                let instance = self.singleton(&context)?;
                if self.instantiation == Instantiation::OnDemand {
                    self.inject_once(&instance, &context)?;
                }
                Ok(instance)
            }
            Lifetime::Transient => {
                let instance = self.create(&context)?;
                self.inject(&instance, &context)?;
                Ok(instance)
            }
        }
    }

    fn singleton(&self, context: &ResolveContext<'_>) -> ComponentResult<Arc<T>> {
        if let Some(instance) = self.instance.get() {
            return Ok(instance.clone());
        }
        // 同一线程重入 get_or_try_init 会死锁，必须先判断
        if self.creating.lock().contains(&thread::current().id()) {
            return Err(self.self_request());
        }
        self.instance
            .get_or_try_init(|| self.create(context))
            .map(Arc::clone)
    }

    fn create(&self, context: &ResolveContext<'_>) -> ComponentResult<Arc<T>> {
        let _guard = {
            let thread = thread::current().id();
            let mut creating = self.creating.lock();
            if creating.contains(&thread) {
                return Err(self.self_request());
            }
            creating.push(thread);
            CreationGuard {
                creating: &self.creating,
                thread,
            }
        };

        debug!("实例化组件: {}", self.name);
        (self.factory)(context).map(Arc::new)
    }

    fn self_request(&self) -> ComponentError {
        ComponentError::creation_failed(&self.name, "实例化过程中再次请求了自身")
    }

    /// 单例注入只执行一次
    ///
    /// 注入期间同一线程的重入请求直接返回，其他线程等待注入结束；注入失败后允许重试。
    fn inject_once(&self, instance: &T, context: &ResolveContext<'_>) -> ComponentResult<()> {
        let state = self.injection.lock();
        if state.get() != InjectionState::Pending {
            return Ok(());
        }

        state.set(InjectionState::Running);
        let result = self.inject(instance, context);
        if result.is_ok() {
            state.set(InjectionState::Done);
            self.injected.store(true, Ordering::Release);
        } else {
            state.set(InjectionState::Pending);
        }
        result
    }

    fn inject(&self, instance: &T, context: &ResolveContext<'_>) -> ComponentResult<()> {
        match &self.injector {
            Some(injector) => {
                debug!("注入组件属性: {}", self.name);
                injector(instance, context)
            }
            None => Ok(()),
        }
    }
}

impl<T: Send + Sync + 'static> ComponentDescriptor for InstanceDescriptor<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[Capability] {
        &self.projections.capabilities
    }

    fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    fn instantiation(&self) -> Instantiation {
        self.instantiation
    }

    fn get_value(&self, context: &ResolveContext<'_>) -> ComponentResult<ComponentValue> {
        self.value(context).map(into_component_value)
    }

    fn get_value_as(
        &self,
        capability: &Capability,
        context: &ResolveContext<'_>,
    ) -> ComponentResult<Option<ComponentValue>> {
        if !self.projections.provides(capability) {
            return Ok(None);
        }
        let instance = self.value(context)?;
        Ok(self.projections.project(capability, instance))
    }

    fn inject_properties(&self, context: &ResolveContext<'_>) -> ComponentResult<()> {
        if self.lifetime == Lifetime::Transient {
            return Ok(());
        }
        let context = self.own_context(context);
        let instance = self.singleton(&context)?;
        self.inject_once(&instance, &context)
    }

    fn as_disposable(&self) -> Option<&dyn Disposable> {
        if self.teardown.is_some() && self.lifetime == Lifetime::Singleton {
            Some(self)
        } else {
            None
        }
    }
}

impl<T: Send + Sync + 'static> Disposable for InstanceDescriptor<T> {
    fn dispose(&self) -> ComponentResult<bool> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }
        let (Some(teardown), Some(instance)) = (&self.teardown, self.instance.get()) else {
            return Ok(false);
        };
        debug!("释放组件: {}", self.name);
        teardown(instance).map(|()| true)
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for InstanceDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceDescriptor")
            .field("name", &self.name)
            .field("capabilities", &self.projections.capabilities)
            .field("lifetime", &self.lifetime)
            .field("instantiation", &self.instantiation)
            .field("instantiated", &self.instance.get().is_some())
            .field("factory", &"<function>")
            .finish()
    }
}

/// 工厂描述符构建器
pub struct InstanceDescriptorBuilder<T: Send + Sync + 'static> {
    name: Option<String>,
    projections: Projections<T>,
    lifetime: Lifetime,
    instantiation: Instantiation,
    factory: Factory<T>,
    injector: Option<Injector<T>>,
    teardown: Option<Teardown<T>>,
}

impl<T: Send + Sync + 'static> InstanceDescriptorBuilder<T> {
    fn new(factory: Factory<T>) -> Self {
        Self {
            name: None,
            projections: Projections::new(),
            lifetime: Lifetime::default(),
            instantiation: Instantiation::default(),
            factory,
            injector: None,
            teardown: None,
        }
    }

    /// 设置描述符名称，默认使用实现类型的简短名称
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 声明额外提供的能力
    pub fn provides<C, F>(mut self, cast: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static,
    {
        self.projections.add::<C, F>(cast);
        self
    }

    /// 设置生命周期
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// 设置实例化策略
    pub fn instantiation(mut self, instantiation: Instantiation) -> Self {
        self.instantiation = instantiation;
        self
    }

    /// 瞬时生命周期
    pub fn transient(self) -> Self {
        self.lifetime(Lifetime::Transient)
    }

    /// 首次解析时才实例化
    pub fn on_demand(self) -> Self {
        self.instantiation(Instantiation::OnDemand)
    }

    /// 设置属性注入函数
    pub fn with_injector<F>(mut self, injector: F) -> Self
    where
        F: Fn(&T, &ResolveContext<'_>) -> ComponentResult<()> + Send + Sync + 'static,
    {
        self.injector = Some(Box::new(injector));
        self
    }

    /// 设置释放钩子
    pub fn with_teardown<F>(mut self, teardown: F) -> Self
    where
        F: Fn(&T) -> ComponentResult<()> + Send + Sync + 'static,
    {
        self.teardown = Some(Box::new(teardown));
        self
    }

    /// 构建描述符
    pub fn build(self) -> Arc<InstanceDescriptor<T>> {
        let name = self
            .name
            .unwrap_or_else(|| Capability::of::<T>().short_name().to_string());

        if self.teardown.is_some() && self.lifetime == Lifetime::Transient {
            warn!("瞬时组件 {} 不支持释放钩子，钩子将被忽略", name);
        }

        Arc::new_cyclic(|self_ref| InstanceDescriptor {
            name,
            projections: self.projections,
            lifetime: self.lifetime,
            instantiation: self.instantiation,
            factory: self.factory,
            injector: self.injector,
            teardown: self.teardown,
            instance: OnceCell::new(),
            creating: Mutex::new(Vec::new()),
            injection: ReentrantMutex::new(Cell::new(InjectionState::Pending)),
            injected: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            self_ref: self_ref.clone(),
        })
    }
}

/// 实例描述符
///
/// 包装调用方已经构建好的实例：不会被实例化，注入为空操作，也没有释放钩子。
pub struct ValueDescriptor<T: Send + Sync + 'static> {
    name: String,
    value: Arc<T>,
    projections: Projections<T>,
}

impl<T: Send + Sync + 'static> ValueDescriptor<T> {
    /// 包装实例
    pub fn new(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// 包装共享实例
    pub fn from_arc(value: Arc<T>) -> Self {
        Self {
            name: Capability::of::<T>().short_name().to_string(),
            value,
            projections: Projections::new(),
        }
    }

    /// 设置描述符名称
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 声明额外提供的能力
    pub fn provides<C, F>(mut self, cast: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<C> + Send + Sync + 'static,
    {
        self.projections.add::<C, F>(cast);
        self
    }

    pub fn value(&self) -> &Arc<T> {
        &self.value
    }
}

impl<T: Send + Sync + 'static> ComponentDescriptor for ValueDescriptor<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[Capability] {
        &self.projections.capabilities
    }

    fn get_value(&self, _context: &ResolveContext<'_>) -> ComponentResult<ComponentValue> {
        Ok(into_component_value(self.value.clone()))
    }

    fn get_value_as(
        &self,
        capability: &Capability,
        _context: &ResolveContext<'_>,
    ) -> ComponentResult<Option<ComponentValue>> {
        Ok(self.projections.project(capability, self.value.clone()))
    }

    fn inject_properties(&self, _context: &ResolveContext<'_>) -> ComponentResult<()> {
        Ok(())
    }
}
