//! 错误类型定义

use crate::lifecycle::ComponentStorageState;
use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 容器错误类型
///
/// 生命周期误用（一致性错误）与歧义绑定都表示装配代码存在缺陷，
/// 不应作为控制流捕获处理。
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("容器 {container_id} 尚未组合，无法解析 {capability}（当前状态: {state}）")]
    NotComposed {
        container_id: String,
        capability: String,
        state: ComponentStorageState,
    },

    #[error("容器 {container_id} 已释放，无法解析 {capability}（当前状态: {state}）")]
    AlreadyDisposed {
        container_id: String,
        capability: String,
        state: ComponentStorageState,
    },

    #[error("容器 {container_id} 已经组合过（当前状态: {state}）")]
    AlreadyComposed {
        container_id: String,
        state: ComponentStorageState,
    },

    #[error("容器 {container_id} 在 {state} 状态下不能注册描述符")]
    RegistrationRejected {
        container_id: String,
        state: ComponentStorageState,
    },

    #[error("容器 {container_id} 不能在 {state} 状态下释放")]
    InvalidDisposeState {
        container_id: String,
        state: ComponentStorageState,
    },

    #[error("能力 {capability} 存在多个绑定 {candidates:?}，无法确定唯一组件（当前状态: {state}）")]
    AmbiguousBinding {
        capability: String,
        candidates: Vec<String>,
        state: ComponentStorageState,
    },

    #[error("未找到能力 {capability} 的绑定")]
    Unresolved { capability: String },

    #[error("检测到循环依赖: {capability}, 依赖链: {dependency_chain}")]
    CircularDependency {
        capability: String,
        dependency_chain: String,
    },

    #[error("组件 {descriptor} 执行失败: {source}")]
    Component {
        descriptor: String,
        #[source]
        source: ComponentError,
    },

    #[error("容器 {container_id} 释放时 {} 个组件失败", .failures.len())]
    DisposeFailed {
        container_id: String,
        failures: Vec<TeardownFailure>,
    },

    #[error("类型转换失败: 描述符 {descriptor} 不能作为 {expected} 提供")]
    TypeMismatch { expected: String, descriptor: String },

    #[error("容器启动失败: {message}")]
    BootstrapFailed { message: String },

    #[error("配置错误: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}

impl ContainerError {
    /// 是否为生命周期状态机误用导致的一致性错误
    pub fn is_consistency_error(&self) -> bool {
        matches!(
            self,
            Self::NotComposed { .. }
                | Self::AlreadyDisposed { .. }
                | Self::AlreadyComposed { .. }
                | Self::RegistrationRejected { .. }
                | Self::InvalidDisposeState { .. }
        )
    }

    /// 是否为歧义绑定错误
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::AmbiguousBinding { .. })
    }

    /// 包装描述符层面的失败
    pub fn component(descriptor: impl Into<String>, source: ComponentError) -> Self {
        Self::Component {
            descriptor: descriptor.into(),
            source,
        }
    }
}

/// 单个组件的释放失败记录
#[derive(Debug)]
pub struct TeardownFailure {
    /// 描述符名称
    pub descriptor: String,
    /// 失败原因
    pub source: ComponentError,
}

/// 组件错误类型
///
/// 描述符生产实例、注入属性或释放资源时产生的错误，对容器不透明。
#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("组件创建失败: {type_name}, 原因: {message}")]
    CreationFailed { type_name: String, message: String },

    #[error("组件释放失败: {type_name}, 原因: {message}")]
    TeardownFailed { type_name: String, message: String },

    #[error("依赖解析失败: {source}")]
    Resolution {
        #[source]
        source: Box<ContainerError>,
    },
}

impl ComponentError {
    /// 创建实例化错误
    pub fn creation_failed(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// 创建释放错误
    pub fn teardown_failed(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TeardownFailed {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

impl From<ContainerError> for ComponentError {
    fn from(source: ContainerError) -> Self {
        Self::Resolution {
            source: Box::new(source),
        }
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type ContainerResult<T> = Result<T, ContainerError>;
pub type ComponentResult<T> = Result<T, ComponentError>;
