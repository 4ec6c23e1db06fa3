//! # Infrastructure Common
//!
//! 组件容器的公共类型定义。
//!
//! ## 核心类型
//!
//! - [`Capability`] - 能力标识，解析请求的基本单位
//! - [`Lifetime`] / [`Instantiation`] - 描述符的生命周期与实例化策略
//! - [`ComponentStorageState`] - 容器生命周期状态机
//! - [`ContainerError`] / [`ComponentError`] - 容器与组件错误
//! - [`ContainerConfig`] - 容器配置
//!
//! ## 设计原则
//!
//! - 不存在进程级全局状态，每个容器实例都显式传递
//! - 能力匹配只比较类型标识，不做部分匹配

pub mod configuration;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
