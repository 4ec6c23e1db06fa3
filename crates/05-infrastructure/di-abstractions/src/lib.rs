//! # Dependency Injection Abstractions
//! 
//! 依赖注入抽象层，定义组件描述符、依赖解析和容器生命周期的核心接口。
//! 
//! ## 核心接口
//! 
//! - [`ComponentDescriptor`] - 组件描述符接口
//! - [`Disposable`] - 可选的释放能力
//! - [`ValueResolver`] - 依赖解析接口
//! - [`ResolveContext`] - 解析上下文，标识"谁在请求"
//! - [`ComponentContainer`] - 容器生命周期接口

pub mod container;
pub mod descriptor;
pub mod resolver;

pub use container::*;
pub use descriptor::*;
pub use resolver::*;
