//! # 容器组合层
//!
//! 负责把配置、日志和描述符组合成一个可用的组件容器。
//!
//! ## 主要功能
//!
//! - **容器构建器**: 使用构建者模式收集配置源和描述符
//! - **类型化门面**: 按能力类型获取组件实例
//! - **生命周期管理**: 构建时完成组合，结束时按依赖顺序释放
//!
//! ## 基本使用
//!
//! ```rust
//! use di_impl::InstanceDescriptor;
//! use infrastructure_composition::ContainerBuilder;
//!
//! struct Clock;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let container = ContainerBuilder::new()
//!         .with_id("app")
//!         .register(InstanceDescriptor::builder(|_| Ok(Clock)).build())
//!         .build()?;
//!
//!     let _clock = container.require::<Clock>()?;
//!
//!     container.dispose()?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod container;

// 重新导出主要类型
pub use builder::{ContainerBuilder, LoggingConfig};
pub use container::StorageComponentContainer;

// 重新导出错误类型
pub use infrastructure_common::{ContainerError, ContainerResult};
