//! # 依赖注入具体实现
//! 
//! 提供组件存储（容器本体）、能力注册表、依赖图与拓扑排序，以及常用的描述符实现。
//!
//! ## 基本使用
//!
//! ```rust
//! use di_abstractions::{ComponentContainer, ComponentDescriptor, ResolveContext};
//! use di_impl::{ComponentStorage, InstanceDescriptor};
//! use std::sync::Arc;
//!
//! struct Clock;
//!
//! let storage = ComponentStorage::new("app");
//! let context = ResolveContext::new(&storage);
//! let clock: Arc<dyn ComponentDescriptor> = InstanceDescriptor::builder(|_| Ok(Clock)).build();
//!
//! storage.register_descriptors(&context, vec![clock]).unwrap();
//! storage.compose(&context).unwrap();
//! assert!(context.get::<Clock>().unwrap().is_some());
//! storage.dispose().unwrap();
//! ```

pub mod descriptors;
pub mod graph;
pub mod registry;
pub mod storage;

pub use descriptors::{InstanceDescriptor, InstanceDescriptorBuilder, ValueDescriptor};
pub use graph::{topological_sort, DependencyGraph, TopologicalOrder};
pub use registry::{ComponentRegistry, SingleEntry};
pub use storage::ComponentStorage;
