//! 能力标识
//!
//! 解析请求以能力为单位。能力由类型标识确定，只做精确匹配。

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 能力标识
///
/// 既可以是具体类型 (`Capability::of::<ConsoleLogger>()`)，
/// 也可以是 trait 对象 (`Capability::of::<dyn Logger>()`)。
#[derive(Clone, Copy)]
pub struct Capability {
    /// 类型ID
    id: TypeId,
    /// 完整类型名称
    name: &'static str,
}

impl Capability {
    /// 从类型获取能力标识
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// 类型ID
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// 完整类型名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        let base = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        let base = base
            .split(|c: char| c == '<' || c == ' ')
            .next()
            .unwrap_or(base);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({})", self.name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
