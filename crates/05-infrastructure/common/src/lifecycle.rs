//! 组件生命周期管理

use serde::Deserialize;
use std::fmt;

/// 组件生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// 单例模式 - 容器内所有解析共享同一个实例
    #[default]
    Singleton,
    /// 瞬时模式 - 每次解析都创建新实例
    Transient,
}

/// 组件实例化策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instantiation {
    /// 随容器组合时立即实例化
    #[default]
    WithEnvironment,
    /// 首次解析时才实例化
    OnDemand,
}

/// 组件容器生命周期状态
///
/// 状态只能单向推进: `Initial → Initialized → Disposing → Disposed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentStorageState {
    /// 已创建，尚未组合
    #[default]
    Initial,
    /// 已组合，可以解析
    Initialized,
    /// 正在释放
    Disposing,
    /// 已释放
    Disposed,
}

impl ComponentStorageState {
    /// 是否允许注册新的描述符
    pub fn accepts_registration(self) -> bool {
        matches!(self, Self::Initial | Self::Initialized)
    }

    /// 是否允许解析
    pub fn accepts_resolution(self) -> bool {
        matches!(self, Self::Initialized | Self::Disposing)
    }
}

impl fmt::Display for ComponentStorageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "Initial",
            Self::Initialized => "Initialized",
            Self::Disposing => "Disposing",
            Self::Disposed => "Disposed",
        };
        f.write_str(name)
    }
}
