//! 容器配置
//!
//! 配置按顺序从 TOML 文件和环境变量加载，后加载的来源覆盖先加载的来源。

use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// 循环依赖处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// 允许循环，释放时按注册顺序确定性地打破循环
    #[default]
    Tolerate,
    /// 记录依赖时检测循环，闭合循环的解析请求直接失败
    Reject,
}

/// 释放失败处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposalPolicy {
    /// 继续释放剩余组件，最后汇总所有失败
    #[default]
    ContinueOnError,
    /// 遇到第一个失败即停止调用剩余的释放钩子
    FailFast,
}

impl CyclePolicy {
    /// 配置文件中使用的名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tolerate => "tolerate",
            Self::Reject => "reject",
        }
    }
}

impl DisposalPolicy {
    /// 配置文件中使用的名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContinueOnError => "continue_on_error",
            Self::FailFast => "fail_fast",
        }
    }
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 循环依赖处理策略
    pub cycle_policy: CyclePolicy,
    /// 释放失败处理策略
    pub disposal_policy: DisposalPolicy,
    /// 是否以 debug 级别记录每次解析
    pub trace_resolution: bool,
}

impl ContainerConfig {
    /// 默认环境变量前缀
    pub const ENV_PREFIX: &'static str = "CONTAINER";

    /// 设置循环依赖处理策略
    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    /// 设置释放失败处理策略
    pub fn with_disposal_policy(mut self, policy: DisposalPolicy) -> Self {
        self.disposal_policy = policy;
        self
    }

    /// 设置是否跟踪解析
    pub fn with_trace_resolution(mut self, enabled: bool) -> Self {
        self.trace_resolution = enabled;
        self
    }

    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 环境变量形如 `{PREFIX}_CYCLE_POLICY=reject`，嵌套键使用 `__` 分隔。
    pub fn load<P: AsRef<Path>>(files: &[P], env_prefix: Option<&str>) -> ConfigResult<Self> {
        Self::default().layered(files, env_prefix)
    }

    /// 以当前配置为默认值，叠加 TOML 文件和环境变量
    ///
    /// 来源中没有出现的键保留当前值。
    pub fn layered<P: AsRef<Path>>(&self, files: &[P], env_prefix: Option<&str>) -> ConfigResult<Self> {
        let mut builder = config::Config::builder()
            .set_default("cycle_policy", self.cycle_policy.as_str())
            .and_then(|b| b.set_default("disposal_policy", self.disposal_policy.as_str()))
            .and_then(|b| b.set_default("trace_resolution", self.trace_resolution))
            .map_err(|e| ConfigError::ParseError {
                source: Box::new(e),
            })?;

        for path in files {
            let path = path.as_ref();
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!("添加容器配置文件: {}", path.display());
            builder = builder.add_source(
                config::File::from(path.to_path_buf()).format(config::FileFormat::Toml),
            );
        }

        if let Some(prefix) = env_prefix {
            debug!("添加容器环境变量配置源，前缀: {}", prefix);
            builder = builder.add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let settings = builder.build().map_err(|e| {
            error!("容器配置构建失败: {}", e);
            ConfigError::ParseError {
                source: Box::new(e),
            }
        })?;

        settings.try_deserialize().map_err(|e| {
            error!("容器配置绑定失败: {}", e);
            ConfigError::ParseError {
                source: Box::new(e),
            }
        })
    }

    /// 只从一个 TOML 文件加载配置
    pub fn from_toml_file(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        Self::load(&[path.into()], None)
    }
}
