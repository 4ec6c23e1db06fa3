//! 容器构建器

use crate::container::StorageComponentContainer;
use di_abstractions::{ComponentContainer, ComponentDescriptor, ResolveContext};
use di_impl::ComponentStorage;
use infrastructure_common::{ContainerConfig, ContainerError, ContainerResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// 容器构建器
///
/// 使用建造者模式收集配置和描述符，`build` 时注册全部描述符并完成组合。
pub struct ContainerBuilder {
    /// 容器标识，未设置时使用随机 UUID
    id: Option<String>,
    /// 显式设置的配置，作为文件和环境变量之外的基础值
    config: ContainerConfig,
    /// TOML 配置文件列表
    config_files: Vec<PathBuf>,
    /// 环境变量前缀
    env_prefix: Option<String>,
    /// 待注册的描述符
    descriptors: Vec<Arc<dyn ComponentDescriptor>>,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl ContainerBuilder {
    /// 创建新的容器构建器
    pub fn new() -> Self {
        Self {
            id: None,
            config: ContainerConfig::default(),
            config_files: Vec::new(),
            env_prefix: None,
            descriptors: Vec::new(),
            logging_enabled: false, // 默认不初始化日志
            logging_config: LoggingConfig::default(),
        }
    }

    /// 设置容器标识
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 设置容器配置
    ///
    /// 配置文件和环境变量配置源在此基础上叠加，来源中没有出现的键保留这里的值。
    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// 添加 TOML 配置文件
    pub fn add_config_toml<P: AsRef<Path>>(mut self, path: P) -> ContainerResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ContainerError::BootstrapFailed {
                message: format!("配置文件不存在: {}", path.display()),
            });
        }

        info!("添加 TOML 配置文件: {}", path.display());
        self.config_files.push(path.to_path_buf());
        Ok(self)
    }

    /// 添加环境变量配置源
    pub fn add_config_env(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        info!("添加环境变量配置源，前缀: {}", prefix);
        self.env_prefix = Some(prefix);
        self
    }

    /// 添加默认前缀 `CONTAINER` 的环境变量配置源
    pub fn add_default_config_env(self) -> Self {
        self.add_config_env(ContainerConfig::ENV_PREFIX)
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true;
        self
    }

    /// 添加描述符
    pub fn register<D: ComponentDescriptor + 'static>(mut self, descriptor: Arc<D>) -> Self {
        debug!("添加描述符: {}", descriptor.name());
        self.descriptors.push(descriptor);
        self
    }

    /// 添加类型已擦除的描述符
    pub fn register_descriptor(mut self, descriptor: Arc<dyn ComponentDescriptor>) -> Self {
        debug!("添加描述符: {}", descriptor.name());
        self.descriptors.push(descriptor);
        self
    }

    /// 构建容器：加载配置，注册全部描述符并组合
    pub fn build(self) -> ContainerResult<StorageComponentContainer> {
        // 只有在明确配置了日志时才初始化日志，避免在测试中重复初始化
        if self.logging_enabled {
            self.logging_config.initialize()?;
        }

        let config = self.resolve_config()?;
        let id = self
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        info!("开始构建容器: {}", id);
        debug!("容器配置: {:?}", config);

        let storage = Arc::new(ComponentStorage::with_config(id, config));
        {
            let context = ResolveContext::new(storage.as_resolver());
            storage.register_descriptors(&context, self.descriptors)?;
            storage.compose(&context)?;
        }

        info!("容器构建完成: {}", storage.id());
        Ok(StorageComponentContainer::new(storage))
    }

    fn resolve_config(&self) -> ContainerResult<ContainerConfig> {
        if self.config_files.is_empty() && self.env_prefix.is_none() {
            return Ok(self.config.clone());
        }
        Ok(self
            .config
            .layered(&self.config_files, self.env_prefix.as_deref())?)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            ..Self::default()
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            show_target: false,
            json_format: true,
            ..Self::default()
        }
    }

    /// 初始化全局日志订阅者
    ///
    /// `RUST_LOG` 存在时优先使用其中的过滤规则。
    pub fn initialize(&self) -> ContainerResult<()> {
        let filter = tracing_subscriber::EnvFilter::builder()
            .with_default_directive(tracing::level_filters::LevelFilter::from_level(self.level).into())
            .from_env_lossy();

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_file(self.show_file)
            .with_line_number(self.show_line_number);

        if self.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        }
        .map_err(|e| ContainerError::BootstrapFailed {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成");
        Ok(())
    }
}
