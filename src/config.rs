use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult, ConfigError};
use crate::models::{ModelSize, PreparationConfig};

/// 未指定时尝试读取的配置文件
pub const DEFAULT_CONFIG_FILE: &str = "form_prep.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 表单处理服务地址
    pub api_base_url: String,
    /// 轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 允许连续轮询失败的次数，0 表示首次失败即判定任务失败
    pub max_poll_failures: u32,
    /// 单个请求超时（秒），0 表示不限制
    pub request_timeout_secs: u64,
    /// 结果文件输出目录
    pub output_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 默认处理参数
    pub preparation: PreparationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            poll_interval_ms: 1500,
            max_poll_failures: 0,
            request_timeout_secs: 120,
            output_dir: "output".to_string(),
            verbose_logging: false,
            output_log_file: "form_prep.log".to_string(),
            preparation: PreparationConfig::default(),
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件 → 环境变量
    ///
    /// 未显式指定路径时，当前目录下存在 `form_prep.toml` 才会读取
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_toml_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// 从 TOML 文件读取，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str, origin: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|source| {
            ConfigError::TomlParseFailed {
                path: origin.to_string(),
                source,
            }
            .into()
        })
    }

    /// 使用环境变量覆盖配置
    pub fn apply_env(&mut self) -> AppResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// 使用任意键值来源覆盖配置（便于测试）
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        if let Some(v) = lookup("FORM_PREP_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = parse_var(&lookup, "FORM_PREP_POLL_INTERVAL_MS", "u64")? {
            self.poll_interval_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "FORM_PREP_MAX_POLL_FAILURES", "u32")? {
            self.max_poll_failures = v;
        }
        if let Some(v) = parse_var(&lookup, "FORM_PREP_REQUEST_TIMEOUT_SECS", "u64")? {
            self.request_timeout_secs = v;
        }
        if let Some(v) = lookup("FORM_PREP_OUTPUT_DIR") {
            self.output_dir = v;
        }
        if let Some(v) = parse_var(&lookup, "FORM_PREP_VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = v;
        }
        if let Some(v) = lookup("FORM_PREP_LOG_FILE") {
            self.output_log_file = v;
        }
        if let Some(v) = parse_var::<ModelSize, _>(&lookup, "FORM_PREP_MODEL", "small|large")? {
            self.preparation.model = v;
        }
        if let Some(v) = parse_var(&lookup, "FORM_PREP_SENSITIVITY", "u8")? {
            self.preparation.sensitivity = v;
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

fn parse_var<T: FromStr, F: Fn(&str) -> Option<String>>(
    lookup: &F,
    var_name: &str,
    expected_type: &str,
) -> AppResult<Option<T>> {
    match lookup(var_name) {
        None => Ok(None),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }
            .into()),
        },
    }
}
