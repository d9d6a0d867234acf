use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// 灵敏度下限
pub const MIN_SENSITIVITY: u8 = 1;
/// 灵敏度上限（服务端对应 5 档置信度阈值）
pub const MAX_SENSITIVITY: u8 = 5;

/// 字段检测模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Small,
    Large,
}

impl ModelSize {
    /// 线上协议使用的名称
    pub fn as_str(self) -> &'static str {
        match self {
            ModelSize::Small => "small",
            ModelSize::Large => "large",
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" | "s" => Ok(ModelSize::Small),
            "large" | "l" => Ok(ModelSize::Large),
            other => Err(format!("未知模型: {}", other)),
        }
    }
}

/// 任务处理参数
///
/// 每次提交都会复制一份到 `Job` 中
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreparationConfig {
    pub model: ModelSize,
    pub sensitivity: u8,
    pub use_signature_fields: bool,
    pub keep_existing_fields: bool,
}

impl Default for PreparationConfig {
    fn default() -> Self {
        Self {
            model: ModelSize::Small,
            sensitivity: 3,
            use_signature_fields: false,
            keep_existing_fields: false,
        }
    }
}

impl PreparationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&self.sensitivity) {
            return Err(ValidationError::SensitivityOutOfRange {
                value: self.sensitivity,
                min: MIN_SENSITIVITY,
                max: MAX_SENSITIVITY,
            });
        }
        Ok(())
    }
}
