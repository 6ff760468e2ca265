use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::properties::{DRILL_DOWN_CHAR_MAP, PropertyTable, REPLACE_INDENT};

/// `replaceIndent` 的默认取值。
pub const DEFAULT_REPLACE_INDENT: &str = "_";

/// 未设置 `RUST_LOG` 时的默认过滤指令。
pub const DEFAULT_LOG_FILTER: &str = "info";

/// 配置加载失败。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML 语法或字段类型错误。
    #[error("failed to parse data source configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// 字段取值不满足约束。
    #[error("invalid configuration field `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// 展开、折叠与叶子节点的标记字符。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrillDownChars {
    pub open: String,
    pub close: String,
    pub leaf: String,
}

impl Default for DrillDownChars {
    fn default() -> Self {
        Self {
            open: "\u{25bc}".to_owned(),
            close: "\u{25b6}".to_owned(),
            leaf: String::new(),
        }
    }
}

/// 数据源 Pipeline 的可调参数。
///
/// # 契约说明（What）
/// - 所有字段都有默认值，TOML 中缺省的字段沿用 [`Default`]。
/// - `replace_indent` 与 `drill_down_chars` 通过 [`default_properties`](Self::default_properties)
///   进入每个阶段的本地属性表，可被单个阶段再次覆盖。
/// - `log_filter` 仅在环境变量 `RUST_LOG` 缺失时生效。
///
/// ```
/// use spark_datasource::DataSourceConfig;
///
/// let config = DataSourceConfig::from_toml_str(r#"replace_indent = ".""#).unwrap();
/// assert_eq!(config.replace_indent, ".");
/// assert_eq!(config.log_filter, "info");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    pub replace_indent: String,
    pub drill_down_chars: DrillDownChars,
    pub log_filter: String,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            replace_indent: DEFAULT_REPLACE_INDENT.to_owned(),
            drill_down_chars: DrillDownChars::default(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

impl DataSourceConfig {
    /// 解析并校验 TOML 文本。
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验字段约束。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replace_indent.is_empty() {
            return Err(ConfigError::Invalid {
                field: "replace_indent",
                reason: "must contain at least one character",
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "log_filter",
                reason: "must not be blank",
            });
        }
        Ok(())
    }

    /// 由配置生成阶段的默认本地属性。
    pub fn default_properties(&self) -> PropertyTable {
        PropertyTable::new()
            .with(REPLACE_INDENT, json!(self.replace_indent))
            .with(
                DRILL_DOWN_CHAR_MAP,
                json!({
                    "OPEN": self.drill_down_chars.open,
                    "CLOSE": self.drill_down_chars.close,
                    "undefined": self.drill_down_chars.leaf,
                }),
            )
    }
}
