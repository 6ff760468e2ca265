//! 日志安装入口。
//!
//! 库内部只通过 `tracing` 宏发出事件；是否输出、输出到哪里由宿主决定。未使用其他日志框架的宿主可以调用
//! [`install_fmt_subscriber`] 获得一个基于 `fmt` 层与 `EnvFilter` 的全局 Subscriber。

use thiserror::Error;
use tracing::dispatcher::{self, SetGlobalDefaultError};
use tracing_subscriber::{EnvFilter, filter::ParseError, layer::SubscriberExt};

use crate::config::DataSourceConfig;

/// 安装全局 Subscriber 失败。
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// 宿主已设置全局 Subscriber，本库不覆盖。
    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,
    /// 配置中的过滤指令无法解析。
    #[error("invalid log filter `{directive}`")]
    InvalidFilter {
        directive: String,
        #[source]
        source: ParseError,
    },
    /// 设置全局 Subscriber 的底层错误。
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobal(#[from] SetGlobalDefaultError),
}

/// 安装 `fmt + EnvFilter` 全局 Subscriber。
///
/// # 契约说明（What）
/// - 过滤指令优先取环境变量 `RUST_LOG`，缺失或无法解析时使用 `config.log_filter`。
/// - 调用前已存在全局 Subscriber 时返回 [`TelemetryError::SubscriberAlreadySet`]，不做任何修改。
pub fn install_fmt_subscriber(config: &DataSourceConfig) -> Result<(), TelemetryError> {
    if dispatcher::has_been_set() {
        return Err(TelemetryError::SubscriberAlreadySet);
    }

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter(&config.log_filter)?)
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;
    tracing::debug!(filter = %config.log_filter, "tracing subscriber installed");
    Ok(())
}

/// 由环境变量或给定的回退指令构造过滤器。
pub fn build_env_filter(fallback: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(fallback).map_err(|source| TelemetryError::InvalidFilter {
            directive: fallback.to_owned(),
            source,
        }),
    }
}
