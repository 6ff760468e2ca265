use std::borrow::Cow;

use thiserror::Error;

/// 稳定错误码集合，遵循 `<域>.<语义>` 命名约定。
pub mod codes {
    /// 当前阶段没有可执行的变换。
    pub const NOTHING_TO_APPLY: &str = "datasource.nothing_to_apply";
}

/// `apply` 默认失败时携带的消息。
pub const NOTHING_TO_APPLY_MESSAGE: &str = "Nothing to apply.";

/// 错误类别，供调用方在不解析消息的前提下区分“操作不适用”类失败。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 阶段未配置任何变换，`apply` 无事可做。
    NothingToApply,
}

/// 数据源 Pipeline 唯一的错误域。
///
/// # 契约说明（What）
/// - 仅由默认的 [`DataSource::apply`](crate::DataSource::apply) 抛出；其余转发操作在缺少上游时返回 `None`，
///   不视为失败。
/// - 上游阶段返回的错误原样透传，本层不做包装或翻译。
/// - [`name`](Self::name) 固定为 `"DataSourceError"`，与通用错误区分；[`kind`](Self::kind) 提供机读类别。
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DataSourceError {
    /// 当前阶段没有任何变换可执行。
    #[error("{message}")]
    NothingToApply { message: Cow<'static, str> },
}

impl DataSourceError {
    /// 以默认消息构造 `NothingToApply`。
    pub fn nothing_to_apply() -> Self {
        Self::NothingToApply {
            message: Cow::Borrowed(NOTHING_TO_APPLY_MESSAGE),
        }
    }

    /// 以自定义消息构造 `NothingToApply`，供覆写 `apply` 的阶段给出更具体的说明。
    pub fn nothing_to_apply_with(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NothingToApply {
            message: message.into(),
        }
    }

    /// 错误名称，对应控制台与日志中展示的类型名。
    pub fn name(&self) -> &'static str {
        "DataSourceError"
    }

    /// 人类可读描述。
    pub fn message(&self) -> &str {
        match self {
            Self::NothingToApply { message } => message,
        }
    }

    /// 错误类别。
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NothingToApply { .. } => ErrorKind::NothingToApply,
        }
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::NothingToApply { .. } => codes::NOTHING_TO_APPLY,
        }
    }
}

/// 便捷别名，默认错误类型为 [`DataSourceError`]。
pub type Result<T, E = DataSourceError> = std::result::Result<T, E>;
