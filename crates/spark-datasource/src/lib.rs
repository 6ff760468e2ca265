#![deny(unsafe_code)]

//! spark-datasource: 可链式组合的数据源 Pipeline 基础契约。
//!
//! 每个阶段至多包装一个上游阶段；除非阶段显式覆写，所有查询与变更都透明地转交上游。
//! 同类型阶段共享同一个控制器（DCI），链路沿途的订阅者可以通过消息总线广播交互。
//!
//! ## 模块导航
//! - [`source`]：转发契约 [`DataSource`]。
//! - [`stage`]：链路节点 [`Stage`]、构造器 [`StageBuilder`] 与向上游遍历的 [`Lineage`]。
//! - [`controller`]：控制器、共享插槽与工厂。
//! - [`bus`]：发布/订阅契约 [`MessageBus`] 与进程内实现 [`LocalBus`]。
//! - [`local`]：承载数据的链头 [`LocalSource`]。
//! - [`pipeline`]：整条链路的容器 [`Pipeline`]。
//! - [`dump`]：调试转储。
//! - [`config`] 与 [`observability`]：配置加载与日志安装。
//!
//! ```
//! use std::sync::Arc;
//!
//! use spark_datasource::{DataSource, LocalSource, Pipeline, Schema, Stage};
//!
//! let mut row = serde_json::Map::new();
//! row.insert("name".into(), "apple".into());
//! let head = LocalSource::with_data(vec![row], Some(Schema::from_names(["name"])));
//!
//! let pipeline = Pipeline::new(Arc::new(head))
//!     .then(|upstream| Stage::builder().stage_type("filter").upstream(upstream).build());
//!
//! assert_eq!(pipeline.tail().get_value(0, 0), Some("apple".into()));
//! assert!(pipeline.get_controller("filter").is_some());
//! assert!(pipeline.tail().apply().is_err());
//! ```

pub mod bus;
pub mod config;
pub mod controller;
pub mod dump;
pub mod error;
pub mod local;
pub mod observability;
pub mod pipeline;
pub mod properties;
pub mod schema;
pub mod source;
pub mod stage;

pub use bus::{LocalBus, MessageBus, StageId, Subscriber, SubscriptionId};
pub use config::{ConfigError, DataSourceConfig, DrillDownChars};
pub use controller::{
    Controller, ControllerFactory, ControllerSlot, EmptyController, EmptyControllerFactory,
    SharedController, StageType,
};
pub use dump::DumpTable;
pub use error::{DataSourceError, ErrorKind, Result};
pub use local::LocalSource;
pub use observability::{TelemetryError, install_fmt_subscriber};
pub use pipeline::Pipeline;
pub use properties::PropertyTable;
pub use schema::{ColumnInfo, ColumnRef, ColumnSchema, FoundRow, Row, Schema, Value};
pub use source::DataSource;
pub use stage::{Lineage, Stage, StageBuilder};
