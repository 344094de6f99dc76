//! Fable Log - インスタンスID付きレベル別ロギングファサード
//!
//! `LogFacade`を作成して`initialize`を呼ぶと、設定に従って下位ロガーを構築し、
//! 以降の書き込みすべてにプロセス単位のインスタンスIDを付与する。
//!
//! ```no_run
//! use fable_log::LogFacade;
//! use serde_json::json;
//!
//! let mut log = LogFacade::new();
//! log.initialize(Some("log.toml"))?;
//! log.log_info(Some("started"), Some(json!({ "port": 8080 })));
//! # Ok::<(), fable_log::LogError>(())
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod facade;
pub mod flake;
pub mod memory;
pub mod severity;
pub mod tracing_backend;

pub use backend::{BackendFactory, LogBackend, LoggerOptions, RecordContext};
pub use config::{Parameters, StreamDescriptor, StreamFormat, StreamTarget, UuidSettings};
pub use error::{ConfigError, IdError, LogError};
pub use facade::{LogFacade, NO_MESSAGE};
pub use memory::{LogRecord, MemoryBackend};
pub use severity::Severity;
pub use tracing_backend::TracingBackend;
