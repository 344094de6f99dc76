//! tracingを下位ロガーとするバックエンド
//!
//! ファサードごとに専用の`Dispatch`を持ち、グローバルなsubscriberは設定しない。
//! ストリーム定義1件につき`fmt`レイヤーを1つ作り、レベルフィルタをレイヤー単位で掛ける。

use crate::backend::{BackendFactory, LogBackend, LoggerOptions, RecordContext};
use crate::config::{StreamDescriptor, StreamFormat, StreamTarget};
use crate::error::LogError;
use crate::severity::Severity;

use std::fs::OpenOptions;
use std::sync::Arc;
use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// tracingバックエンド
pub struct TracingBackend {
    name: String,
    dispatch: Dispatch,
}

impl TracingBackend {
    /// ストリーム定義からロガーを構築
    ///
    /// ファイルストリームは追記モードで開く（存在しなければ作成）
    pub fn build(options: &LoggerOptions) -> Result<Self, LogError> {
        let layers = options
            .streams
            .iter()
            .map(stream_layer)
            .collect::<Result<Vec<_>, _>>()?;

        let subscriber = tracing_subscriber::registry().with(layers);

        Ok(Self {
            name: options.name.clone(),
            dispatch: Dispatch::new(subscriber),
        })
    }

    /// ファサード用の生成関数
    pub fn factory() -> BackendFactory {
        Box::new(
            |options: &LoggerOptions| -> Result<Box<dyn LogBackend>, LogError> {
                Ok(Box::new(Self::build(options)?))
            },
        )
    }
}

impl std::fmt::Debug for TracingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingBackend")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl LogBackend for TracingBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, severity: Severity, context: &RecordContext<'_>, message: &str) {
        let logger = self.name.as_str();
        let instance_id = context.instance_id;
        let datum = context.datum.to_string();
        let severity_name = severity.as_str();

        macro_rules! emit {
            ($level:expr) => {
                tracing::event!(
                    $level,
                    logger = %logger,
                    instance_id = %instance_id,
                    datum = %datum,
                    severity = severity_name,
                    "{}",
                    message
                )
            };
        }

        tracing::dispatcher::with_default(&self.dispatch, || match severity {
            Severity::Trace => emit!(Level::TRACE),
            Severity::Debug => emit!(Level::DEBUG),
            Severity::Info => emit!(Level::INFO),
            Severity::Warn => emit!(Level::WARN),
            // FATALはERRORレベルで出力し、severityフィールドで区別する
            Severity::Error | Severity::Fatal => emit!(Level::ERROR),
        });
    }
}

fn stream_layer(stream: &StreamDescriptor) -> Result<BoxedLayer, LogError> {
    let layer = match stream.target {
        StreamTarget::Stdout => format_layer(stream.format, std::io::stdout, true),
        StreamTarget::Stderr => format_layer(stream.format, std::io::stderr, true),
        StreamTarget::File => {
            let path = stream.path.clone().unwrap_or_default();
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| LogError::Stream { path, source })?;
            // ファイルにANSIカラーは不要
            format_layer(stream.format, Arc::new(file), false)
        }
    };

    Ok(layer.with_filter(stream.level.level_filter()).boxed())
}

fn format_layer<W>(format: StreamFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
    match format {
        StreamFormat::Json => layer.json().boxed(),
        StreamFormat::Text => layer.boxed(),
    }
}
