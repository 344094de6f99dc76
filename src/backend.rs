//! 下位ロガー抽象モジュール
//!
//! ファサードは`LogBackend`トレイト越しに構造化ロガーへ書き込む。
//! 標準の実装は`TracingBackend`、テストや組み込み用途には`MemoryBackend`を使う。

use crate::config::StreamDescriptor;
use crate::error::LogError;
use crate::severity::Severity;
use serde_json::Value;

/// 下位ロガーの生成オプション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerOptions {
    /// ロガー名（`<product>-<product_version>`）
    pub name: String,
    /// 出力ストリーム
    pub streams: Vec<StreamDescriptor>,
}

/// レコードに付与するコンテキスト
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    pub instance_id: &'a str,
    pub datum: &'a Value,
}

/// 構造化ロガー
///
/// 実装は複数スレッドから同時に書き込まれても安全でなければならない。
pub trait LogBackend: Send + Sync {
    /// ロガー名
    fn name(&self) -> &str;

    /// 指定レベルで1レコード書き込む
    fn log(&self, severity: Severity, context: &RecordContext<'_>, message: &str);

    fn trace(&self, context: &RecordContext<'_>, message: &str) {
        self.log(Severity::Trace, context, message);
    }

    fn debug(&self, context: &RecordContext<'_>, message: &str) {
        self.log(Severity::Debug, context, message);
    }

    fn info(&self, context: &RecordContext<'_>, message: &str) {
        self.log(Severity::Info, context, message);
    }

    fn warn(&self, context: &RecordContext<'_>, message: &str) {
        self.log(Severity::Warn, context, message);
    }

    fn error(&self, context: &RecordContext<'_>, message: &str) {
        self.log(Severity::Error, context, message);
    }

    fn fatal(&self, context: &RecordContext<'_>, message: &str) {
        self.log(Severity::Fatal, context, message);
    }
}

/// 下位ロガーの生成関数
pub type BackendFactory =
    Box<dyn Fn(&LoggerOptions) -> Result<Box<dyn LogBackend>, LogError> + Send + Sync>;
