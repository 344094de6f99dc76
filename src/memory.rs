//! メモリ上にレコードを保持するバックエンド

use crate::backend::{BackendFactory, LogBackend, LoggerOptions, RecordContext};
use crate::error::LogError;
use crate::severity::Severity;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

/// 書き込まれた1レコード
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub name: String,
    pub severity: Severity,
    pub instance_id: String,
    pub datum: Value,
    pub message: String,
}

/// メモリバックエンド
///
/// クローンはレコードバッファを共有する。ストリーム定義のうち最も低いレベル未満の
/// レコードは捨てる（ストリーム定義が無い場合はすべて保持）。
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    name: String,
    min_level: Severity,
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryBackend {
    /// 新しいMemoryBackendを作成
    pub fn new(options: &LoggerOptions) -> Self {
        Self::with_buffer(options, Arc::default())
    }

    fn with_buffer(options: &LoggerOptions, records: Arc<Mutex<Vec<LogRecord>>>) -> Self {
        let min_level = options
            .streams
            .iter()
            .map(|stream| stream.level)
            .min()
            .unwrap_or(Severity::Trace);

        Self {
            name: options.name.clone(),
            min_level,
            records,
        }
    }

    /// このインスタンスとバッファを共有するバックエンドを生成する関数
    ///
    /// ファサードに渡せば、初期化のたびに作られるバックエンドの出力を
    /// 呼び出し側から観察できる。
    pub fn factory(&self) -> BackendFactory {
        let records = Arc::clone(&self.records);
        Box::new(
            move |options: &LoggerOptions| -> Result<Box<dyn LogBackend>, LogError> {
                Ok(Box::new(Self::with_buffer(options, Arc::clone(&records))))
            },
        )
    }

    /// これまでのレコードのコピー
    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    /// レコードを取り出してバッファを空にする
    pub fn drain(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogRecord>> {
        // 書き込み途中のパニックでもレコードは読めるようにする
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogBackend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, severity: Severity, context: &RecordContext<'_>, message: &str) {
        if severity < self.min_level {
            return;
        }

        self.lock().push(LogRecord {
            name: self.name.clone(),
            severity,
            instance_id: context.instance_id.to_string(),
            datum: context.datum.clone(),
            message: message.to_string(),
        });
    }
}
