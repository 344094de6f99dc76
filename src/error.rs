//! エラー型定義モジュール

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 設定エラー
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IOエラー: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML解析エラー: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("JSON解析エラー: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("不正な設定値: {0}")]
    Invalid(String),
}

/// インスタンスID生成エラー
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdError {
    #[error("ノードIDが範囲外です（datacenter: {data_center}, worker: {worker}）")]
    InvalidNode { data_center: u8, worker: u8 },

    #[error("システム時計が巻き戻りました（前回: {last_ms}ms, 現在: {now_ms}ms）")]
    ClockMovedBackwards { last_ms: i64, now_ms: i64 },
}

/// ロガー初期化エラー
#[derive(Error, Debug)]
pub enum LogError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("インスタンスID生成エラー: {0}")]
    Id(#[from] IdError),

    #[error("出力ストリームを開けません: {path}: {source}")]
    Stream {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
