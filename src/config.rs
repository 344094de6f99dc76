//! ログパラメータ（設定）モジュール

use crate::error::ConfigError;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// ノードID（datacenter / worker）の上限（5ビット）
pub const MAX_NODE_ID: u8 = 31;

/// ログパラメータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    /// プロダクト名
    pub product: String,
    /// プロダクトバージョン
    pub product_version: String,
    /// 出力ストリーム（定義順）
    pub log_streams: Vec<StreamDescriptor>,
    /// インスタンスID生成器の設定
    pub uuid: UuidSettings,
}

/// インスタンスID生成器の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UuidSettings {
    pub data_center: u8,
    pub worker: u8,
}

/// 出力ストリーム定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// このストリームに書き込む最低レベル
    pub level: Severity,
    pub target: StreamTarget,
    /// `target`がfileの場合の出力先
    pub path: Option<PathBuf>,
    pub format: StreamFormat,
}

/// 出力先
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamTarget {
    Stdout,
    Stderr,
    File,
}

/// レコードの書式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    /// 1行1レコードのJSON
    #[default]
    Json,
    Text,
}

impl StreamDescriptor {
    /// 標準出力へのストリーム
    pub fn stdout(level: Severity) -> Self {
        Self {
            level,
            target: StreamTarget::Stdout,
            path: None,
            format: StreamFormat::Json,
        }
    }

    /// 標準エラー出力へのストリーム
    pub fn stderr(level: Severity) -> Self {
        Self {
            level,
            target: StreamTarget::Stderr,
            path: None,
            format: StreamFormat::Json,
        }
    }

    /// ファイルへのストリーム（追記）
    pub fn file(level: Severity, path: impl Into<PathBuf>) -> Self {
        Self {
            level,
            target: StreamTarget::File,
            path: Some(path.into()),
            format: StreamFormat::Json,
        }
    }

    /// 書式を指定
    pub fn with_format(mut self, format: StreamFormat) -> Self {
        self.format = format;
        self
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            product: "Fable".to_string(),
            product_version: "0.0.0".to_string(),
            log_streams: vec![StreamDescriptor::stdout(Severity::Trace)],
            uuid: UuidSettings::default(),
        }
    }
}

/// 設定ファイル用構造体
///
/// 旧形式のキー（`Product`, `LogStreams`, `UUID.DataCenter`など）も受け付ける
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default, alias = "Product")]
    product: Option<String>,
    #[serde(default, alias = "ProductVersion")]
    product_version: Option<String>,
    #[serde(default, alias = "LogStreams")]
    log_streams: Option<Vec<FileStream>>,
    #[serde(default, alias = "UUID")]
    uuid: Option<FileUuid>,
}

#[derive(Debug, Deserialize, Default)]
struct FileStream {
    #[serde(default)]
    level: Option<Severity>,
    #[serde(default)]
    target: Option<StreamTarget>,
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    format: Option<StreamFormat>,
}

#[derive(Debug, Deserialize, Default)]
struct FileUuid {
    #[serde(default, alias = "DataCenter")]
    data_center: Option<u8>,
    #[serde(default, alias = "Worker")]
    worker: Option<u8>,
}

impl From<FileStream> for StreamDescriptor {
    fn from(stream: FileStream) -> Self {
        // targetが省略されていてpathがあればファイル出力とみなす
        let target = stream.target.unwrap_or(if stream.path.is_some() {
            StreamTarget::File
        } else {
            StreamTarget::Stdout
        });

        Self {
            level: stream.level.unwrap_or(Severity::Info),
            target,
            path: stream.path,
            format: stream.format.unwrap_or_default(),
        }
    }
}

impl Parameters {
    /// ロガー名（`<product>-<product_version>`）
    pub fn logger_name(&self) -> String {
        format!("{}-{}", self.product, self.product_version)
    }

    /// 設定ファイルを読み込んで現在の値にマージする
    ///
    /// 拡張子が`.json`ならJSON、それ以外はTOMLとして解析する。
    /// 解析・バリデーションに失敗した場合、現在の値は変更されない。
    pub fn load_configuration(&mut self, source: &str) -> Result<(), ConfigError> {
        let path = Path::new(source);
        let content = fs::read_to_string(path)?;
        let file_config = parse_file_config(path, &content)?;

        let mut merged = self.clone();
        merged.merge_file_config(file_config);
        merged.validate()?;

        *self = merged;
        debug!(source, logger = %self.logger_name(), "ログ設定を読み込みました");
        Ok(())
    }

    /// ファイル設定をマージ
    fn merge_file_config(&mut self, file_config: FileConfig) {
        if let Some(product) = file_config.product {
            self.product = product;
        }
        if let Some(version) = file_config.product_version {
            self.product_version = version;
        }
        if let Some(streams) = file_config.log_streams {
            self.log_streams = streams.into_iter().map(StreamDescriptor::from).collect();
        }
        if let Some(uuid) = file_config.uuid {
            if let Some(data_center) = uuid.data_center {
                self.uuid.data_center = data_center;
            }
            if let Some(worker) = uuid.worker {
                self.uuid.worker = worker;
            }
        }
    }

    /// 設定値をバリデート
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.product.is_empty() {
            return Err(ConfigError::Invalid("product must not be empty".to_string()));
        }
        if self.uuid.data_center > MAX_NODE_ID {
            return Err(ConfigError::Invalid(format!(
                "data_center must be between 0 and {}",
                MAX_NODE_ID
            )));
        }
        if self.uuid.worker > MAX_NODE_ID {
            return Err(ConfigError::Invalid(format!(
                "worker must be between 0 and {}",
                MAX_NODE_ID
            )));
        }
        for (index, stream) in self.log_streams.iter().enumerate() {
            let has_path = stream
                .path
                .as_ref()
                .is_some_and(|path| !path.as_os_str().is_empty());
            if stream.target == StreamTarget::File && !has_path {
                return Err(ConfigError::Invalid(format!(
                    "log_streams[{}]: file stream requires a path",
                    index
                )));
            }
        }
        Ok(())
    }
}

fn parse_file_config(path: &Path, content: &str) -> Result<FileConfig, ConfigError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_default_parameters() {
        let params = Parameters::default();
        assert_eq!(params.logger_name(), "Fable-0.0.0");
        assert_eq!(params.log_streams, vec![StreamDescriptor::stdout(Severity::Trace)]);
        assert_eq!(params.uuid, UuidSettings { data_center: 0, worker: 0 });
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_load_toml_configuration() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_config(
            &temp_dir,
            "log.toml",
            r#"
product = "Orator"
product_version = "2.1.0"

[[log_streams]]
level = "warn"
target = "stderr"
format = "text"

[[log_streams]]
level = "debug"
path = "/tmp/orator.log"

[uuid]
data_center = 3
worker = 7
"#,
        );

        let mut params = Parameters::default();
        params.load_configuration(&source).unwrap();

        assert_eq!(params.logger_name(), "Orator-2.1.0");
        assert_eq!(
            params.log_streams,
            vec![
                StreamDescriptor::stderr(Severity::Warn).with_format(StreamFormat::Text),
                StreamDescriptor::file(Severity::Debug, "/tmp/orator.log"),
            ]
        );
        assert_eq!(params.uuid, UuidSettings { data_center: 3, worker: 7 });
    }

    #[test]
    fn test_load_json_with_legacy_keys() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_config(
            &temp_dir,
            "log.json",
            r#"{
                "Product": "Meadow",
                "ProductVersion": "1.0.4",
                "LogStreams": [{ "level": "info" }],
                "UUID": { "DataCenter": 2, "Worker": 9 }
            }"#,
        );

        let mut params = Parameters::default();
        params.load_configuration(&source).unwrap();

        assert_eq!(params.logger_name(), "Meadow-1.0.4");
        assert_eq!(params.log_streams, vec![StreamDescriptor::stdout(Severity::Info)]);
        assert_eq!(params.uuid, UuidSettings { data_center: 2, worker: 9 });
    }

    #[test]
    fn test_partial_file_keeps_current_values() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_config(&temp_dir, "log.toml", "product_version = \"9.9.9\"\n");

        let mut params = Parameters::default();
        params.uuid.worker = 4;
        params.load_configuration(&source).unwrap();

        // ファイルにないキーは現在の値を維持
        assert_eq!(params.product, "Fable");
        assert_eq!(params.product_version, "9.9.9");
        assert_eq!(params.uuid.worker, 4);
        assert_eq!(params.log_streams.len(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("missing.toml");

        let mut params = Parameters::default();
        let result = params.load_configuration(&source.to_string_lossy());
        assert!(matches!(result, Err(ConfigError::IoError(_))));
        assert_eq!(params, Parameters::default());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_config(&temp_dir, "log.toml", "product = [unclosed");

        let mut params = Parameters::default();
        let result = params.load_configuration(&source);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_config(&temp_dir, "log.json", "{ \"Product\": ");

        let mut params = Parameters::default();
        let result = params.load_configuration(&source);
        assert!(matches!(result, Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_invalid_values_leave_parameters_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_config(
            &temp_dir,
            "log.toml",
            "product = \"Orator\"\n[uuid]\nworker = 32\n",
        );

        let mut params = Parameters::default();
        let result = params.load_configuration(&source);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        assert_eq!(params, Parameters::default());
    }

    #[test]
    fn test_validate_data_center_over_31() {
        let mut params = Parameters::default();
        params.uuid.data_center = 32;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_validate_empty_product() {
        let mut params = Parameters::default();
        params.product = String::new();
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_validate_file_stream_without_path() {
        let mut params = Parameters::default();
        params.log_streams = vec![StreamDescriptor {
            level: Severity::Info,
            target: StreamTarget::File,
            path: None,
            format: StreamFormat::Json,
        }];
        assert!(params.validate().is_err());
    }
}
