//! ロギングファサードモジュール

use crate::backend::{BackendFactory, LogBackend, LoggerOptions, RecordContext};
use crate::config::Parameters;
use crate::error::LogError;
use crate::flake::{self, FlakeIdGenerator};
use crate::severity::Severity;
use crate::tracing_backend::TracingBackend;

use serde_json::{Map, Value};
use tracing::debug;

/// メッセージが無い場合の代替テキスト
pub const NO_MESSAGE: &str = "No message";

/// インスタンスID付きのレベル別ロギングファサード
///
/// `initialize`が呼ばれるまで書き込みはすべて`false`を返し、何も出力しない。
pub struct LogFacade {
    logger: Option<Box<dyn LogBackend>>,
    instance_id: Option<String>,
    parameters: Parameters,
    factory: BackendFactory,
}

impl LogFacade {
    /// デフォルトパラメータで作成
    pub fn new() -> Self {
        Self::from_parameters(Parameters::default())
    }

    /// 指定パラメータで作成
    pub fn from_parameters(parameters: Parameters) -> Self {
        Self::with_backend_factory(parameters, TracingBackend::factory())
    }

    /// 下位ロガーの生成方法を指定して作成
    pub fn with_backend_factory(parameters: Parameters, factory: BackendFactory) -> Self {
        Self {
            logger: None,
            instance_id: None,
            parameters,
            factory,
        }
    }

    /// ロガーを初期化
    ///
    /// 1. `config_source`が空でなければ設定を読み込む（エラーはそのまま返す）
    /// 2. `<product>-<product_version>`という名前で下位ロガーを作る
    /// 3. インスタンスIDが未設定なら生成する（設定済みなら維持）
    ///
    /// 失敗した場合、ファサードの状態は変更されない。
    pub fn initialize(&mut self, config_source: Option<&str>) -> Result<(), LogError> {
        let mut parameters = self.parameters.clone();
        if let Some(source) = config_source.filter(|source| !source.is_empty()) {
            parameters.load_configuration(source)?;
        }
        parameters.validate()?;

        let options = LoggerOptions {
            name: parameters.logger_name(),
            streams: parameters.log_streams.clone(),
        };
        let logger = (self.factory)(&options)?;

        let instance_id = match &self.instance_id {
            Some(id) => id.clone(),
            None => generate_instance_id(&parameters)?,
        };

        debug!(
            logger = %options.name,
            instance_id = %instance_id,
            streams = options.streams.len(),
            "ロガーを初期化しました"
        );

        self.parameters = parameters;
        self.logger = Some(logger);
        self.instance_id = Some(instance_id);
        Ok(())
    }

    /// 初期化済みかどうか
    pub fn is_initialized(&self) -> bool {
        self.logger.is_some()
    }

    /// 指定レベルで書き込む
    ///
    /// `message`が無ければ`"No message"`、`datum`が無ければ空オブジェクトを使う。
    /// 未初期化なら`false`を返す。
    pub fn log(&self, severity: Severity, message: Option<&str>, datum: Option<Value>) -> bool {
        let Some(logger) = self.logger.as_deref() else {
            return false;
        };

        let datum = datum.unwrap_or_else(|| Value::Object(Map::new()));
        let context = RecordContext {
            instance_id: self.instance_id.as_deref().unwrap_or_default(),
            datum: &datum,
        };
        logger.log(severity, &context, message.unwrap_or(NO_MESSAGE));
        true
    }

    /// TRACEレベルで書き込む
    pub fn log_trace(&self, message: Option<&str>, datum: Option<Value>) -> bool {
        self.log(Severity::Trace, message, datum)
    }

    /// DEBUGレベルで書き込む
    pub fn log_debug(&self, message: Option<&str>, datum: Option<Value>) -> bool {
        self.log(Severity::Debug, message, datum)
    }

    /// INFOレベルで書き込む
    pub fn log_info(&self, message: Option<&str>, datum: Option<Value>) -> bool {
        self.log(Severity::Info, message, datum)
    }

    /// WARNレベルで書き込む
    pub fn log_warn(&self, message: Option<&str>, datum: Option<Value>) -> bool {
        self.log(Severity::Warn, message, datum)
    }

    /// ERRORレベルで書き込む
    pub fn log_error(&self, message: Option<&str>, datum: Option<Value>) -> bool {
        self.log(Severity::Error, message, datum)
    }

    /// FATALレベルで書き込む
    pub fn log_fatal(&self, message: Option<&str>, datum: Option<Value>) -> bool {
        self.log(Severity::Fatal, message, datum)
    }

    /// 下位ロガー（未初期化なら`None`）
    ///
    /// ラッパーを経由しない直接の書き込み用
    pub fn logger(&self) -> Option<&dyn LogBackend> {
        self.logger.as_deref()
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    pub fn set_parameters(&mut self, parameters: Parameters) {
        self.parameters = parameters;
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    /// インスタンスIDを設定
    ///
    /// `initialize`の前に設定すればIDは生成されない
    pub fn set_instance_id(&mut self, instance_id: impl Into<String>) {
        self.instance_id = Some(instance_id.into());
    }
}

impl Default for LogFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogFacade")
            .field("logger", &self.logger.as_ref().map(|logger| logger.name()))
            .field("instance_id", &self.instance_id)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

fn generate_instance_id(parameters: &Parameters) -> Result<String, LogError> {
    let mut generator = FlakeIdGenerator::new(parameters.uuid.data_center, parameters.uuid.worker)?;
    let instance_id = flake::format_hex(generator.next_id()?);
    debug!(instance_id = %instance_id, "インスタンスIDを生成しました");
    Ok(instance_id)
}
