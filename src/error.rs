use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("初期化エラー: {0}")]
    Init(#[from] InitProcessError),

    #[error("リレーエラー: {0}")]
    Relay(#[from] RelayError),

    #[error("リレータスクの実行に失敗しました: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum InitProcessError {
    #[error("使い方: {0}")]
    Usage(String),

    #[error("ロガーのセットアップに失敗しました: {0}")]
    LoggerError(String),

    #[error("環境変数の解析に失敗しました: {0}")]
    EnvVarParseError(String),

    #[error("インターフェースが見つかりません: {0}")]
    InterfaceNotFound(String),

    #[error("チャネルの作成に失敗しました: {0}")]
    ChannelError(String),

    #[error("未対応のチャネルタイプです: {0}")]
    UnsupportedChannel(String),
}

#[derive(Error, Debug)]
pub enum RulesetError {
    #[error("ファイル \"{path}\" を読み込めません: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XMLの解析に失敗しました: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("JSONの解析に失敗しました: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ルートコンテナ \"{0}\" がありません")]
    MissingRoot(&'static str),
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("フレームの読み込みに失敗しました: {0}")]
    Read(#[source] std::io::Error),

    #[error("フレームの送信に失敗しました: {0}")]
    Write(#[source] std::io::Error),
}
