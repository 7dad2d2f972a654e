//! tidytabs-core
//!
//! AI にタブのグループ分けを提案させ、ブラウザのタブグループに反映するコア。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（tab, group, state, errors, ids）と URL のサニタイズ
//! - **config**: AI エンドポイントと実行オプション
//! - **ports**: 抽象化レイヤー（TabPlatform, TaskStore, ChatTransport, Clock, など）
//! - **grouping**: AI 呼び出し（プロンプト、リトライ、レスポンス検証）
//! - **app**: オーケストレーター、アプライヤー、モニター
//! - **impls**: 実装（HTTP、JSON ファイル、開発用のインメモリ実装）

pub mod app;
pub mod config;
pub mod domain;
pub mod grouping;
pub mod impls;
pub mod ports;

pub use app::{OrganizeRequest, TaskHandle, TaskMonitor, TaskOrchestrator};
pub use config::{AiConfig, ConfigError, OrganizeSettings, ReasoningEffort};
pub use domain::{GroupColor, GroupSpec, OrganizeError, StartError, TabId, TabRecord, TaskState};
pub use grouping::GroupingClient;
