//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **HttpTransport**: reqwest による ChatTransport（本番用）
//! - **JsonFileTaskStore**: JSON ファイルに永続化する TaskStore
//! - **InMemoryTaskStore**: watch チャネルだけの TaskStore（開発・テスト用）
//! - **InMemoryTabPlatform**: ブラウザウィンドウのシミュレーション（開発・テスト用）
//! - **ScriptedTransport**: 台本どおりに応答する ChatTransport（開発・テスト用）
//!
//! ブラウザ拡張に載せる場合の TabPlatform / TaskStore は拡張側で実装します。

pub mod file_store;
pub mod http_transport;
pub mod memory_store;
pub mod memory_tabs;
pub mod scripted_transport;

pub use self::file_store::JsonFileTaskStore;
pub use self::http_transport::HttpTransport;
pub use self::memory_store::InMemoryTaskStore;
pub use self::memory_tabs::{GroupInfo, InMemoryTabPlatform};
pub use self::scripted_transport::{RecordedCall, ScriptedTransport};
