//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。ブラウザ、永続化、HTTP、時刻を
//! trait の向こう側に置き、パイプライン本体はそれらの実装を知りません。
//!
//! - ブラウザ拡張側が TabPlatform と TaskStore を実装する
//! - 開発・テスト用の実装は `impls` にある

pub mod chat_transport;
pub mod clock;
pub mod debug_sink;
pub mod id_generator;
pub mod tab_platform;
pub mod task_store;

pub use self::chat_transport::{ChatTransport, TransportError, TransportResponse};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::debug_sink::{DebugLog, DebugSink, NoopDebugSink};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::tab_platform::{GroupId, GroupUpdate, PlatformError, TabPlatform};
pub use self::task_store::{StateTransition, StoreError, TaskStore};
