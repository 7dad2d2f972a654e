//! Grouping - AI によるタブのグループ分け
//!
//! - **prompt**: system / user メッセージの文面
//! - **request**: chat completion のリクエスト本文
//! - **retry**: バックオフとステータス分類
//! - **response**: 回答の抽出・検証・序数の解決
//! - **client**: 上記をまとめた GroupingClient

pub mod client;
pub mod prompt;
pub mod request;
pub mod response;
pub mod retry;

pub use self::client::GroupingClient;
pub use self::request::{ChatMessage, ChatRequest};
pub use self::retry::{RetryPolicy, StatusClass, classify_status};
