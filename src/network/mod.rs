//! 站点 API 访问层。
//!
//! 子模块：
//! - `models` — API 响应的数据模型
//! - `client` — 阻塞 HTTP 客户端（系列 / 章节元数据与页面图片）

pub mod client;
pub mod models;
