//! Feria Server - 市集访客通行与销售点后端
//!
//! # 架构概述
//!
//! 本模块是服务端的主入口，提供以下核心功能：
//!
//! - **订单事务** (`orders`): 库存校验、金额复核、原子提交
//! - **数据库** (`db`): SQLite (WAL) + 自动迁移
//! - **认证** (`auth`): JWT + Argon2 认证体系
//! - **实时通知** (`notify`): 事务提交后的事件广播
//! - **文件存储** (`storage`): 内容寻址的支付凭证/商品图片
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! feria-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 认证、密码哈希、中间件
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层 (连接池 + 仓储)
//! ├── orders/        # 订单事务处理器
//! ├── notify/        # 通知总线
//! ├── storage/       # 上传文件存储
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod notify;
pub mod orders;
pub mod storage;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentAdmin, JwtService};
pub use core::{Config, Server, ServerState};
pub use notify::Notifier;
pub use orders::OrderProcessor;
pub use storage::FileStorage;

// Re-export unified error types from shared
pub use shared::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() {
    dotenv::dotenv().ok();
    let log_level = std::env::var("LOG_LEVEL").ok();
    utils::logger::init_logger_with_file(log_level.as_deref(), None);
}

pub fn print_banner() {
    println!(
        r#"
    ______         _
   / ____/__  ____(_)___ _
  / /_  / _ \/ ___/ / __ `/
 / __/ /  __/ /  / / /_/ /
/_/    \___/_/  /_/\__,_/
    "#
    );
}
