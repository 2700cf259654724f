use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::notify::Notifier;
use crate::orders::OrderProcessor;
use crate::storage::FileStorage;
use shared::message::{BusMessage, EventType};

/// 资源版本管理器
///
/// 使用 DashMap 实现无锁并发的版本号管理。
/// 每种资源类型维护独立的版本号，支持原子递增。
///
/// # 使用场景
///
/// 用于 broadcast 时自动生成递增的版本号，
/// 确保仪表盘可以通过版本号丢弃乱序到达的旧事件。
#[derive(Debug)]
pub struct ResourceVersions {
    versions: DashMap<String, u64>,
}

impl ResourceVersions {
    /// 创建空的版本管理器
    pub fn new() -> Self {
        Self {
            versions: DashMap::new(),
        }
    }

    /// 递增指定资源的版本号并返回新值
    ///
    /// 如果资源不存在，从 0 开始递增（返回 1）
    pub fn increment(&self, resource: &str) -> u64 {
        let mut entry = self.versions.entry(resource.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// 获取指定资源的当前版本号
    ///
    /// 如果资源不存在，返回 0
    pub fn get(&self, resource: &str) -> u64 {
        self.versions.get(resource).map(|v| *v).unwrap_or(0)
    }
}

impl Default for ResourceVersions {
    fn default() -> Self {
        Self::new()
    }
}

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是服务端的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | SqlitePool | SQLite 连接池 |
/// | order_processor | OrderProcessor | 订单事务处理器 |
/// | notifier | Notifier | 实时通知总线 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | resource_versions | Arc<ResourceVersions> | 资源版本管理 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub db: SqlitePool,
    /// 订单事务处理器 (显式注入连接池，不使用全局单例)
    pub order_processor: OrderProcessor,
    /// 实时通知总线
    pub notifier: Notifier,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    /// 资源版本管理器 (用于 broadcast 自动递增版本号)
    pub resource_versions: Arc<ResourceVersions>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构 (确保目录存在)
    /// 2. 数据库 (work_dir/database/feria.db, 自动迁移, 初始管理员)
    /// 3. 各服务 (OrderProcessor, Notifier, JWT)
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        // 0. Ensure work_dir structure exists
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        // 1. Initialize DB
        let db_path = config.database_dir().join("feria.db");
        let db_path_str = db_path.to_string_lossy();

        let db_service = DbService::new(&db_path_str)
            .await
            .expect("Failed to initialize database");

        // 1.1 Seed the initial admin account (no-op when admins exist)
        db_service
            .seed_default_admin(&config.admin_email, config.admin_password.as_deref())
            .await
            .expect("Failed to seed initial admin");

        let db = db_service.pool;

        // 2. Initialize services
        let order_processor = OrderProcessor::new(db.clone());
        let notifier = Notifier::new();
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let resource_versions = Arc::new(ResourceVersions::new());

        Self {
            config: config.clone(),
            db,
            order_processor,
            notifier,
            jwt_service,
            resource_versions,
        }
    }

    /// 获取数据库连接池
    pub fn get_db(&self) -> SqlitePool {
        self.db.clone()
    }

    /// 获取工作目录
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 获取订单事务处理器
    pub fn order_processor(&self) -> &OrderProcessor {
        &self.order_processor
    }

    /// 获取文件存储 (work_dir/uploads)
    pub fn storage(&self) -> FileStorage {
        FileStorage::new(self.config.uploads_dir(), self.config.max_file_size)
    }

    /// 广播事件通知
    ///
    /// 向所有订阅的仪表盘会话广播资源变更通知。
    /// 版本号由 ResourceVersions 自动递增管理。
    ///
    /// 只能在事务提交之后调用；投递失败不影响调用方。
    ///
    /// # 参数
    /// - `event`: 事件类型
    /// - `resource`: 资源类型 (如 "order", "visitor")
    /// - `payload`: 事件数据
    pub fn broadcast<T: serde::Serialize>(&self, event: EventType, resource: &str, payload: &T) {
        let version = self.resource_versions.increment(resource);
        self.notifier
            .publish(BusMessage::new(event, resource, version, payload));
    }
}
