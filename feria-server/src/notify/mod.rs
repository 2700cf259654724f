//! 实时通知总线
//!
//! # 架构
//!
//! ```text
//! 业务事务提交 ──▶ ServerState::broadcast() ──▶ broadcast::Sender<BusMessage>
//!                                                      │
//!                                          ┌───────────┴───────────┐
//!                                          ▼                       ▼
//!                                   WebSocket 转发任务        WebSocket 转发任务
//!                                   (管理端仪表盘)            (访客状态页)
//! ```
//!
//! 发布是 fire-and-forget：没有订阅者或订阅者落后都不会影响发布方，
//! 更不会影响已提交事务的结果。

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use shared::message::BusMessage;

/// Default capacity of the broadcast channel
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// 通知总线 - 事务提交后的事件广播
///
/// # 职责
///
/// - 事件发布 (publish)
/// - 订阅管理 (subscribe; 懒惰订阅者被 broadcast 通道自动淘汰)
/// - 关闭信号 (shutdown_token, 用于 WebSocket 转发任务退出)
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<BusMessage>,
    shutdown_token: CancellationToken,
}

impl Notifier {
    /// 创建默认容量的通知总线
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// 指定通道容量创建
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// 发布事件 (fire-and-forget)
    ///
    /// 没有任何订阅者时 `send` 返回错误，这是正常情况 (无仪表盘在线)，
    /// 只记录 debug 日志。
    pub fn publish(&self, message: BusMessage) {
        match self.tx.send(message) {
            Ok(receivers) => {
                tracing::debug!(receivers, "Bus message delivered");
            }
            Err(_) => {
                tracing::debug!("Bus message dropped (no subscribers)");
            }
        }
    }

    /// 订阅事件流
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// 关闭信号令牌 (WebSocket 转发任务监听)
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// 通知所有转发任务退出
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
