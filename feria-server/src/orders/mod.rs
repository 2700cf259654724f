//! 订单事务模块
//!
//! 订单创建 (库存校验 + 金额复核 + 原子提交) 与支付审核的唯一入口。
//! 读取路径见 [`crate::db::repository::order`]。

mod processor;

#[cfg(test)]
mod tests;

pub use processor::OrderProcessor;
