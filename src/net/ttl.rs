//! 远端 TTL 估计
//!
//! 由外部的跳数探测填充，注入引擎只读取。

/// 跳数探测状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtlStatus {
    #[default]
    Unknown,
    Known,
}

/// 某个目的地址的 TTL 估计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TtlFocus {
    pub status: TtlStatus,
    /// 到达目的地所需的跳数
    pub ttl_estimate: u8,
}

impl TtlFocus {
    pub fn known(ttl_estimate: u8) -> Self {
        Self {
            status: TtlStatus::Known,
            ttl_estimate,
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.status == TtlStatus::Known
    }
}
