//! 数据包协作方
//!
//! 此模块包含注入引擎所依赖的外部接口：可编辑选项区的数据包，以及远端 TTL 估计。

// 子模块声明
mod api;
mod packet;
mod ttl;

// 重新导出公共接口
pub use api::{OptionHost, Proto};
pub use packet::{
    IP_HDR_BASE, MAX_HDR_OPTIONS, Packet, PacketError, TCP_ACK, TCP_FIN, TCP_HDR_BASE, TCP_PSH,
    TCP_RST, TCP_SYN,
};
pub use ttl::{TtlFocus, TtlStatus};
