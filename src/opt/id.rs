//! 选项标识符
//!
//! 目录中的下标，IP 与 TCP 选项共享同一个编号空间。

use std::fmt;

use super::catalog::{CATALOG, OptionDescriptor};

/// 选项标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(pub usize);

impl OptionId {
    pub const IP_NOOP: OptionId = OptionId(0);
    pub const IP_TIMESTAMP: OptionId = OptionId(1);
    pub const IP_LSRR: OptionId = OptionId(2);
    pub const IP_RR: OptionId = OptionId(3);
    pub const IP_RA: OptionId = OptionId(4);
    pub const IP_CIPSO: OptionId = OptionId(5);
    pub const IP_SEC: OptionId = OptionId(6);
    pub const IP_SID: OptionId = OptionId(7);
    pub const TCP_NOP: OptionId = OptionId(8);
    pub const TCP_MD5SIG: OptionId = OptionId(9);
    pub const TCP_PAWS_CORRUPT: OptionId = OptionId(10);
    pub const TCP_TIMESTAMP: OptionId = OptionId(11);
    pub const TCP_MSS: OptionId = OptionId(12);
    pub const TCP_SACK: OptionId = OptionId(13);

    /// 目录中对应的描述符（越界时为 None）
    pub fn descriptor(self) -> Option<&'static OptionDescriptor> {
        CATALOG.get(self.0)
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.descriptor() {
            Some(desc) => f.write_str(desc.name),
            None => write!(f, "option#{}", self.0),
        }
    }
}
