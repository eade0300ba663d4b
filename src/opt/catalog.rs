//! 选项描述符目录
//!
//! 每个支持的选项占一行：线上编码、所属协议、腐化分类、生成器。
//! 目录在进程内只读，被所有会话共享。

use std::ops::Range;

use crate::net::Proto;

use super::generators::{
    IpCipso, IpLsrr, IpNoop, IpRa, IpRr, IpSec, IpSid, IpTimestamp, TcpMd5Sig, TcpNop,
    TcpPawsCorrupt,
};
use super::id::OptionId;
use super::session::EditSession;

// IP 选项编码（RFC 791 及后续）
pub const IPOPT_END: u8 = 0;
pub const IPOPT_NOOP: u8 = 1;
pub const IPOPT_RR: u8 = 7;
pub const IPOPT_TIMESTAMP: u8 = 68;
pub const IPOPT_SEC: u8 = 130;
pub const IPOPT_LSRR: u8 = 131;
pub const IPOPT_CIPSO: u8 = 134;
pub const IPOPT_SID: u8 = 136;
pub const IPOPT_RA: u8 = 148;

/// 时间戳选项的 flag：只记录时间戳
pub const IPOPT_TS_TSONLY: u8 = 0;

// TCP 选项编码（RFC 793 及后续）
pub const TCPOPT_EOL: u8 = 0;
pub const TCPOPT_NOP: u8 = 1;
pub const TCPOPT_MSS: u8 = 2;
pub const TCPOPT_SACK: u8 = 5;
pub const TCPOPT_TIMESTAMP: u8 = 8;
pub const TCPOPT_MD5SIG: u8 = 19;

/// 不对应任何真实选项的编码，供只生成不解析的条目使用
pub const RFC_UNEXISTENT_CODE: u8 = 0xff;

/// 选项的腐化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionKind {
    /// 从不腐化
    NotCorrupt,
    /// 单次放置即可腐化
    OneShot,
    /// 同一会话中第二次放置才腐化
    TwoShot,
    /// 仅用于识别，没有生成器
    Unassigned,
}

/// 单个选项的生成逻辑。
///
/// 返回写入的字节数，0 表示放弃（空间不足或前置条件不满足）。
/// 成功时生成器已经把字节追加到缓冲区并登记了出现位置。
pub trait OptionGenerator: Sync {
    fn generate(&self, session: &mut EditSession) -> usize;
}

/// 选项描述符
pub struct OptionDescriptor {
    pub enabled: bool,
    pub corruption: CorruptionKind,
    pub generator: Option<&'static dyn OptionGenerator>,
    pub wire_code: u8,
    pub proto: Proto,
    /// 诊断用名称
    pub name: &'static str,
    /// 配置文件中使用的键
    pub key: &'static str,
}

impl std::fmt::Debug for OptionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("key", &self.key)
            .field("enabled", &self.enabled)
            .field("corruption", &self.corruption)
            .field("wire_code", &self.wire_code)
            .field("proto", &self.proto)
            .finish()
    }
}

pub static CATALOG: [OptionDescriptor; 14] = [
    OptionDescriptor {
        enabled: true,
        corruption: CorruptionKind::NotCorrupt,
        generator: Some(&IpNoop),
        wire_code: IPOPT_NOOP,
        proto: Proto::Ip,
        name: "IP NOOP",
        key: "ip_noop",
    },
    // 既可以腐化也可以不腐化，但保持单次放置
    OptionDescriptor {
        enabled: true,
        corruption: CorruptionKind::OneShot,
        generator: Some(&IpTimestamp),
        wire_code: IPOPT_TIMESTAMP,
        proto: Proto::Ip,
        name: "IP Timestamp",
        key: "ip_timestamp",
    },
    OptionDescriptor {
        enabled: true,
        corruption: CorruptionKind::OneShot,
        generator: Some(&IpLsrr),
        wire_code: IPOPT_LSRR,
        proto: Proto::Ip,
        name: "Loose source routing",
        key: "ip_lsrr",
    },
    OptionDescriptor {
        enabled: true,
        corruption: CorruptionKind::OneShot,
        generator: Some(&IpRr),
        wire_code: IPOPT_RR,
        proto: Proto::Ip,
        name: "Record route",
        key: "ip_rr",
    },
    OptionDescriptor {
        enabled: true,
        corruption: CorruptionKind::NotCorrupt,
        generator: Some(&IpRa),
        wire_code: IPOPT_RA,
        proto: Proto::Ip,
        name: "Router alert",
        key: "ip_ra",
    },
    OptionDescriptor {
        enabled: true,
        corruption: CorruptionKind::OneShot,
        generator: Some(&IpCipso),
        wire_code: IPOPT_CIPSO,
        proto: Proto::Ip,
        name: "Cipso",
        key: "ip_cipso",
    },
    OptionDescriptor {
        enabled: true,
        corruption: CorruptionKind::OneShot,
        generator: Some(&IpSec),
        wire_code: IPOPT_SEC,
        proto: Proto::Ip,
        name: "Security",
        key: "ip_sec",
    },
    OptionDescriptor {
        enabled: true,
        corruption: CorruptionKind::TwoShot,
        generator: Some(&IpSid),
        wire_code: IPOPT_SID,
        proto: Proto::Ip,
        name: "Session ID",
        key: "ip_sid",
    },
    OptionDescriptor {
        enabled: true,
        corruption: CorruptionKind::NotCorrupt,
        generator: Some(&TcpNop),
        wire_code: TCPOPT_NOP,
        proto: Proto::Tcp,
        name: "TCP NOOP",
        key: "tcp_nop",
    },
    // MD5 与 PAWS 默认关闭，需在配置的 enabled 中打开
    OptionDescriptor {
        enabled: false,
        corruption: CorruptionKind::OneShot,
        generator: Some(&TcpMd5Sig),
        wire_code: TCPOPT_MD5SIG,
        proto: Proto::Tcp,
        name: "TCP MD5SIG",
        key: "tcp_md5sig",
    },
    // 写出的是 TCPOPT_TIMESTAMP，解析时已有的时间戳归到下面的占位条目
    OptionDescriptor {
        enabled: false,
        corruption: CorruptionKind::OneShot,
        generator: Some(&TcpPawsCorrupt),
        wire_code: RFC_UNEXISTENT_CODE,
        proto: Proto::Tcp,
        name: "TCP Timestamp corrupt PAWS",
        key: "tcp_paws_corrupt",
    },
    OptionDescriptor {
        enabled: false,
        corruption: CorruptionKind::Unassigned,
        generator: None,
        wire_code: TCPOPT_TIMESTAMP,
        proto: Proto::Tcp,
        name: "TCP Timestamp",
        key: "tcp_timestamp",
    },
    OptionDescriptor {
        enabled: false,
        corruption: CorruptionKind::Unassigned,
        generator: None,
        wire_code: TCPOPT_MSS,
        proto: Proto::Tcp,
        name: "TCP MSS",
        key: "tcp_mss",
    },
    OptionDescriptor {
        enabled: false,
        corruption: CorruptionKind::Unassigned,
        generator: None,
        wire_code: TCPOPT_SACK,
        proto: Proto::Tcp,
        name: "TCP SACK",
        key: "tcp_sack",
    },
];

/// 某个协议在目录中的标识符范围（目录按协议连续排列）
pub fn ids(proto: Proto) -> Range<usize> {
    let start = CATALOG
        .iter()
        .position(|d| d.proto == proto)
        .unwrap_or(CATALOG.len());
    let len = CATALOG[start..]
        .iter()
        .take_while(|d| d.proto == proto)
        .count();
    start..start + len
}

/// 标识符是否属于该协议
pub fn in_range(proto: Proto, id: OptionId) -> bool {
    ids(proto).contains(&id.0)
}

/// 按线上编码查找（限定协议）
pub fn lookup(proto: Proto, code: u8) -> Option<OptionId> {
    CATALOG
        .iter()
        .position(|d| d.proto == proto && d.wire_code == code)
        .map(OptionId)
}

/// 按配置键查找
pub fn by_key(key: &str) -> Option<OptionId> {
    CATALOG.iter().position(|d| d.key == key).map(OptionId)
}

/// 协议的终止/填充编码
pub fn terminator(proto: Proto) -> u8 {
    match proto {
        Proto::Ip => IPOPT_END,
        Proto::Tcp => TCPOPT_EOL,
    }
}

/// 协议的单字节空操作编码
pub fn noop(proto: Proto) -> u8 {
    match proto {
        Proto::Ip => IPOPT_NOOP,
        Proto::Tcp => TCPOPT_NOP,
    }
}
