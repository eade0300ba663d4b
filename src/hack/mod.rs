//! 报文伪造策略
//!
//! 决定伪造包的“损坏方式”，以及基于注入引擎实现的畸形化。
//! 调度（何时、对哪条连接调用）不在这里。

mod fake_close_fin;

use std::ops::BitAnd;

use rand::Rng;
use tracing::{debug, warn};

use crate::net::{Packet, Proto, TtlFocus};
use crate::opt::{HdrOptError, HdrOptions, InjectorConfig};

pub use fake_close_fin::{FakeCloseFin, FakeFin, FlowKey, MAX_INJECTED_PKTS, MIN_INJECTED_PKTS};

/// 可用的损坏手段（位集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scramble(pub u8);

impl Scramble {
    pub const NONE: Scramble = Scramble(0);
    pub const TTL: Scramble = Scramble(0x01);
    pub const CHECKSUM: Scramble = Scramble(0x02);
    pub const MALFORMED: Scramble = Scramble(0x04);
    pub const ALL: Scramble = Scramble(0x07);

    pub fn contains(self, other: Scramble) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }
}

impl BitAnd for Scramble {
    type Output = Scramble;

    fn bitand(self, rhs: Scramble) -> Scramble {
        Scramble(self.0 & rhs.0)
    }
}

/// 伪造包最终采用的损坏方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judge {
    /// TTL 不足以到达远端，只有嗅探器能看到
    Prescription,
    /// 畸形的 IP/TCP 选项，远端协议栈丢弃
    Malformed,
    /// 错误的校验和
    Guilty,
}

/// 在可用的损坏手段中随机挑一个：TTL 75%，畸形 80%，否则校验和
pub fn pkt_random_damage<R: Rng + ?Sized>(rng: &mut R, scrambles: Scramble) -> Judge {
    if scrambles.contains(Scramble::TTL) && rng.gen_bool(0.75) {
        return Judge::Prescription;
    }
    if scrambles.contains(Scramble::MALFORMED) && rng.gen_bool(0.80) {
        return Judge::Malformed;
    }
    Judge::Guilty
}

/// 给数据包注入腐化选项：先尝试 IP 选项，失败再降级到 TCP 选项。
///
/// 某个头部已有的选项无法解析时跳过该头部继续降级；两个头部都没有达成时，
/// 若曾遇到解析错误则返回第一个错误。未达成时数据包不变。
pub fn apply_malformed(
    pkt: &mut Packet,
    ttl: TtlFocus,
    cfg: &InjectorConfig,
) -> Result<bool, HdrOptError> {
    let mut first_err = None;

    for proto in [Proto::Ip, Proto::Tcp] {
        let mut hdr = match HdrOptions::new(proto, &mut *pkt, ttl, cfg) {
            Ok(hdr) => hdr,
            Err(e) => {
                warn!(proto = proto.label(), error = %e, "已有选项无法解析，降级");
                first_err.get_or_insert(e);
                continue;
            }
        };
        if hdr.inject_random_opts(true, false) {
            debug!(proto = proto.label(), "畸形选项注入成功");
            return Ok(true);
        }
        debug!(proto = proto.label(), "畸形选项注入未达成，降级");
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(false),
    }
}
