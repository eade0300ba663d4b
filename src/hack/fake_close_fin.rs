//! Fake FIN
//!
//! 伪造一个带 FIN 的副本：嗅探器以为连接已经关闭，远端由于包被损坏而忽略它。
//! 每条连接只在前几次生效，之后按注入次数递减概率。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use rand::Rng;
use tracing::{debug, info};

use crate::net::{Packet, TCP_FIN, TCP_PSH, TCP_RST, TCP_SYN};

use super::{Judge, Scramble, pkt_random_damage};

pub const MIN_INJECTED_PKTS: u32 = 4;
pub const MAX_INJECTED_PKTS: u32 = 10;

/// 连接的缓存键：目的地址 + 源/目的端口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub daddr: Ipv4Addr,
    pub sport: u16,
    pub dport: u16,
}

impl FlowKey {
    pub fn of(pkt: &Packet) -> Self {
        Self {
            daddr: pkt.daddr(),
            sport: pkt.sport(),
            dport: pkt.dport(),
        }
    }
}

/// 伪造出的包及其损坏方式
#[derive(Debug, Clone)]
pub struct FakeFin {
    pub pkt: Packet,
    pub judge: Judge,
    pub scrambles: Scramble,
}

#[derive(Debug, Default)]
pub struct FakeCloseFin {
    supported: Scramble,
    injected: HashMap<FlowKey, u32>,
}

impl FakeCloseFin {
    pub fn new(supported: Scramble) -> Self {
        Self {
            supported,
            injected: HashMap::new(),
        }
    }

    /// 该连接已记录的注入次数
    pub fn injected(&self, key: &FlowKey) -> u32 {
        self.injected.get(key).copied().unwrap_or(0)
    }

    /// 是否对这个包伪造 FIN；每次调用都会累计该连接的计数
    pub fn condition<R: Rng + ?Sized>(&mut self, pkt: &Packet, rng: &mut R) -> bool {
        let eligible = !pkt.is_fragment()
            && !pkt.has_flag(TCP_SYN)
            && !pkt.has_flag(TCP_RST)
            && !pkt.has_flag(TCP_FIN);
        if !eligible {
            return false;
        }

        let key = FlowKey::of(pkt);
        let count = self.injected.entry(key).or_insert(0);
        *count += 1;
        let count = *count;

        if count == 1 {
            info!(daddr = %key.daddr, dport = key.dport, "新建连接缓存");
            return true;
        }

        let ret = inverse_proportionality(count, rng);
        debug!(daddr = %key.daddr, dport = key.dport, count, ret, "已有连接缓存");
        ret
    }

    /// 构造伪造包
    pub fn create<R: Rng + ?Sized>(
        &self,
        orig: &Packet,
        available: Scramble,
        rng: &mut R,
    ) -> FakeFin {
        let mut pkt = orig.clone();

        // 两种猜测：嗅探器相信“最后序号 + 1”的 FIN，或者相信稍后被确认的序号
        if rng.gen_bool(0.5) {
            let rewound = orig
                .seq()
                .wrapping_sub(orig.payload().len() as u32)
                .wrapping_add(1);
            pkt.set_seq(rewound);
        }

        pkt.set_flag(TCP_PSH, false);
        pkt.set_flag(TCP_FIN, true);
        pkt.resize_tcp_payload(0);

        let scrambles = available & self.supported;
        FakeFin {
            judge: pkt_random_damage(rng, scrambles),
            pkt,
            scrambles,
        }
    }
}

/// 少于下限总是注入，超过上限不再注入，之间按次数递减概率
fn inverse_proportionality<R: Rng + ?Sized>(pkts: u32, rng: &mut R) -> bool {
    if pkts < MIN_INJECTED_PKTS {
        return true;
    }
    if pkts > MAX_INJECTED_PKTS {
        return false;
    }
    let percent = 100u32.saturating_sub(pkts * MAX_INJECTED_PKTS);
    rng.gen_range(0..100) < percent
}
