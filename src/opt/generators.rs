//! 各选项的生成器
//!
//! 每个生成器只做三件事：确认空间和前置条件、拼出选项字节、
//! 通过 `EditSession::emit` 写入并登记。腐化标记在写入成功之后设置。
//!
//! 参考：
//! - RFC 791 / RFC 781（IP 时间戳）/ RFC 1812 5.2.4.1（重复源路由）
//! - RFC 2113（Router Alert）、RFC 1108（Security）、RFC 2385（TCP MD5）
//! - Linux net/ipv4/ip_options.c 的校验分支

use rand::RngCore;

use crate::net::MAX_HDR_OPTIONS;

use super::catalog::{
    IPOPT_CIPSO, IPOPT_LSRR, IPOPT_NOOP, IPOPT_RA, IPOPT_RR, IPOPT_SEC, IPOPT_SID,
    IPOPT_TIMESTAMP, IPOPT_TS_TSONLY, OptionGenerator, TCPOPT_MD5SIG, TCPOPT_NOP,
    TCPOPT_TIMESTAMP,
};
use super::id::OptionId;
use super::session::EditSession;

pub const IPOPT_NOOP_SIZE: usize = 1;
pub const IPOPT_RA_SIZE: usize = 4;
pub const IPOPT_CIPSO_SIZE: usize = 10;
pub const IPOPT_SEC_SIZE: usize = 11;
pub const IPOPT_SID_SIZE: usize = 4;
pub const TCPOPT_NOP_SIZE: usize = 1;
pub const TCPOPT_MD5SIG_SIZE: usize = 18;
pub const TCPOPT_TIMESTAMP_SIZE: usize = 10;

/// 时间戳溢出计数器只有 4 位
const TS_OVERFLOW_SPAN: usize = 15;

/// 写入成功后标记腐化
fn emit_corrupting(s: &mut EditSession, id: OptionId, bytes: &[u8]) -> usize {
    let n = s.emit(id, bytes);
    if n > 0 {
        s.corrupt_done = true;
    }
    n
}

pub struct IpNoop;

impl OptionGenerator for IpNoop {
    fn generate(&self, s: &mut EditSession) -> usize {
        s.emit(OptionId::IP_NOOP, &[IPOPT_NOOP; IPOPT_NOOP_SIZE])
    }
}

/// IP 时间戳（RFC 781），依赖 TTL 估计。
///
/// 干净放置：空的时间戳区（指针 5，槽位全零）。
/// 腐化放置：按已知跳数预填槽位并把溢出计数器设到会在后续跳溢出的位置。
///
/// 注意部分网络会静默过滤带这个选项的包，所以它不当作无害选项使用。
pub struct IpTimestamp;

impl OptionGenerator for IpTimestamp {
    fn generate(&self, s: &mut EditSession) -> usize {
        // 固定占满 9 个槽位，放不下就不放
        let size = s.negotiate(4, 9, 9, 4);
        if size == 0 {
            return 0;
        }

        let timestamps = (size - 4) / 4;
        let covered = timestamps + TS_OVERFLOW_SPAN;
        if !s.ttl.is_known() || usize::from(s.ttl.ttl_estimate) > covered {
            return 0;
        }

        let mut opt = [0u8; MAX_HDR_OPTIONS];
        opt[0] = IPOPT_TIMESTAMP;
        opt[1] = size as u8;

        if s.corrupt_now {
            let mut last_filled = covered - usize::from(s.ttl.ttl_estimate);
            let mut overflow = 0;
            if last_filled > timestamps {
                overflow = last_filled - timestamps;
                last_filled = timestamps;
            }

            // 指针越过末尾：已满，下一跳只能累加溢出计数
            opt[2] = size as u8 + 1;
            opt[3] = IPOPT_TS_TSONLY | ((overflow as u8) << 4);
            s.rng.fill_bytes(&mut opt[4..4 + last_filled * 4]);

            emit_corrupting(s, OptionId::IP_TIMESTAMP, &opt[..size])
        } else {
            // 空槽位按 RFC 必须为 0
            opt[2] = 5;
            opt[3] = IPOPT_TS_TSONLY;

            s.emit(OptionId::IP_TIMESTAMP, &opt[..size])
        }
    }
}

/// 宽松源路由。
///
/// RFC 1812 规定一个报文出现多个源路由选项是错误，Linux 也会拒绝，
/// 所以只要放置就视为腐化。地址是随机的。
pub struct IpLsrr;

impl OptionGenerator for IpLsrr {
    fn generate(&self, s: &mut EditSession) -> usize {
        let size = s.negotiate(3, 1, 4, 4);
        if size == 0 {
            return 0;
        }

        let mut opt = [0u8; MAX_HDR_OPTIONS];
        opt[0] = IPOPT_LSRR;
        opt[1] = size as u8;
        opt[2] = 4;
        s.rng.fill_bytes(&mut opt[3..size]);

        emit_corrupting(s, OptionId::IP_LSRR, &opt[..size])
    }
}

/// 记录路由。
///
/// 指针设为 size+1（已满），随机地址填充。严格的解析器对指针 < 4
/// 以及指针 + 3 > 长度分别报错，随机内容会触发其中之一。
pub struct IpRr;

impl OptionGenerator for IpRr {
    fn generate(&self, s: &mut EditSession) -> usize {
        let size = s.negotiate(3, 1, 4, 4);
        if size == 0 {
            return 0;
        }

        let mut opt = [0u8; MAX_HDR_OPTIONS];
        opt[0] = IPOPT_RR;
        opt[1] = size as u8;
        opt[2] = size as u8 + 1;
        s.rng.fill_bytes(&mut opt[3..size]);

        s.emit(OptionId::IP_RR, &opt[..size])
    }
}

/// Router Alert（RFC 2113）。值 0 之外都是保留值，这里随机填。
pub struct IpRa;

impl OptionGenerator for IpRa {
    fn generate(&self, s: &mut EditSession) -> usize {
        let mut opt = [0u8; IPOPT_RA_SIZE];
        opt[0] = IPOPT_RA;
        opt[1] = IPOPT_RA_SIZE as u8;
        s.rng.fill_bytes(&mut opt[2..]);

        s.emit(OptionId::IP_RA, &opt)
    }
}

/// CIPSO：合法使用需要 CAP_NET_RAW，随机内容也过不了 cipso 校验。
pub struct IpCipso;

impl OptionGenerator for IpCipso {
    fn generate(&self, s: &mut EditSession) -> usize {
        let mut opt = [0u8; IPOPT_CIPSO_SIZE];
        opt[0] = IPOPT_CIPSO;
        opt[1] = IPOPT_CIPSO_SIZE as u8;
        s.rng.fill_bytes(&mut opt[2..]);

        emit_corrupting(s, OptionId::IP_CIPSO, &opt)
    }
}

pub struct IpSec;

impl OptionGenerator for IpSec {
    fn generate(&self, s: &mut EditSession) -> usize {
        let mut opt = [0u8; IPOPT_SEC_SIZE];
        opt[0] = IPOPT_SEC;
        opt[1] = IPOPT_SEC_SIZE as u8;
        s.rng.fill_bytes(&mut opt[2..]);

        emit_corrupting(s, OptionId::IP_SEC, &opt)
    }
}

/// Session ID：重复出现才腐化。
///
/// 请求腐化而尚未达成时，把自己排成紧随其后的第二次放置。
pub struct IpSid;

impl OptionGenerator for IpSid {
    fn generate(&self, s: &mut EditSession) -> usize {
        let repeated = !s.occurrences(OptionId::IP_SID).is_empty();

        let mut opt = [0u8; IPOPT_SID_SIZE];
        opt[0] = IPOPT_SID;
        opt[1] = IPOPT_SID_SIZE as u8;
        s.rng.fill_bytes(&mut opt[2..]);

        let n = s.emit(OptionId::IP_SID, &opt);
        if n == 0 {
            return 0;
        }

        if repeated {
            s.corrupt_done = true;
        }

        if s.corrupt_requested && !s.corrupt_done {
            s.next_planned = match s.next_planned {
                None => Some(OptionId::IP_SID),
                Some(_) => None,
            };
        }

        n
    }
}

pub struct TcpNop;

impl OptionGenerator for TcpNop {
    fn generate(&self, s: &mut EditSession) -> usize {
        s.emit(OptionId::TCP_NOP, &[TCPOPT_NOP; TCPOPT_NOP_SIZE])
    }
}

/// TCP MD5 签名（RFC 2385），随机摘要。
pub struct TcpMd5Sig;

impl OptionGenerator for TcpMd5Sig {
    fn generate(&self, s: &mut EditSession) -> usize {
        let mut opt = [0u8; TCPOPT_MD5SIG_SIZE];
        opt[0] = TCPOPT_MD5SIG;
        opt[1] = TCPOPT_MD5SIG_SIZE as u8;
        s.rng.fill_bytes(&mut opt[2..]);

        emit_corrupting(s, OptionId::TCP_MD5SIG, &opt)
    }
}

/// TCP 时间戳，TSval 回拨到过去以触发 PAWS 丢弃，TSecr 随机。
pub struct TcpPawsCorrupt;

impl OptionGenerator for TcpPawsCorrupt {
    fn generate(&self, s: &mut EditSession) -> usize {
        let mut opt = [0u8; TCPOPT_TIMESTAMP_SIZE];
        opt[0] = TCPOPT_TIMESTAMP;
        opt[1] = TCPOPT_TIMESTAMP_SIZE as u8;
        let tsval = s.clock.wrapping_sub(s.paws_rewind_secs);
        opt[2..6].copy_from_slice(&tsval.to_be_bytes());
        s.rng.fill_bytes(&mut opt[6..]);

        emit_corrupting(s, OptionId::TCP_PAWS_CORRUPT, &opt)
    }
}
