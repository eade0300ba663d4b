//! 数据包类型
//!
//! IPv4 + TCP 报文的最小模型：解析、构造、头部/负载大小调整，
//! 以及调整之后的长度字段和校验和修正。

use std::net::Ipv4Addr;

use thiserror::Error;
use tracing::{trace, warn};

use super::api::{OptionHost, Proto};

/// IPv4 基本头长度（不含选项）
pub const IP_HDR_BASE: usize = 20;
/// TCP 基本头长度（不含选项）
pub const TCP_HDR_BASE: usize = 20;
/// 任一头部选项区的最大长度
pub const MAX_HDR_OPTIONS: usize = 40;

const IPPROTO_TCP: u8 = 6;

pub const TCP_FIN: u8 = 0x01;
pub const TCP_SYN: u8 = 0x02;
pub const TCP_RST: u8 = 0x04;
pub const TCP_PSH: u8 = 0x08;
pub const TCP_ACK: u8 = 0x10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet too short: need {needed} bytes, have {have}")]
    TooShort { needed: usize, have: usize },

    #[error("not an IPv4 packet (version {0})")]
    NotIpv4(u8),

    #[error("unsupported transport protocol {0}, only TCP is handled")]
    NotTcp(u8),

    #[error("invalid {header} header length {len}")]
    BadHeaderLen { header: &'static str, len: usize },

    #[error("IP total length {declared} does not match buffer length {actual}")]
    LengthMismatch { declared: usize, actual: usize },
}

/// IPv4/TCP 数据包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pbuf: Vec<u8>,
    ip_hdr_len: usize,
    tcp_hdr_len: usize,
}

impl Packet {
    /// 从原始字节解析；只接受完整的 IPv4/TCP 报文。
    pub fn from_bytes(pbuf: Vec<u8>) -> Result<Self, PacketError> {
        if pbuf.len() < IP_HDR_BASE {
            return Err(PacketError::TooShort {
                needed: IP_HDR_BASE,
                have: pbuf.len(),
            });
        }

        let version = pbuf[0] >> 4;
        if version != 4 {
            return Err(PacketError::NotIpv4(version));
        }

        let ip_hdr_len = usize::from(pbuf[0] & 0x0f) * 4;
        if ip_hdr_len < IP_HDR_BASE || ip_hdr_len > pbuf.len() {
            return Err(PacketError::BadHeaderLen {
                header: "IP",
                len: ip_hdr_len,
            });
        }

        let declared = usize::from(u16::from_be_bytes([pbuf[2], pbuf[3]]));
        if declared != pbuf.len() {
            return Err(PacketError::LengthMismatch {
                declared,
                actual: pbuf.len(),
            });
        }

        if pbuf[9] != IPPROTO_TCP {
            return Err(PacketError::NotTcp(pbuf[9]));
        }

        if pbuf.len() < ip_hdr_len + TCP_HDR_BASE {
            return Err(PacketError::TooShort {
                needed: ip_hdr_len + TCP_HDR_BASE,
                have: pbuf.len(),
            });
        }

        let tcp_hdr_len = usize::from(pbuf[ip_hdr_len + 12] >> 4) * 4;
        if tcp_hdr_len < TCP_HDR_BASE || ip_hdr_len + tcp_hdr_len > pbuf.len() {
            return Err(PacketError::BadHeaderLen {
                header: "TCP",
                len: tcp_hdr_len,
            });
        }

        Ok(Self {
            pbuf,
            ip_hdr_len,
            tcp_hdr_len,
        })
    }

    /// 构造一个不带选项的 TCP 数据段（ACK|PSH，TTL 64）。
    pub fn tcp_v4(
        src: Ipv4Addr,
        dst: Ipv4Addr,
        sport: u16,
        dport: u16,
        seq: u32,
        payload: &[u8],
    ) -> Self {
        let mut pbuf = vec![0u8; IP_HDR_BASE + TCP_HDR_BASE + payload.len()];

        pbuf[0] = 0x45;
        pbuf[8] = 64;
        pbuf[9] = IPPROTO_TCP;
        pbuf[12..16].copy_from_slice(&src.octets());
        pbuf[16..20].copy_from_slice(&dst.octets());

        let tcp = IP_HDR_BASE;
        pbuf[tcp..tcp + 2].copy_from_slice(&sport.to_be_bytes());
        pbuf[tcp + 2..tcp + 4].copy_from_slice(&dport.to_be_bytes());
        pbuf[tcp + 4..tcp + 8].copy_from_slice(&seq.to_be_bytes());
        pbuf[tcp + 12] = ((TCP_HDR_BASE / 4) as u8) << 4;
        pbuf[tcp + 13] = TCP_ACK | TCP_PSH;
        pbuf[tcp + 14..tcp + 16].copy_from_slice(&u16::MAX.to_be_bytes());

        pbuf[IP_HDR_BASE + TCP_HDR_BASE..].copy_from_slice(payload);

        let mut pkt = Self {
            pbuf,
            ip_hdr_len: IP_HDR_BASE,
            tcp_hdr_len: TCP_HDR_BASE,
        };
        pkt.fix_lengths();
        pkt
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pbuf
    }

    pub fn len(&self) -> usize {
        self.pbuf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pbuf.is_empty()
    }

    pub fn ip_hdr_len(&self) -> usize {
        self.ip_hdr_len
    }

    pub fn tcp_hdr_len(&self) -> usize {
        self.tcp_hdr_len
    }

    pub fn ip_options(&self) -> &[u8] {
        &self.pbuf[IP_HDR_BASE..self.ip_hdr_len]
    }

    pub fn tcp_options(&self) -> &[u8] {
        let start = self.ip_hdr_len + TCP_HDR_BASE;
        &self.pbuf[start..self.ip_hdr_len + self.tcp_hdr_len]
    }

    pub fn payload(&self) -> &[u8] {
        &self.pbuf[self.ip_hdr_len + self.tcp_hdr_len..]
    }

    pub fn ttl(&self) -> u8 {
        self.pbuf[8]
    }

    pub fn saddr(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.pbuf[12], self.pbuf[13], self.pbuf[14], self.pbuf[15])
    }

    pub fn daddr(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.pbuf[16], self.pbuf[17], self.pbuf[18], self.pbuf[19])
    }

    /// MF 置位或分片偏移非零
    pub fn is_fragment(&self) -> bool {
        let frag = u16::from_be_bytes([self.pbuf[6], self.pbuf[7]]);
        frag & 0x2000 != 0 || frag & 0x1fff != 0
    }

    pub fn sport(&self) -> u16 {
        let t = self.ip_hdr_len;
        u16::from_be_bytes([self.pbuf[t], self.pbuf[t + 1]])
    }

    pub fn dport(&self) -> u16 {
        let t = self.ip_hdr_len;
        u16::from_be_bytes([self.pbuf[t + 2], self.pbuf[t + 3]])
    }

    pub fn seq(&self) -> u32 {
        let t = self.ip_hdr_len + 4;
        u32::from_be_bytes([self.pbuf[t], self.pbuf[t + 1], self.pbuf[t + 2], self.pbuf[t + 3]])
    }

    pub fn set_seq(&mut self, seq: u32) {
        let t = self.ip_hdr_len + 4;
        self.pbuf[t..t + 4].copy_from_slice(&seq.to_be_bytes());
        self.fix_checksums();
    }

    pub fn tcp_flags(&self) -> u8 {
        self.pbuf[self.ip_hdr_len + 13]
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.tcp_flags() & flag != 0
    }

    pub fn set_flag(&mut self, flag: u8, on: bool) {
        let at = self.ip_hdr_len + 13;
        if on {
            self.pbuf[at] |= flag;
        } else {
            self.pbuf[at] &= !flag;
        }
        self.fix_checksums();
    }

    /// 替换某个头部的选项区。
    ///
    /// `opts` 长度必须是 4 的倍数且不超过 40 字节；负载原样保留。
    pub fn set_options(&mut self, proto: Proto, opts: &[u8]) -> Result<(), PacketError> {
        if opts.len() > MAX_HDR_OPTIONS || opts.len() % 4 != 0 {
            return Err(PacketError::BadHeaderLen {
                header: proto.label(),
                len: opts.len(),
            });
        }

        match proto {
            Proto::Ip => {
                self.pbuf.splice(IP_HDR_BASE..self.ip_hdr_len, opts.iter().copied());
                self.ip_hdr_len = IP_HDR_BASE + opts.len();
            }
            Proto::Tcp => {
                let start = self.ip_hdr_len + TCP_HDR_BASE;
                let end = self.ip_hdr_len + self.tcp_hdr_len;
                self.pbuf.splice(start..end, opts.iter().copied());
                self.tcp_hdr_len = TCP_HDR_BASE + opts.len();
            }
        }

        trace!(
            proto = proto.label(),
            ip_hdr_len = self.ip_hdr_len,
            tcp_hdr_len = self.tcp_hdr_len,
            pkt_len = self.pbuf.len(),
            "头部大小已调整"
        );

        self.fix_lengths();
        Ok(())
    }

    /// 调整 TCP 负载长度（截断或补零）
    pub fn resize_tcp_payload(&mut self, len: usize) {
        self.pbuf.resize(self.ip_hdr_len + self.tcp_hdr_len + len, 0);
        self.fix_lengths();
    }

    /// IP 头校验和是否有效
    pub fn ip_checksum_ok(&self) -> bool {
        fold(sum_words(&self.pbuf[..self.ip_hdr_len], 0)) == 0
    }

    /// TCP 校验和（含伪首部）是否有效
    pub fn tcp_checksum_ok(&self) -> bool {
        let segment = &self.pbuf[self.ip_hdr_len..];
        fold(sum_words(segment, self.pseudo_header_sum())) == 0
    }

    fn fix_lengths(&mut self) {
        let total = self.pbuf.len() as u16;
        self.pbuf[0] = 0x40 | (self.ip_hdr_len / 4) as u8;
        self.pbuf[2..4].copy_from_slice(&total.to_be_bytes());

        let doff = self.ip_hdr_len + 12;
        self.pbuf[doff] = (((self.tcp_hdr_len / 4) as u8) << 4) | (self.pbuf[doff] & 0x0f);

        self.fix_checksums();
    }

    fn fix_checksums(&mut self) {
        self.pbuf[10..12].fill(0);
        let ip_sum = fold(sum_words(&self.pbuf[..self.ip_hdr_len], 0));
        self.pbuf[10..12].copy_from_slice(&ip_sum.to_be_bytes());

        let csum = self.ip_hdr_len + 16;
        self.pbuf[csum..csum + 2].fill(0);
        let tcp_sum = fold(sum_words(&self.pbuf[self.ip_hdr_len..], self.pseudo_header_sum()));
        self.pbuf[csum..csum + 2].copy_from_slice(&tcp_sum.to_be_bytes());
    }

    fn pseudo_header_sum(&self) -> u32 {
        let tcp_len = (self.pbuf.len() - self.ip_hdr_len) as u32;
        let sum = sum_words(&self.pbuf[12..20], 0);
        sum + u32::from(IPPROTO_TCP) + tcp_len
    }
}

impl OptionHost for Packet {
    fn packet_len(&self) -> usize {
        self.pbuf.len()
    }

    fn options(&self, proto: Proto) -> &[u8] {
        match proto {
            Proto::Ip => self.ip_options(),
            Proto::Tcp => self.tcp_options(),
        }
    }

    fn resize_options(&mut self, proto: Proto, opts: &[u8]) {
        if let Err(e) = self.set_options(proto, opts) {
            warn!(error = %e, "选项区写回失败，数据包保持不变");
        }
    }
}

fn sum_words(data: &[u8], mut sum: u32) -> u32 {
    let mut words = data.chunks_exact(2);
    for w in &mut words {
        sum += u32::from(u16::from_be_bytes([w[0], w[1]]));
    }
    if let [last] = words.remainder() {
        sum += u32::from(*last) << 8;
    }
    sum
}

fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}
