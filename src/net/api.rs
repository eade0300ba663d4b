//! Packet-facing API used by the option injection engine.

/// 头部选择：IP 头或 TCP 头。
///
/// 同时用作目录中选项所属协议和注入器类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Proto {
    Ip,
    Tcp,
}

impl Proto {
    pub fn label(self) -> &'static str {
        match self {
            Proto::Ip => "IP",
            Proto::Tcp => "TCP",
        }
    }
}

/// Minimal packet API for option editing.
///
/// The engine only ever reads the current option bytes of one header and
/// writes a new, 4-byte aligned option area back.
pub trait OptionHost {
    /// Total length of the packet on the wire.
    fn packet_len(&self) -> usize;
    /// Option bytes currently carried by the selected header.
    fn options(&self, proto: Proto) -> &[u8];
    /// Replace the option area, resizing the header and keeping the payload.
    fn resize_options(&mut self, proto: Proto, opts: &[u8]);
}
