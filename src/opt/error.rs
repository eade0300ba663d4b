//! 注入引擎与配置的错误类型

use thiserror::Error;

use crate::net::Proto;

/// 注入引擎的致命错误。
///
/// 发生时数据包未被修改，由调用方决定丢弃还是原样放行。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HdrOptError {
    #[error(
        "invalid {} option: code {code:#04x} declared length {declared} residual {residual}",
        .proto.label()
    )]
    MalformedOptions {
        proto: Proto,
        code: u8,
        declared: usize,
        residual: usize,
    },

    #[error("{} option area of {len} bytes exceeds capacity {capacity}", .proto.label())]
    OversizedOptions {
        proto: Proto,
        len: usize,
        capacity: usize,
    },
}

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown option key in config: {0}")]
    UnknownOption(String),

    #[error("demote_percent must be within 0..=100, got {0}")]
    DemotePercent(u8),

    #[error("mtu {0} is smaller than the minimal IPv4/TCP packet")]
    Mtu(usize),
}
