//! 头部选项注入引擎
//!
//! 此模块包含选项目录、尺寸协商、暂存缓冲区、已有选项解析、腐化规划和注入编排。

// 子模块声明
mod buffer;
mod catalog;
mod config;
mod error;
mod generators;
mod id;
mod injector;
mod negotiate;
mod parse;
mod planner;
mod session;

// 重新导出公共接口
pub use buffer::{BufferError, OptionBuffer};
pub use catalog::{
    CATALOG, CorruptionKind, IPOPT_CIPSO, IPOPT_END, IPOPT_LSRR, IPOPT_NOOP, IPOPT_RA, IPOPT_RR,
    IPOPT_SEC, IPOPT_SID, IPOPT_TIMESTAMP, IPOPT_TS_TSONLY, OptionDescriptor, OptionGenerator,
    RFC_UNEXISTENT_CODE, TCPOPT_EOL, TCPOPT_MD5SIG, TCPOPT_MSS, TCPOPT_NOP, TCPOPT_SACK,
    TCPOPT_TIMESTAMP, by_key, ids, in_range, lookup,
};
pub use config::{DEFAULT_DEMOTE_PERCENT, DEFAULT_MTU, DEFAULT_PAWS_REWIND_SECS, InjectorConfig};
pub use error::{ConfigError, HdrOptError};
pub use id::OptionId;
pub use injector::HdrOptions;
pub use negotiate::negotiate;
pub use session::{EditSession, OptionOccurrence};

pub use generators::{
    IPOPT_CIPSO_SIZE, IPOPT_RA_SIZE, IPOPT_SEC_SIZE, IPOPT_SID_SIZE, TCPOPT_MD5SIG_SIZE,
    TCPOPT_TIMESTAMP_SIZE,
};

#[cfg(test)]
pub(crate) use parse::checkup;
#[cfg(test)]
pub(crate) use planner::check_condition;
