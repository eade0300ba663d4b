//! 已有选项的校验与索引
//!
//! 注入之前必须先登记报文中已经存在的选项，否则规划器看不到重复放置。

use tracing::{debug, trace};

use super::catalog;
use super::error::HdrOptError;
use super::session::EditSession;

/// 顺序扫描会话缓冲区中的已有选项。
///
/// NOOP 前进一字节，终止编码结束扫描；其余选项读取长度字节，
/// 长度为 0 或超出剩余字节即判定为畸形。无法识别的编码只记录日志，字节保留。
pub fn checkup(session: &mut EditSession) -> Result<(), HdrOptError> {
    let kind = session.kind();
    let noop = catalog::noop(kind);
    let end = catalog::terminator(kind);
    let opts = session.bytes().to_vec();

    let mut i = 0;
    while i < opts.len() {
        let code = opts[i];

        if code == noop {
            i += 1;
            continue;
        }

        if code == end {
            break;
        }

        let residual = opts.len() - i;
        // 缺少长度字节时按 0 处理
        let declared = opts.get(i + 1).copied().map(usize::from).unwrap_or(0);
        if declared == 0 || declared > residual {
            return Err(HdrOptError::MalformedOptions {
                proto: kind,
                code,
                declared,
                residual,
            });
        }

        match catalog::lookup(kind, code) {
            Some(id) => {
                trace!(opt = %id, offset = i, len = declared, "登记已有选项");
                session.register(id, i, declared);
            }
            None => {
                debug!(proto = kind.label(), code, "INFO: 未收录的选项");
            }
        }

        i += declared;
    }

    Ok(())
}
