//! 腐化规划
//!
//! 每次尝试放置某个选项之前调用，决定这一次是腐化放置还是干净放置，
//! 并据此判断该选项是否允许放置。

use tracing::trace;

use super::catalog::CorruptionKind;
use super::id::OptionId;
use super::session::EditSession;

/// 返回 true 时才调用该选项的生成器
pub fn check_condition(s: &mut EditSession, id: OptionId) -> bool {
    s.corrupt_now = s.corrupt_requested;

    let Some(desc) = id.descriptor() else {
        return false;
    };

    // 全局开关：目录中的 enabled 以及配置中的启用/禁用列表
    if desc.generator.is_none() || !s.is_enabled(id) {
        trace!(opt = %id, "选项已禁用");
        return false;
    }

    // 已经腐化过就不再腐化；选项区还空着的时候偏向干净放置
    let demote = s.demote_percent();
    if s.corrupt_now && (s.corrupt_done || (s.actual_len() < 4 && s.roll_percent(demote))) {
        s.corrupt_now = false;
    }

    let permit = if s.corrupt_now {
        desc.corruption != CorruptionKind::NotCorrupt
    } else if desc.corruption != CorruptionKind::OneShot && s.occurrences(id).is_empty() {
        // 干净放置：避开单次即腐化的选项，也不重复放置
        s.next_planned = None;
        true
    } else {
        false
    };

    trace!(opt = %id, corrupt_now = s.corrupt_now, permit, "规划结果");
    permit
}
