//! 变长选项的尺寸协商

use rand::Rng;

/// 在剩余预算 `available` 内为形如 `fixed + block * k`（`min_blocks <= k <= max_blocks`）
/// 的选项挑一个长度。
///
/// - 恰好等于最小或最大尺寸：原样返回，不留空隙；
/// - 放不下最小尺寸：返回 0；
/// - 比最大尺寸还宽裕：随机挑块数，有意留下空隙给对齐或其他选项；
/// - 介于两者之间：按块粒度向下取整，尽量填满。
pub fn negotiate<R: Rng + ?Sized>(
    rng: &mut R,
    fixed: usize,
    min_blocks: usize,
    max_blocks: usize,
    block: usize,
    available: usize,
) -> usize {
    let min_fit = fixed + min_blocks * block;
    let max_fit = fixed + max_blocks * block;

    // 边界上的精确匹配必须先判断
    if available == min_fit || available == max_fit {
        return available;
    }

    if available < min_fit {
        return 0;
    }

    if available > max_fit {
        return fixed + block * rng.gen_range(min_blocks..=max_blocks);
    }

    fixed + block * ((available - fixed) / block)
}
