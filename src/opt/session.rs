//! 编辑会话
//!
//! 一次注入/删除请求对应一个会话：独占一块选项缓冲区和各选项的出现记录，
//! 生成器和规划器都通过 `&mut EditSession` 读写状态。

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, trace};

use crate::net::{Proto, TtlFocus};

use super::buffer::OptionBuffer;
use super::catalog;
use super::config::InjectorConfig;
use super::error::HdrOptError;
use super::id::OptionId;
use super::negotiate::negotiate;

/// 某个选项在缓冲区中的一次出现
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionOccurrence {
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug)]
pub struct EditSession {
    kind: Proto,
    buf: OptionBuffer,
    target_len: usize,
    occurrences: HashMap<OptionId, Vec<OptionOccurrence>>,
    pub(crate) corrupt_requested: bool,
    pub(crate) corrupt_now: bool,
    pub(crate) corrupt_done: bool,
    pub(crate) next_planned: Option<OptionId>,
    pub(crate) ttl: TtlFocus,
    /// 当前时间（秒），PAWS 腐化使用
    pub(crate) clock: u32,
    pub(crate) paws_rewind_secs: u32,
    demote_percent: u8,
    enabled: Vec<OptionId>,
    disabled: Vec<OptionId>,
    pub(crate) rng: StdRng,
}

impl EditSession {
    /// 以已有的选项字节创建会话（尚未解析）
    pub fn new(
        kind: Proto,
        existing: &[u8],
        ttl: TtlFocus,
        cfg: &InjectorConfig,
    ) -> Result<Self, HdrOptError> {
        let pad = catalog::terminator(kind);
        let buf = OptionBuffer::from_slice(existing, pad).map_err(|_| {
            HdrOptError::OversizedOptions {
                proto: kind,
                len: existing.len(),
                capacity: OptionBuffer::new(pad).capacity(),
            }
        })?;
        let clock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or_default();

        Ok(Self {
            kind,
            target_len: buf.len(),
            buf,
            occurrences: HashMap::new(),
            corrupt_requested: false,
            corrupt_now: false,
            corrupt_done: false,
            next_planned: None,
            ttl,
            clock,
            paws_rewind_secs: cfg.paws_rewind_secs,
            demote_percent: cfg.demote_percent,
            enabled: cfg.enabled_ids(),
            disabled: cfg.disabled_ids(),
            rng: cfg.make_rng(),
        })
    }

    pub fn kind(&self) -> Proto {
        self.kind
    }

    pub fn actual_len(&self) -> usize {
        self.buf.len()
    }

    pub fn target_len(&self) -> usize {
        self.target_len
    }

    pub fn available_len(&self) -> usize {
        self.target_len.saturating_sub(self.buf.len())
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// 已使用的选项字节
    pub fn bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// 整个缓冲区（含尾部填充）
    pub fn padded(&self) -> &[u8] {
        self.buf.padded()
    }

    pub fn occurrences(&self, id: OptionId) -> &[OptionOccurrence] {
        self.occurrences.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn corrupt_requested(&self) -> bool {
        self.corrupt_requested
    }

    pub fn corrupt_done(&self) -> bool {
        self.corrupt_done
    }

    pub fn goal_achieved(&self) -> bool {
        self.corrupt_requested == self.corrupt_done
    }

    pub fn is_disabled(&self, id: OptionId) -> bool {
        self.disabled.contains(&id)
    }

    /// 目录开关与配置覆盖合并后的结果；禁用列表优先
    pub fn is_enabled(&self, id: OptionId) -> bool {
        let on = id.descriptor().is_some_and(|d| d.enabled) || self.enabled.contains(&id);
        on && !self.is_disabled(id)
    }

    /// 覆盖时钟（秒）
    pub fn set_clock(&mut self, clock: u32) {
        self.clock = clock;
    }

    pub(crate) fn set_target(&mut self, target_len: usize) {
        self.target_len = target_len.clamp(self.buf.len(), self.buf.capacity());
    }

    /// 剥离全部已有选项
    pub(crate) fn strip(&mut self) {
        self.buf.clear();
        self.occurrences.clear();
        self.target_len = 0;
    }

    pub(crate) fn register(&mut self, id: OptionId, offset: usize, len: usize) {
        self.occurrences
            .entry(id)
            .or_default()
            .push(OptionOccurrence { offset, len });
    }

    /// 以 `percent`% 的概率返回 true
    pub(crate) fn roll_percent(&mut self, percent: u8) -> bool {
        self.rng.gen_range(0..100u8) < percent
    }

    pub(crate) fn demote_percent(&self) -> u8 {
        self.demote_percent
    }

    /// 在剩余预算内协商变长选项的尺寸
    pub(crate) fn negotiate(&mut self, fixed: usize, min: usize, max: usize, block: usize) -> usize {
        let available = self.available_len();
        negotiate(&mut self.rng, fixed, min, max, block, available)
    }

    /// 把生成器准备好的选项字节追加到 `actual_len` 处并登记出现位置。
    ///
    /// 超出剩余预算时不写入，返回 0。
    pub(crate) fn emit(&mut self, id: OptionId, bytes: &[u8]) -> usize {
        let avail = self.available_len();
        if bytes.is_empty() || bytes.len() > avail {
            return 0;
        }

        let index = self.buf.len();
        if let Err(e) = self.buf.append(bytes) {
            debug!(opt = %id, error = %e, "选项写入失败");
            return 0;
        }

        debug!(
            opt = %id,
            index,
            size = bytes.len(),
            already_present = !self.occurrences(id).is_empty(),
            avail = avail - bytes.len(),
            "** 选项已写入"
        );

        self.register(id, index, bytes.len());
        bytes.len()
    }

    /// 取出某个选项的全部出现记录
    pub(crate) fn take_occurrences(&mut self, id: OptionId) -> Vec<OptionOccurrence> {
        self.occurrences.remove(&id).unwrap_or_default()
    }

    /// 删除一段字节，同时收缩目标长度并修正其他选项的偏移
    pub(crate) fn excise(&mut self, occ: OptionOccurrence) -> bool {
        if let Err(e) = self.buf.excise(occ.offset, occ.len) {
            debug!(error = %e, "删除越界，跳过");
            return false;
        }
        self.target_len = self.target_len.saturating_sub(occ.len);

        for list in self.occurrences.values_mut() {
            for other in list.iter_mut().filter(|o| o.offset > occ.offset) {
                other.offset -= occ.len;
            }
        }
        trace!(offset = occ.offset, len = occ.len, actual = self.buf.len(), "已删除选项字节");
        true
    }

    /// 补齐到 4 字节边界
    pub(crate) fn align(&mut self) {
        let extra = self.buf.align();
        if extra > 0 {
            self.target_len = self.target_len.max(self.buf.len());
            trace!(actual = self.buf.len(), extra, "*+ 已对齐");
        }
    }
}
