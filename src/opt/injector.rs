//! 注入编排
//!
//! 把一个会话绑定到一个数据包上，驱动定向注入、随机扫描注入和删除。
//! 只有目标达成（请求的腐化状态 == 实际腐化状态）时才把缓冲区写回数据包，
//! 否则数据包保持原样。

use rand::Rng;
use tracing::{debug, trace};

use crate::net::{OptionHost, Proto, TtlFocus};

use super::catalog;
use super::config::InjectorConfig;
use super::error::HdrOptError;
use super::id::OptionId;
use super::parse;
use super::planner;
use super::session::EditSession;

pub struct HdrOptions<'p> {
    pkt: &'p mut dyn OptionHost,
    mtu: usize,
    session: EditSession,
}

impl<'p> HdrOptions<'p> {
    /// 创建会话并登记数据包中已有的选项。
    ///
    /// 已有选项畸形时返回错误，数据包不会被修改。
    pub fn new(
        kind: Proto,
        pkt: &'p mut dyn OptionHost,
        ttl: TtlFocus,
        cfg: &InjectorConfig,
    ) -> Result<Self, HdrOptError> {
        let mut session = EditSession::new(kind, pkt.options(kind), ttl, cfg)?;
        parse::checkup(&mut session)?;

        Ok(Self {
            pkt,
            mtu: cfg.mtu,
            session,
        })
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditSession {
        &mut self.session
    }

    /// 计算可用空间并记录腐化请求。
    ///
    /// 剩余空间（按 4 字节向下取整）为 0 时返回 false，会话状态不变。
    pub fn prepare_injection(&mut self, corrupt: bool, strip_previous: bool) -> bool {
        let mut free = self.mtu.saturating_sub(self.pkt.packet_len());
        let mut actual = self.session.actual_len();

        if strip_previous {
            free += actual;
            actual = 0;
        }

        // 头部长度必须是 4 的倍数
        free -= free % 4;
        if free == 0 {
            debug!(
                pkt_len = self.pkt.packet_len(),
                mtu = self.mtu,
                "没有剩余空间，放弃注入"
            );
            return false;
        }

        if strip_previous {
            self.session.strip();
        }

        self.session.set_target(actual + free);
        self.session.corrupt_requested = corrupt;
        true
    }

    /// 定向注入单个选项
    #[tracing::instrument(skip(self), fields(kind = self.session.kind().label(), opt = %id))]
    pub fn inject_option(&mut self, id: OptionId) -> bool {
        if !catalog::in_range(self.session.kind(), id) {
            debug!("选项不属于该协议");
            return false;
        }

        self.log_state("*1");

        if planner::check_condition(&mut self.session, id) && self.attempt(id) > 0 {
            self.follow_up();
        }

        self.session.align();
        self.finish()
    }

    /// 从随机位置开始循环尝试该协议的每个选项，空间耗尽即停
    #[tracing::instrument(skip(self), fields(kind = self.session.kind().label()))]
    pub fn inject_random(&mut self) -> bool {
        let ids = catalog::ids(self.session.kind());
        let count = ids.len();
        if count == 0 {
            return self.finish();
        }

        self.log_state("*1");

        let start = self.session.rng.gen_range(0..count);
        for step in 0..count {
            if self.session.available_len() == 0 {
                break;
            }

            let id = OptionId(ids.start + (start + step) % count);
            if !planner::check_condition(&mut self.session, id) {
                continue;
            }

            if self.attempt(id) > 0 {
                self.follow_up();
            }
        }

        self.session.align();
        self.finish()
    }

    /// 准备并定向注入
    pub fn inject_opt(&mut self, corrupt: bool, strip_previous: bool, id: OptionId) -> bool {
        if !catalog::in_range(self.session.kind(), id) {
            return false;
        }
        if !self.prepare_injection(corrupt, strip_previous) {
            return false;
        }
        self.inject_option(id)
    }

    /// 准备并随机注入
    pub fn inject_random_opts(&mut self, corrupt: bool, strip_previous: bool) -> bool {
        if !self.prepare_injection(corrupt, strip_previous) {
            return false;
        }
        self.inject_random()
    }

    /// 删除某个选项的全部出现并写回（无目标判定）
    #[tracing::instrument(skip(self), fields(kind = self.session.kind().label(), opt = %id))]
    pub fn remove_option(&mut self, id: OptionId) -> bool {
        if !catalog::in_range(self.session.kind(), id) {
            return false;
        }

        let mut occs = self.session.take_occurrences(id);
        if occs.is_empty() {
            debug!("没有可删除的选项");
            return false;
        }

        // 从后往前删，前面的偏移保持有效
        occs.sort_by(|a, b| b.offset.cmp(&a.offset));
        for occ in occs {
            self.session.excise(occ);
        }

        self.session.align();
        self.commit();
        true
    }

    /// 调用生成器，返回写入的字节数
    fn attempt(&mut self, id: OptionId) -> usize {
        let Some(generator) = id.descriptor().and_then(|d| d.generator) else {
            return 0;
        };
        let n = generator.generate(&mut self.session);
        if n == 0 {
            trace!(opt = %id, avail = self.session.available_len(), "生成器放弃");
        }
        n
    }

    /// TWOSHOT 的第二次放置；失败不是错误，由调用方另行重试
    fn follow_up(&mut self) {
        if let Some(next) = self.session.next_planned.take() {
            if self.attempt(next) == 0 {
                debug!(opt = %next, "TWOSHOT 第二次放置失败");
            }
        }
    }

    fn finish(&mut self) -> bool {
        let goal = self.session.goal_achieved();
        self.log_state("*2");
        if goal {
            self.commit();
        }
        goal
    }

    fn commit(&mut self) {
        let kind = self.session.kind();
        self.pkt.resize_options(kind, self.session.bytes());
        debug!(
            kind = kind.label(),
            opts_len = self.session.actual_len(),
            pkt_len = self.pkt.packet_len(),
            "选项区已写回"
        );
    }

    fn log_state(&self, stage: &str) {
        let s = &self.session;
        debug!(
            stage,
            actual = s.actual_len(),
            target = s.target_len(),
            avail = s.available_len(),
            corrupt_requested = s.corrupt_requested(),
            corrupt_done = s.corrupt_done(),
            goal = s.goal_achieved(),
            "注入状态"
        );
    }
}
