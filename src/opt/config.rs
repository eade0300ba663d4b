//! 注入器配置
//!
//! 可从 JSON 加载；所有字段都有默认值。

use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::net::{IP_HDR_BASE, TCP_HDR_BASE};

use super::catalog;
use super::error::ConfigError;
use super::id::OptionId;

pub const DEFAULT_MTU: usize = 1500;
pub const DEFAULT_DEMOTE_PERCENT: u8 = 40;
pub const DEFAULT_PAWS_REWIND_SECS: u32 = 600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InjectorConfig {
    /// 注入后数据包允许达到的最大长度
    pub mtu: usize,
    /// 选项区尚空（< 4 字节）时把腐化请求降级为干净放置的概率
    pub demote_percent: u8,
    /// 固定随机种子；缺省时从系统熵初始化
    pub seed: Option<u64>,
    /// 额外启用目录中默认关闭的选项（例如 "tcp_md5sig"）
    pub enabled: Vec<String>,
    /// 禁用的选项（目录中的配置键，例如 "ip_lsrr"），优先于 `enabled`
    pub disabled: Vec<String>,
    /// PAWS 腐化时把时间戳回拨多少秒
    pub paws_rewind_secs: u32,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            demote_percent: DEFAULT_DEMOTE_PERCENT,
            seed: None,
            enabled: Vec::new(),
            disabled: Vec::new(),
            paws_rewind_secs: DEFAULT_PAWS_REWIND_SECS,
        }
    }
}

impl InjectorConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let cfg: InjectorConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.demote_percent > 100 {
            return Err(ConfigError::DemotePercent(self.demote_percent));
        }
        if self.mtu < IP_HDR_BASE + TCP_HDR_BASE {
            return Err(ConfigError::Mtu(self.mtu));
        }
        if let Some(key) = self
            .enabled
            .iter()
            .chain(&self.disabled)
            .find(|k| catalog::by_key(k).is_none())
        {
            return Err(ConfigError::UnknownOption(key.clone()));
        }
        Ok(())
    }

    pub fn enabled_ids(&self) -> Vec<OptionId> {
        resolve_keys(&self.enabled, "enabled")
    }

    pub fn disabled_ids(&self) -> Vec<OptionId> {
        resolve_keys(&self.disabled, "disabled")
    }

    pub fn make_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// 把配置键解析为标识符；未知的键只记录警告
fn resolve_keys(keys: &[String], list: &str) -> Vec<OptionId> {
    keys.iter()
        .filter_map(|key| {
            let id = catalog::by_key(key);
            if id.is_none() {
                warn!(key = %key, list, "忽略未知的选项键");
            }
            id
        })
        .collect()
}
