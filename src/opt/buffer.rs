//! 选项暂存缓冲区
//!
//! 固定容量（40 字节），`len` 之后的字节始终是协议的终止编码。
//! 所有写操作都做边界检查并返回 `Result`。

use thiserror::Error;

use crate::net::MAX_HDR_OPTIONS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("option buffer overflow: need {needed} bytes, {free} free")]
    Overflow { needed: usize, free: usize },

    #[error("range {offset}+{len} outside the {used} used bytes")]
    OutOfRange {
        offset: usize,
        len: usize,
        used: usize,
    },
}

#[derive(Debug, Clone)]
pub struct OptionBuffer {
    bytes: [u8; MAX_HDR_OPTIONS],
    len: usize,
    pad: u8,
}

impl OptionBuffer {
    pub fn new(pad: u8) -> Self {
        Self {
            bytes: [pad; MAX_HDR_OPTIONS],
            len: 0,
            pad,
        }
    }

    /// 用已有的选项字节初始化
    pub fn from_slice(src: &[u8], pad: u8) -> Result<Self, BufferError> {
        let mut buf = Self::new(pad);
        buf.append(src)?;
        Ok(buf)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        MAX_HDR_OPTIONS
    }

    pub fn free(&self) -> usize {
        MAX_HDR_OPTIONS - self.len
    }

    /// 已使用的字节
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// 整个缓冲区，包括尾部填充
    pub fn padded(&self) -> &[u8] {
        &self.bytes
    }

    pub fn append(&mut self, src: &[u8]) -> Result<(), BufferError> {
        if src.len() > self.free() {
            return Err(BufferError::Overflow {
                needed: src.len(),
                free: self.free(),
            });
        }
        self.bytes[self.len..self.len + src.len()].copy_from_slice(src);
        self.len += src.len();
        Ok(())
    }

    /// 删除 `[offset, offset+len)`，后面的字节前移，尾部补填充字节
    pub fn excise(&mut self, offset: usize, len: usize) -> Result<(), BufferError> {
        if offset + len > self.len {
            return Err(BufferError::OutOfRange {
                offset,
                len,
                used: self.len,
            });
        }
        self.bytes.copy_within(offset + len..self.len, offset);
        self.len -= len;
        self.bytes[self.len..].fill(self.pad);
        Ok(())
    }

    /// 清空（用于剥离原有选项）
    pub fn clear(&mut self) {
        self.bytes.fill(self.pad);
        self.len = 0;
    }

    /// 用填充字节补齐到 4 的倍数，返回补了多少字节
    pub fn align(&mut self) -> usize {
        let extra = (4 - self.len % 4) % 4;
        // 容量本身是 4 的倍数，补齐不会越界
        self.bytes[self.len..self.len + extra].fill(self.pad);
        self.len += extra;
        extra
    }
}
