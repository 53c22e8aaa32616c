//! 错误类型定义
//!
//! 提供缓存与块设备操作的错误类型。

use core::fmt;

/// 缓存操作错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// I/O 错误
    Io,
    /// 无效参数
    InvalidInput,
    /// 无效状态（句柄不属于当前缓存等）
    InvalidState,
    /// 所有缓存块都被引用，无法驱逐
    CacheExhausted,
    /// 块号超出设备范围
    OutOfRange,
    /// 设备只读
    ReadOnly,
}

impl Error {
    /// 创建新错误
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// 获取错误类型
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误消息
    pub const fn message(&self) -> &'static str {
        self.message
    }

    /// 是否是缓存耗尽错误
    pub const fn is_exhausted(&self) -> bool {
        matches!(self.kind, ErrorKind::CacheExhausted)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result 类型别名
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::new(ErrorKind::CacheExhausted, "bget: no buffers");
        assert_eq!(err.to_string(), "CacheExhausted: bget: no buffers");
        assert!(err.is_exhausted());
        assert_eq!(err.kind(), ErrorKind::CacheExhausted);
        assert_eq!(err.message(), "bget: no buffers");
    }

    #[test]
    fn test_error_kind_eq() {
        let a = Error::new(ErrorKind::Io, "disk");
        let b = Error::new(ErrorKind::Io, "disk");
        assert_eq!(a, b);
        assert!(!a.is_exhausted());
    }
}
