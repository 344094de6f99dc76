//! インスタンスID生成モジュール
//!
//! 64ビットのflake ID:
//! - 上位42ビット: UNIXエポックからのミリ秒
//! - 5ビット: datacenter
//! - 5ビット: worker
//! - 下位12ビット: 同一ミリ秒内のシーケンス

use crate::config::MAX_NODE_ID;
use crate::error::IdError;
use chrono::Utc;

const SEQUENCE_BITS: u32 = 12;
const WORKER_BITS: u32 = 5;
const DATA_CENTER_BITS: u32 = 5;

const WORKER_SHIFT: u32 = SEQUENCE_BITS;
const DATA_CENTER_SHIFT: u32 = SEQUENCE_BITS + WORKER_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_BITS + DATA_CENTER_BITS;

const SEQUENCE_MASK: u16 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << 42) - 1;

/// flake ID生成器
#[derive(Debug)]
pub struct FlakeIdGenerator {
    data_center: u8,
    worker: u8,
    last_ms: i64,
    sequence: u16,
}

impl FlakeIdGenerator {
    /// 新しい生成器を作成
    pub fn new(data_center: u8, worker: u8) -> Result<Self, IdError> {
        if data_center > MAX_NODE_ID || worker > MAX_NODE_ID {
            return Err(IdError::InvalidNode {
                data_center,
                worker,
            });
        }

        Ok(Self {
            data_center,
            worker,
            last_ms: -1,
            sequence: 0,
        })
    }

    /// 次のIDを生成
    ///
    /// 同一ミリ秒内でシーケンスを使い切った場合は次のミリ秒まで待つ
    pub fn next_id(&mut self) -> Result<u64, IdError> {
        loop {
            match self.next_id_at(Utc::now().timestamp_millis())? {
                Some(id) => return Ok(id),
                None => std::thread::yield_now(),
            }
        }
    }

    /// 指定時刻でIDを生成（シーケンス枯渇時は`None`）
    fn next_id_at(&mut self, now_ms: i64) -> Result<Option<u64>, IdError> {
        if now_ms < self.last_ms {
            return Err(IdError::ClockMovedBackwards {
                last_ms: self.last_ms,
                now_ms,
            });
        }

        if now_ms == self.last_ms {
            if self.sequence >= SEQUENCE_MASK {
                return Ok(None);
            }
            self.sequence += 1;
        } else {
            self.last_ms = now_ms;
            self.sequence = 0;
        }

        Ok(Some(self.compose(now_ms)))
    }

    fn compose(&self, now_ms: i64) -> u64 {
        let timestamp = (now_ms.max(0) as u64) & TIMESTAMP_MASK;
        (timestamp << TIMESTAMP_SHIFT)
            | (u64::from(self.data_center) << DATA_CENTER_SHIFT)
            | (u64::from(self.worker) << WORKER_SHIFT)
            | u64::from(self.sequence)
    }
}

/// IDを`0x`付きの小文字16進文字列に変換
pub fn format_hex(id: u64) -> String {
    format!("{:#x}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_node_rejected() {
        assert_eq!(
            FlakeIdGenerator::new(32, 0).unwrap_err(),
            IdError::InvalidNode {
                data_center: 32,
                worker: 0
            }
        );
        assert!(FlakeIdGenerator::new(0, 32).is_err());
        assert!(FlakeIdGenerator::new(31, 31).is_ok());
    }

    #[test]
    fn test_bit_layout() {
        let mut generator = FlakeIdGenerator::new(3, 5).unwrap();
        let id = generator.next_id_at(1_000).unwrap().unwrap();

        assert_eq!(id >> TIMESTAMP_SHIFT, 1_000);
        assert_eq!((id >> DATA_CENTER_SHIFT) & 0x1f, 3);
        assert_eq!((id >> WORKER_SHIFT) & 0x1f, 5);
        assert_eq!(id & u64::from(SEQUENCE_MASK), 0);
    }

    #[test]
    fn test_sequence_increments_within_same_millisecond() {
        let mut generator = FlakeIdGenerator::new(0, 0).unwrap();
        let first = generator.next_id_at(500).unwrap().unwrap();
        let second = generator.next_id_at(500).unwrap().unwrap();
        assert_eq!(second, first + 1);

        // 次のミリ秒でシーケンスはリセット
        let third = generator.next_id_at(501).unwrap().unwrap();
        assert_eq!(third & u64::from(SEQUENCE_MASK), 0);
        assert!(third > second);
    }

    #[test]
    fn test_sequence_exhaustion_waits() {
        let mut generator = FlakeIdGenerator::new(0, 0).unwrap();
        for _ in 0..=SEQUENCE_MASK {
            assert!(generator.next_id_at(42).unwrap().is_some());
        }
        assert_eq!(generator.next_id_at(42).unwrap(), None);
        assert!(generator.next_id_at(43).unwrap().is_some());
    }

    #[test]
    fn test_clock_moved_backwards() {
        let mut generator = FlakeIdGenerator::new(0, 0).unwrap();
        generator.next_id_at(100).unwrap();
        assert_eq!(
            generator.next_id_at(99),
            Err(IdError::ClockMovedBackwards {
                last_ms: 100,
                now_ms: 99
            })
        );
    }

    #[test]
    fn test_next_id_is_strictly_increasing() {
        let mut generator = FlakeIdGenerator::new(1, 1).unwrap();
        let mut previous = generator.next_id().unwrap();
        for _ in 0..10_000 {
            let id = generator.next_id().unwrap();
            assert!(id > previous);
            previous = id;
        }
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(0x1a2b), "0x1a2b");
        assert_eq!(format_hex(0xABCDEF), "0xabcdef");
    }
}
