//! 제어 사이클 생성기 (cdea)
//!
//! 송신 슬롯마다 한 번 호출되어 필러 프레임을 낼지 제어 사이클 프레임을
//! 낼지 결정한다. 케이던스 카운터가 0에 도달하면 제어 프레임을 내고
//! 주기를 리셋한다. 제어 페이로드는 현재 채널 인덱스/바이트 오프셋과
//! 직전에 보낸 두 바이트에서 고정 함수로 유도되며, 채널 인덱스는 제어
//! 프레임마다 라운드로빈으로 전진한다.
//!
//! 핸드쉐이크가 Connected에 도달한 뒤에는 마스터/슬레이브 양쪽에서
//! 동일하게 동작한다.

use crate::frame::StreamType;
use crate::FRAME_DATA_LEN;

/// 제어 페이로드 식별 마커 (data[0] 고정값)
pub const CDEA_MARKER: u8 = 0x02;

/// 바이트 오프셋 랩 주기 (프레임당 샘플 슬롯 수)
pub const CDEA_OFFSET_WRAP: u8 = 12;

/// 체이닝 초기 시드 (프로토콜 고정값, 0은 체이닝 고정점이라 제외)
pub const CDEA_SEED: [u8; 2] = [0xcd, 0xea];

/// 한 송신 슬롯의 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSlot {
    /// 케이던스 유지용 필러 (데이터는 체크섬 외 0)
    Filler,

    /// 채널별 제어 사이클 프레임
    Control,
}

/// 제어 사이클 상태기계
#[derive(Debug)]
pub struct ControlCycleGenerator {
    /// 제어 프레임 주기
    interval: u32,

    /// 다음 제어 프레임까지 남은 슬롯 수
    packets_until_next_cdea: u32,

    /// 현재 채널 인덱스 (제어 프레임마다 라운드로빈)
    at_channel: u8,

    /// 현재 바이트 오프셋
    current_offset: u8,

    /// 직전에 보낸 제어 두 바이트 (다음 페이로드 유도에 사용)
    last_two_bytes: [u8; 2],

    /// 라운드로빈 대상 채널 수
    channel_count: u8,
}

/// 직전 두 바이트에서 다음 두 바이트를 유도하는 고정 체이닝 함수
///
/// 프로토콜이 정의하는 결정적 함수이며 자유 선택이 아니다. 같은 이전
/// 상태는 항상 같은 다음 바이트를 만든다.
fn derive_next_bytes(prev: [u8; 2]) -> [u8; 2] {
    let a = prev[0].rotate_left(3) ^ prev[1];
    let b = prev[1].wrapping_add(a).rotate_left(5);
    [a, b]
}

impl ControlCycleGenerator {
    pub fn new(interval: u32, channel_count: u8) -> Self {
        Self {
            interval: interval.max(1),
            packets_until_next_cdea: interval.max(1),
            at_channel: 0,
            current_offset: 0,
            last_two_bytes: CDEA_SEED,
            channel_count: channel_count.max(1),
        }
    }

    /// 다음 송신 슬롯 처리
    ///
    /// 반환: 슬롯 종류, 프레임 타입, 32바이트 데이터 (체크섬 바이트는
    /// 코덱이 덮어쓴다)
    pub fn next_slot(&mut self) -> (ControlSlot, StreamType, [u8; FRAME_DATA_LEN]) {
        self.packets_until_next_cdea -= 1;
        if self.packets_until_next_cdea > 0 {
            return (ControlSlot::Filler, StreamType::Filler, [0u8; FRAME_DATA_LEN]);
        }
        self.packets_until_next_cdea = self.interval;

        // 제어 페이로드: marker | channel | offset | chained[2] | zero...
        let next = derive_next_bytes(self.last_two_bytes);

        let mut data = [0u8; FRAME_DATA_LEN];
        data[0] = CDEA_MARKER;
        data[1] = self.at_channel;
        data[2] = self.current_offset;
        data[3] = next[0];
        data[4] = next[1];

        self.last_two_bytes = next;
        self.at_channel = (self.at_channel + 1) % self.channel_count;
        self.current_offset = (self.current_offset + 1) % CDEA_OFFSET_WRAP;

        (ControlSlot::Control, StreamType::Control, data)
    }

    /// 현재 채널 인덱스
    pub fn at_channel(&self) -> u8 {
        self.at_channel
    }

    /// 직전 제어 두 바이트
    pub fn last_two_bytes(&self) -> [u8; 2] {
        self.last_two_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_frame_cadence() {
        let interval = 8u32;
        let n = 100u32;
        let mut generator = ControlCycleGenerator::new(interval, 4);

        let control_count = (0..n)
            .filter(|_| matches!(generator.next_slot().0, ControlSlot::Control))
            .count() as u32;

        assert_eq!(control_count, n / interval);
    }

    #[test]
    fn test_channel_round_robin_wraps() {
        let channels = 3u8;
        let mut generator = ControlCycleGenerator::new(1, channels);

        let mut seen = Vec::new();
        for _ in 0..7 {
            let (slot, _, data) = generator.next_slot();
            assert_eq!(slot, ControlSlot::Control);
            seen.push(data[1]);
        }
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_chaining_is_deterministic() {
        let mut a = ControlCycleGenerator::new(1, 2);
        let mut b = ControlCycleGenerator::new(1, 2);

        for _ in 0..32 {
            assert_eq!(a.next_slot(), b.next_slot());
        }
        // 체이닝이 실제로 진행되는지 (같은 바이트 반복이 아님)
        let first = ControlCycleGenerator::new(1, 2).next_slot().2;
        let mut c = ControlCycleGenerator::new(1, 2);
        c.next_slot();
        let second = c.next_slot().2;
        assert_ne!(first[3..5], second[3..5]);
    }

    #[test]
    fn test_filler_data_is_zero() {
        let mut generator = ControlCycleGenerator::new(16, 4);
        let (slot, stream_type, data) = generator.next_slot();
        assert_eq!(slot, ControlSlot::Filler);
        assert_eq!(stream_type, StreamType::Filler);
        assert_eq!(data, [0u8; FRAME_DATA_LEN]);
    }

    #[test]
    fn test_offset_wraps() {
        let mut generator = ControlCycleGenerator::new(1, 1);
        for expected in (0..CDEA_OFFSET_WRAP).chain(0..2) {
            let (_, _, data) = generator.next_slot();
            assert_eq!(data[2], expected);
        }
    }
}
