//! 시퀀스 카운터 부기
//!
//! 송신 카운터는 프레임마다 1씩 증가 (mod 2^16). 수신측은 마지막 카운터만
//! 기억하고 중복/역행/갭을 관찰 결과로 보고한다. 와이어에 엄격한 순서
//! 보장이 없으므로 (손실 전제) 역행 자체는 프레임을 무효화하지 않고
//! 진단용으로만 노출된다.

use rand::Rng;

/// 수신 카운터 관찰 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxObservation {
    /// 연결 후 첫 프레임
    First,

    /// 직전 카운터 + 1
    InOrder,

    /// 전방 점프 (중간 프레임 손실 추정)
    Gap { lost: u16 },

    /// 직전 카운터와 동일
    Duplicate,

    /// 카운터 역행 (재정렬 또는 재전송)
    Regression { backwards: u16 },
}

/// 연결당 시퀀스 추적기
#[derive(Debug)]
pub struct SequenceTracker {
    /// 다음 송신 프레임에 찍을 카운터
    tx_counter: u16,

    /// 마지막으로 본 수신 카운터
    last_rx: Option<u16>,

    /// 총 수신 프레임 수
    pub rx_frames: u64,

    /// 중복 수신 수
    pub duplicates: u64,

    /// 역행 관찰 수
    pub regressions: u64,

    /// 갭 기반 손실 추정치 (프레임 수)
    pub lost_estimate: u64,
}

impl SequenceTracker {
    /// 새 추적기 생성
    ///
    /// `initial_tx`가 `None`이면 구현 정의 초기값으로 난수 u16을 쓴다.
    pub fn new(initial_tx: Option<u16>) -> Self {
        let tx_counter = initial_tx.unwrap_or_else(|| rand::thread_rng().gen());
        Self {
            tx_counter,
            last_rx: None,
            rx_frames: 0,
            duplicates: 0,
            regressions: 0,
            lost_estimate: 0,
        }
    }

    /// 다음 송신 카운터 발급 (발급 후 1 증가)
    pub fn next_tx(&mut self) -> u16 {
        let counter = self.tx_counter;
        self.tx_counter = self.tx_counter.wrapping_add(1);
        counter
    }

    /// 현재 송신 카운터 미리보기 (발급 없음)
    pub fn peek_tx(&self) -> u16 {
        self.tx_counter
    }

    /// 수신 카운터 관찰 및 분류
    pub fn observe_rx(&mut self, counter: u16) -> RxObservation {
        self.rx_frames += 1;

        let observation = match self.last_rx {
            None => RxObservation::First,
            Some(last) => {
                let delta = counter.wrapping_sub(last);
                match delta {
                    0 => RxObservation::Duplicate,
                    1 => RxObservation::InOrder,
                    // wrapping 거리 절반까지는 전방 점프로 해석
                    d if d < 0x8000 => RxObservation::Gap { lost: d - 1 },
                    _ => RxObservation::Regression {
                        backwards: last.wrapping_sub(counter),
                    },
                }
            }
        };

        match observation {
            RxObservation::Duplicate => self.duplicates += 1,
            RxObservation::Regression { .. } => self.regressions += 1,
            RxObservation::Gap { lost } => self.lost_estimate += lost as u64,
            _ => {}
        }

        // 중복/역행도 last_rx를 갱신하지 않고, 전진만 기록
        if !matches!(
            observation,
            RxObservation::Duplicate | RxObservation::Regression { .. }
        ) {
            self.last_rx = Some(counter);
        }

        observation
    }

    /// 마지막 수신 카운터
    pub fn last_rx(&self) -> Option<u16> {
        self.last_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_counter_increments_mod_u16() {
        let mut tracker = SequenceTracker::new(Some(u16::MAX - 1));
        assert_eq!(tracker.next_tx(), u16::MAX - 1);
        assert_eq!(tracker.next_tx(), u16::MAX);
        assert_eq!(tracker.next_tx(), 0);
        assert_eq!(tracker.next_tx(), 1);
    }

    #[test]
    fn test_rx_in_order_and_gap() {
        let mut tracker = SequenceTracker::new(Some(0));
        assert_eq!(tracker.observe_rx(100), RxObservation::First);
        assert_eq!(tracker.observe_rx(101), RxObservation::InOrder);
        assert_eq!(tracker.observe_rx(105), RxObservation::Gap { lost: 3 });
        assert_eq!(tracker.lost_estimate, 3);
    }

    #[test]
    fn test_rx_duplicate_and_regression() {
        let mut tracker = SequenceTracker::new(Some(0));
        tracker.observe_rx(50);
        assert_eq!(tracker.observe_rx(50), RxObservation::Duplicate);
        assert_eq!(
            tracker.observe_rx(48),
            RxObservation::Regression { backwards: 2 }
        );
        assert_eq!(tracker.duplicates, 1);
        assert_eq!(tracker.regressions, 1);
        // 역행은 last_rx를 되돌리지 않는다
        assert_eq!(tracker.last_rx(), Some(50));
    }

    #[test]
    fn test_rx_wraparound_in_order() {
        let mut tracker = SequenceTracker::new(Some(0));
        tracker.observe_rx(u16::MAX);
        assert_eq!(tracker.observe_rx(0), RxObservation::InOrder);
    }
}
