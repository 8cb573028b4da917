//! 연결별 진단 카운터
//!
//! 프로토콜 이상은 전부 "드랍 후 계속"이므로 외부로는 카운터로만
//! 드러난다.

/// 연결별 엔진 통계
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    /// 수신: 필러 프레임
    pub rx_filler: u64,

    /// 수신: 제어 사이클 프레임
    pub rx_control: u64,

    /// 수신: 마스터 announce
    pub rx_master_announce: u64,

    /// 수신: 스플릿 announce/response
    pub rx_split_announce: u64,

    /// 수신: 알 수 없는 타입 (무시)
    pub rx_unknown: u64,

    /// 드랍: 길이/형식 오류
    pub malformed: u64,

    /// 드랍: 체크섬 불일치
    pub checksum_failures: u64,

    /// 상태 불일치로 무시된 핸드쉐이크 프레임
    pub unexpected_handshake: u64,

    /// 미등록 주소에서 온 프레임 (무시)
    pub unknown_split_unit: u64,

    /// 중복 수신 카운터
    pub duplicates: u64,

    /// 카운터 역행 관찰 수
    pub regressions: u64,

    /// 갭 기반 손실 추정치
    pub lost_estimate: u64,

    /// 송신: 필러 프레임
    pub tx_filler: u64,

    /// 송신: 제어 사이클 프레임
    pub tx_control: u64,

    /// 송신: announce (마스터 announce + 스플릿 announce)
    pub tx_announces: u64,

    /// 송신: announce response
    pub tx_responses: u64,

    /// 퇴출된 스플릿 유닛 수
    pub split_units_evicted: u64,

    /// 식별자 소진으로 거부된 announce 수
    pub identifier_exhausted: u64,
}

impl EngineStats {
    /// 총 수신 프레임 수 (드랍 제외)
    pub fn rx_total(&self) -> u64 {
        self.rx_filler
            + self.rx_control
            + self.rx_master_announce
            + self.rx_split_announce
            + self.rx_unknown
    }

    /// 총 송신 프레임 수
    pub fn tx_total(&self) -> u64 {
        self.tx_filler + self.tx_control + self.tx_announces + self.tx_responses
    }

    /// 총 드랍 수
    pub fn dropped_total(&self) -> u64 {
        self.malformed + self.checksum_failures
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "RX: {} (drop {}) | TX: {} (cdea {}, filler {}) | Dup: {} | Regr: {} | Lost~: {} | Evicted: {}",
            self.rx_total(),
            self.dropped_total(),
            self.tx_total(),
            self.tx_control,
            self.tx_filler,
            self.duplicates,
            self.regressions,
            self.lost_estimate,
            self.split_units_evicted,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals() {
        let stats = EngineStats {
            rx_filler: 10,
            rx_control: 2,
            rx_unknown: 1,
            malformed: 3,
            checksum_failures: 4,
            tx_filler: 5,
            tx_control: 1,
            ..Default::default()
        };
        assert_eq!(stats.rx_total(), 13);
        assert_eq!(stats.dropped_total(), 7);
        assert_eq!(stats.tx_total(), 6);
        assert!(stats.summary().contains("drop 7"));
    }
}
