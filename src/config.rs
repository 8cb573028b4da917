//! 프로토콜 설정

/// REAC 프로토콜 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 입력 채널 수
    pub in_channels: u8,

    /// 출력 채널 수 (제어 사이클은 이 수를 라운드로빈)
    pub out_channels: u8,

    /// 제어 사이클 주기 (프레임 수, 이 주기마다 cdea 프레임 1개)
    pub cdea_interval: u32,

    /// 마스터 announce 주기 (프레임 수)
    pub announce_interval: u32,

    /// 스플릿 유닛 생존 윈도우 (엔진 틱 수, 초과 시 연결 해제)
    pub liveness_window: u64,

    /// 송신 카운터 초기값 (`None`이면 난수)
    pub initial_tx_counter: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            in_channels: 16,           // S-1608급 스테이지 유닛 기준
            out_channels: 8,
            cdea_interval: 256,        // 8000fps에서 약 31회/초
            announce_interval: 1024,   // 약 8회/초
            liveness_window: 16000,    // 약 2초
            initial_tx_counter: None,  // 난수 시작
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 손실 많은 데이지체인 링크용 설정
    ///
    /// announce를 촘촘히 보내 재발견을 빠르게 하고, 생존 윈도우를 넓혀
    /// 일시적 유실로 유닛이 끊기지 않게 한다.
    pub fn lossy_chain() -> Self {
        Self {
            in_channels: 16,
            out_channels: 8,
            cdea_interval: 256,
            announce_interval: 512,
            liveness_window: 40000,    // 약 5초
            initial_tx_counter: None,
        }
    }

    /// 테스트/시뮬레이션용 결정적 설정
    ///
    /// 짧은 주기로 상태 전이를 빠르게 관찰할 수 있다.
    pub fn bench() -> Self {
        Self {
            in_channels: 2,
            out_channels: 2,
            cdea_interval: 4,
            announce_interval: 16,
            liveness_window: 64,
            initial_tx_counter: Some(0),
        }
    }
}
