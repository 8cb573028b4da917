//! 스플릿 핸드쉐이크 (슬레이브 역할)
//!
//! 업스트림 마스터의 announce를 받아 자기 신원을 협상하는 상태기계.
//!
//! NotInitiated → GotMasterAnnounce → SentFirstAnnounce →
//! GotSecondMasterAnnounce → Connected
//!
//! Connected는 발견 핸드쉐이크의 종단 상태다. 이후의 주기적 마스터
//! announce는 핸드쉐이크를 재시작하지 않는다 (재협상 폭주 방지 정책).
//! 형식이 틀린 announce 페이로드는 상태 변화 없이 드랍된다.

use tracing::{debug, info};

use crate::message::{DeviceInfo, MasterAnnounce, SplitAnnounce, SplitAnnounceResponse};
use crate::EtherAddr;

/// 핸드쉐이크 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    NotInitiated,
    GotMasterAnnounce,
    SentFirstAnnounce,
    GotSecondMasterAnnounce,
    Connected,
}

/// 슬레이브측 핸드쉐이크 상태기계
#[derive(Debug)]
pub struct SplitHandshake {
    state: HandshakeState,

    /// 이 유닛 자신의 하드웨어 주소
    own_addr: EtherAddr,

    /// 파싱된 업스트림 마스터 장치 정보
    master: Option<DeviceInfo>,

    /// 마스터가 할당한 식별자
    identifier: Option<u8>,

    /// 마지막 announce를 보낸 틱
    tick_at_last_announce: u64,
}

impl SplitHandshake {
    pub fn new(own_addr: EtherAddr) -> Self {
        Self {
            state: HandshakeState::NotInitiated,
            own_addr,
            master: None,
            identifier: None,
            tick_at_last_announce: 0,
        }
    }

    /// 현재 상태
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// 핸드쉐이크 완료 여부
    pub fn is_connected(&self) -> bool {
        self.state == HandshakeState::Connected
    }

    /// 업스트림 마스터 장치 정보
    pub fn master_device(&self) -> Option<&DeviceInfo> {
        self.master.as_ref()
    }

    /// 협상된 식별자
    pub fn identifier(&self) -> Option<u8> {
        self.identifier
    }

    /// 마스터 announce 수신 처리
    ///
    /// 상태에 맞지 않는 announce는 무시된다 (`false` 반환).
    pub fn on_master_announce(&mut self, announce: &MasterAnnounce) -> bool {
        match self.state {
            HandshakeState::NotInitiated => {
                self.master = Some(announce.device);
                self.state = HandshakeState::GotMasterAnnounce;
                info!(
                    "마스터 발견: addr={:02x?}, in={}, out={}",
                    announce.device.addr, announce.device.in_channels, announce.device.out_channels
                );
                true
            }
            HandshakeState::SentFirstAnnounce => {
                self.state = HandshakeState::GotSecondMasterAnnounce;
                true
            }
            // Connected 이후의 주기적 announce는 재시작시키지 않는다
            _ => {
                debug!("announce 무시: state={:?}", self.state);
                false
            }
        }
    }

    /// 마스터의 announce response 수신 처리
    ///
    /// 자기 주소로 온 response에서만 식별자를 기록한다. 다른 유닛 앞으로
    /// 온 response는 무시된다.
    pub fn on_split_response(&mut self, response: &SplitAnnounceResponse) -> bool {
        if response.addr != self.own_addr {
            return false;
        }
        if self.state == HandshakeState::NotInitiated {
            // announce도 보내기 전의 response는 상태 불일치
            return false;
        }
        self.identifier = Some(response.identifier);
        debug!("식별자 할당 수신: id={}", response.identifier);
        true
    }

    /// 송신 기회 처리: 보낼 announce가 있으면 반환
    pub fn prepare(&mut self, tick: u64) -> Option<SplitAnnounce> {
        match self.state {
            HandshakeState::GotMasterAnnounce => {
                self.state = HandshakeState::SentFirstAnnounce;
                self.tick_at_last_announce = tick;
                Some(SplitAnnounce {
                    addr: self.own_addr,
                    identifier: None,
                })
            }
            HandshakeState::GotSecondMasterAnnounce => {
                self.state = HandshakeState::Connected;
                self.tick_at_last_announce = tick;
                info!("핸드쉐이크 완료: id={:?}", self.identifier);
                Some(SplitAnnounce {
                    addr: self.own_addr,
                    identifier: self.identifier,
                })
            }
            _ => None,
        }
    }

    /// 마지막 announce 송신 틱
    pub fn tick_at_last_announce(&self) -> u64 {
        self.tick_at_last_announce
    }
}
