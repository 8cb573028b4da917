//! 스플릿 유닛 레지스트리 (마스터 역할)
//!
//! 다운스트림 스플릿 유닛을 발견하고, 식별자를 할당하고, 생존 윈도우를
//! 넘긴 유닛을 퇴출한다. 주소별 상태:
//!
//! NotInitiated → GotSplitAnnounce → GotSplitSentResponse
//!
//! 응답 전에 서로 다른 주소의 announce가 겹치면 도착 순서대로 처리한다
//! (식별자는 선착순, 주소/성능에 의한 재정렬 없음).

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::message::SplitAnnounceResponse;
use crate::{EtherAddr, SPLIT_IDENTIFIER_MAX, SPLIT_IDENTIFIER_MIN};

/// 주소별 announce 진행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAnnounceState {
    /// 본 적 없는 주소
    NotInitiated,

    /// announce를 받았고 response 대기 중
    GotSplitAnnounce,

    /// response를 보냈고 유닛으로 등록됨
    GotSplitSentResponse,
}

/// 발견된 스플릿 유닛 하나
#[derive(Debug, Clone)]
pub struct SplitUnit {
    /// 하드웨어 주소
    pub addr: EtherAddr,

    /// 할당된 식별자
    pub identifier: u8,

    /// 마지막 프레임을 받은 틱
    pub last_heard: u64,
}

/// 레지스트리 prepare 결과
#[derive(Debug)]
pub enum RegistryPrepare {
    /// 보낼 것 없음
    Idle,

    /// announce response 송신 (목적지 주소 포함)
    Response(SplitAnnounceResponse),

    /// 식별자 공간 소진으로 대기 announce 거부
    Exhausted { addr: EtherAddr },
}

/// 마스터측 스플릿 유닛 레지스트리
#[derive(Debug)]
pub struct SplitUnitRegistry {
    /// 등록된 유닛 (레지스트리가 단독 소유)
    units: Vec<SplitUnit>,

    /// response 대기 중인 주소 (도착 순서 유지)
    pending: VecDeque<EtherAddr>,

    /// 다음 할당 스캔 시작점 (단조 증가, 퇴출된 것만 재사용)
    next_identifier: u8,

    /// 생존 윈도우 (틱 수)
    liveness_window: u64,

    /// 퇴출된 유닛 누계
    pub evicted_total: u64,

    /// 식별자 소진으로 거부된 announce 수
    pub rejected_exhausted: u64,
}

impl SplitUnitRegistry {
    pub fn new(liveness_window: u64) -> Self {
        Self {
            units: Vec::new(),
            pending: VecDeque::new(),
            next_identifier: SPLIT_IDENTIFIER_MIN,
            liveness_window,
            evicted_total: 0,
            rejected_exhausted: 0,
        }
    }

    /// 주소별 진행 상태 조회
    pub fn announce_state(&self, addr: &EtherAddr) -> SplitAnnounceState {
        if self.find(addr).is_some() {
            SplitAnnounceState::GotSplitSentResponse
        } else if self.pending.contains(addr) {
            SplitAnnounceState::GotSplitAnnounce
        } else {
            SplitAnnounceState::NotInitiated
        }
    }

    /// 등록된 유닛 조회
    pub fn find(&self, addr: &EtherAddr) -> Option<&SplitUnit> {
        self.units.iter().find(|u| &u.addr == addr)
    }

    /// 등록된 유닛 수
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// 등록된 유닛 목록
    pub fn units(&self) -> &[SplitUnit] {
        &self.units
    }

    /// 스플릿 announce 수신 처리
    ///
    /// 이미 등록된 주소면 last_heard만 갱신한다 (중복 등록/재할당 없음).
    pub fn on_split_announce(&mut self, addr: EtherAddr, tick: u64) {
        if let Some(unit) = self.units.iter_mut().find(|u| u.addr == addr) {
            unit.last_heard = tick;
            return;
        }
        if self.pending.contains(&addr) {
            return;
        }
        debug!("스플릿 announce 수신: addr={:02x?}", addr);
        self.pending.push_back(addr);
    }

    /// 등록된 주소의 last_heard 갱신
    ///
    /// 알려진 주소였으면 `true`. 인식된 타입의 모든 프레임에 대해
    /// 호출된다.
    pub fn touch(&mut self, addr: &EtherAddr, tick: u64) -> bool {
        match self.units.iter_mut().find(|u| &u.addr == addr) {
            Some(unit) => {
                unit.last_heard = tick;
                true
            }
            None => false,
        }
    }

    /// 송신 기회 처리: 대기 중인 announce가 있으면 response 생성
    pub fn prepare_response(&mut self, tick: u64) -> RegistryPrepare {
        let addr = match self.pending.pop_front() {
            Some(addr) => addr,
            None => return RegistryPrepare::Idle,
        };

        // 대기 중 재announce로 이미 등록됐을 수 있다
        if let Some(unit) = self.units.iter_mut().find(|u| u.addr == addr) {
            unit.last_heard = tick;
            return RegistryPrepare::Response(SplitAnnounceResponse::new(addr, unit.identifier));
        }

        let identifier = match self.allocate_identifier() {
            Some(id) => id,
            None => {
                warn!(
                    "식별자 공간 소진: {}개 사용 중, announce 거부 addr={:02x?}",
                    self.units.len(),
                    addr
                );
                self.rejected_exhausted += 1;
                return RegistryPrepare::Exhausted { addr };
            }
        };

        info!("스플릿 유닛 연결: addr={:02x?}, id={}", addr, identifier);
        self.units.push(SplitUnit {
            addr,
            identifier,
            last_heard: tick,
        });

        RegistryPrepare::Response(SplitAnnounceResponse::new(addr, identifier))
    }

    /// 생존 윈도우를 넘긴 유닛 퇴출, 퇴출 수 반환
    ///
    /// prepare 틱과 같은 경로에서 주기적으로 호출된다 (별도 스레드 없음).
    /// 퇴출된 유닛의 식별자는 이후 재할당 가능해진다.
    pub fn evict_stale(&mut self, tick: u64) -> usize {
        let window = self.liveness_window;
        let before = self.units.len();
        self.units.retain(|unit| {
            let alive = tick.saturating_sub(unit.last_heard) <= window;
            if !alive {
                warn!(
                    "스플릿 유닛 연결 해제: addr={:02x?}, id={}, 마지막 수신 틱={}",
                    unit.addr, unit.identifier, unit.last_heard
                );
            }
            alive
        });
        let evicted = before - self.units.len();
        self.evicted_total += evicted as u64;
        evicted
    }

    /// 다음 빈 식별자 할당
    ///
    /// 마지막 할당 지점부터 앞으로 스캔하며 사용 중인 식별자를 건너뛴다.
    /// 살아있는 유닛의 식별자로 조용히 넘쳐 들어가는 일은 없다.
    fn allocate_identifier(&mut self) -> Option<u8> {
        let space = (SPLIT_IDENTIFIER_MAX - SPLIT_IDENTIFIER_MIN + 1) as usize;
        if self.units.len() >= space {
            return None;
        }

        let mut candidate = self.next_identifier;
        for _ in 0..space {
            if !self.units.iter().any(|u| u.identifier == candidate) {
                self.next_identifier = if candidate >= SPLIT_IDENTIFIER_MAX {
                    SPLIT_IDENTIFIER_MIN
                } else {
                    candidate + 1
                };
                return Some(candidate);
            }
            candidate = if candidate >= SPLIT_IDENTIFIER_MAX {
                SPLIT_IDENTIFIER_MIN
            } else {
                candidate + 1
            };
        }
        None
    }
}
