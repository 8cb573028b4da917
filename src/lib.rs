//! # REAC (Roland Ethernet Audio Communication)
//!
//! 오디오 오버 이더넷 링크용 프로토콜 엔진
//!
//! ## 핵심 특징
//! - **고정 크기 프레임**: 36바이트 헤더 (카운터 2 + 타입 2 + 데이터 32)
//! - **가산 체크섬**: 데이터 32바이트 합이 0이 되도록 마지막 바이트 보정
//! - **마스터/슬레이브 역할**: 런타임 플래그로 서브 상태기계 선택
//! - **스플릿 유닛 발견**: announce/response 핸드쉐이크 + 생존 타임아웃
//! - **제어 사이클**: 고정 주기로 채널별 제어 프레임 삽입 (cdea)
//! - **손실 내성**: 모든 이상 프레임은 드랍 후 계속, 치명적 에러 없음
//!
//! 전송 계층(raw Ethernet 송수신)과 오디오 샘플 버퍼는 외부 협력자이며
//! 이 크레이트는 헤더/카운터/제어 사이클 부기만 담당한다.

pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod message;
pub mod registry;
pub mod sequence;
pub mod stats;

pub use config::Config;
pub use control::{ControlCycleGenerator, ControlSlot};
pub use engine::{DropReason, IgnoreReason, IngestOutcome, OutgoingFrame, ProtocolEngine, Role};
pub use error::{Error, Result};
pub use frame::{Frame, FrameHeader, StreamType};
pub use handshake::{HandshakeState, SplitHandshake};
pub use message::{DeviceInfo, MasterAnnounce, SplitAnnounce, SplitAnnounceResponse};
pub use registry::{SplitAnnounceState, SplitUnit, SplitUnitRegistry};
pub use sequence::{RxObservation, SequenceTracker};
pub use stats::EngineStats;

/// 이더넷 하드웨어 주소 길이
pub const ETHER_ADDR_LEN: usize = 6;

/// 하드웨어 주소 타입
pub type EtherAddr = [u8; ETHER_ADDR_LEN];

/// 브로드캐스트 주소 (announce 프레임 목적지)
pub const BROADCAST_ADDR: EtherAddr = [0xff; ETHER_ADDR_LEN];

/// 프로토콜 헤더 크기 (카운터 2 + 타입 2 + 데이터 32)
pub const FRAME_HEADER_LEN: usize = 36;

/// 헤더 내 데이터 영역 크기
pub const FRAME_DATA_LEN: usize = 32;

/// 초당 프레임 수 (하드웨어 케이던스, 참고용)
pub const PACKETS_PER_SECOND: u32 = 8000;

/// 스플릿 유닛 식별자 최소값 (0은 미할당 의미)
pub const SPLIT_IDENTIFIER_MIN: u8 = 1;

/// 스플릿 유닛 식별자 최대값 (0xff는 예약)
pub const SPLIT_IDENTIFIER_MAX: u8 = 254;
