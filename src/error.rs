//! 에러 타입 정의

use thiserror::Error;

/// REAC 프로토콜 에러 타입
///
/// 프로토콜 엔진 내부에는 치명적 에러가 없다. 코덱이 반환하는
/// `MalformedFrame`/`ChecksumInvalid`는 엔진에서 "드랍 후 계속"으로
/// 변환되며 호출자에게 전파되지 않는다.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("프레임 길이 부족: 최소 {min} 바이트 필요, got {len}")]
    MalformedFrame { min: usize, len: usize },

    #[error("체크섬 불일치: 데이터 합 {sum:02X} != 0")]
    ChecksumInvalid { sum: u8 },

    #[error("announce 페이로드 형식 오류: {reason}")]
    MalformedAnnounce { reason: &'static str },

    #[error("스플릿 식별자 공간 소진: {in_use}개 사용 중")]
    IdentifierExhausted { in_use: usize },

    #[error("알 수 없는 에러: {0}")]
    Unknown(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
