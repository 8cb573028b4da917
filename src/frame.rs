//! 프레임 코덱과 스트림 타입 분류
//!
//! - 헤더: counter[2] (리틀엔디언) + type[2] + data[32] = 36바이트
//! - 헤더 뒤의 바이트는 오디오 샘플 영역이며 불투명하게 통과시킨다
//! - 체크섬: data 32바이트의 wrapping 합이 0이 되도록 data[31] 보정

use bytes::Bytes;

use crate::{Error, Result, FRAME_DATA_LEN, FRAME_HEADER_LEN};

/// 스트림 타입별 2바이트 와이어 시그니처 테이블
///
/// 순서는 `StreamType`의 알려진 변형 순서와 같다. 테이블에 없는 태그는
/// `Unknown`으로 분류되며 에러 없이 무시된다 (전방 호환 정책).
pub const STREAM_TYPE_IDENTIFIERS: [[u8; 2]; 4] = [
    [0x00, 0x00], // Filler
    [0xcd, 0xea], // Control
    [0xcf, 0xea], // MasterAnnounce
    [0xce, 0xea], // SplitAnnounce
];

/// 스트림 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    /// 케이던스 유지용 필러 프레임
    Filler,

    /// 채널별 제어 데이터 프레임 (cdea)
    Control,

    /// 마스터 장치 식별/채널 수 광고
    MasterAnnounce,

    /// 스플릿 유닛 발견 announce 및 response
    SplitAnnounce,

    /// 테이블에 없는 태그 (무시 대상)
    Unknown,
}

impl StreamType {
    /// 2바이트 타입 태그를 정확 일치로 분류
    pub fn classify(tag: [u8; 2]) -> Self {
        match tag {
            t if t == STREAM_TYPE_IDENTIFIERS[0] => StreamType::Filler,
            t if t == STREAM_TYPE_IDENTIFIERS[1] => StreamType::Control,
            t if t == STREAM_TYPE_IDENTIFIERS[2] => StreamType::MasterAnnounce,
            t if t == STREAM_TYPE_IDENTIFIERS[3] => StreamType::SplitAnnounce,
            _ => StreamType::Unknown,
        }
    }

    /// 와이어 시그니처 반환 (`Unknown`은 시그니처 없음)
    pub fn signature(self) -> Option<[u8; 2]> {
        match self {
            StreamType::Filler => Some(STREAM_TYPE_IDENTIFIERS[0]),
            StreamType::Control => Some(STREAM_TYPE_IDENTIFIERS[1]),
            StreamType::MasterAnnounce => Some(STREAM_TYPE_IDENTIFIERS[2]),
            StreamType::SplitAnnounce => Some(STREAM_TYPE_IDENTIFIERS[3]),
            StreamType::Unknown => None,
        }
    }
}

/// 프레임 헤더 (36바이트 고정)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// 시퀀스 카운터 (mod 2^16, 와이어에서는 low byte 먼저)
    pub counter: u16,

    /// 타입 태그 원본 2바이트
    pub type_tag: [u8; 2],

    /// 데이터 영역 (마지막 바이트는 체크섬)
    pub data: [u8; FRAME_DATA_LEN],
}

impl FrameHeader {
    pub fn new(stream_type: StreamType, counter: u16, data: [u8; FRAME_DATA_LEN]) -> Self {
        let type_tag = stream_type.signature().unwrap_or([0xff, 0xff]);
        Self {
            counter,
            type_tag,
            data,
        }
    }

    /// 타입 태그 분류
    pub fn stream_type(&self) -> StreamType {
        StreamType::classify(self.type_tag)
    }

    /// 체크섬 적용: data[0..31] 합의 보수를 data[31]에 기록
    ///
    /// 기록한 체크섬 바이트를 반환한다.
    pub fn apply_checksum(&mut self) -> u8 {
        let sum = self.data[..FRAME_DATA_LEN - 1]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        let checksum = sum.wrapping_neg();
        self.data[FRAME_DATA_LEN - 1] = checksum;
        checksum
    }

    /// 체크섬 검증: data 32바이트 wrapping 합이 0이면 유효
    ///
    /// 가산 mod-256 합이므로 단일 바이트 훼손은 (체크섬 바이트 포함)
    /// 항상 검출된다. 합이 상쇄되는 다중 바이트 훼손은 통과한다.
    pub fn checksum_valid(&self) -> bool {
        self.data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == 0
    }

    fn checksum_sum(&self) -> u8 {
        self.data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
    }
}

/// 프레임 (헤더 + 불투명 오디오 영역)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 프로토콜 헤더
    pub header: FrameHeader,

    /// 헤더 뒤의 오디오 샘플 영역 (내용 해석 안 함)
    pub audio: Bytes,
}

impl Frame {
    /// 새 프레임 생성 (체크섬은 즉시 적용)
    pub fn new(stream_type: StreamType, counter: u16, data: [u8; FRAME_DATA_LEN]) -> Self {
        let mut header = FrameHeader::new(stream_type, counter, data);
        header.apply_checksum();
        Self {
            header,
            audio: Bytes::new(),
        }
    }

    /// raw 바이트에서 프레임 디코딩
    ///
    /// - 36바이트 미만이면 `MalformedFrame`
    /// - 알려진 타입인데 체크섬이 틀리면 `ChecksumInvalid`
    /// - 알 수 없는 타입은 레이아웃을 모르므로 체크섬 검사 없이 통과시키고
    ///   분류 단계에서 무시된다
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() < FRAME_HEADER_LEN {
            return Err(Error::MalformedFrame {
                min: FRAME_HEADER_LEN,
                len: raw.len(),
            });
        }

        let counter = u16::from_le_bytes([raw[0], raw[1]]);
        let type_tag = [raw[2], raw[3]];

        let mut data = [0u8; FRAME_DATA_LEN];
        data.copy_from_slice(&raw[4..FRAME_HEADER_LEN]);

        let header = FrameHeader {
            counter,
            type_tag,
            data,
        };

        if header.stream_type() != StreamType::Unknown && !header.checksum_valid() {
            return Err(Error::ChecksumInvalid {
                sum: header.checksum_sum(),
            });
        }

        Ok(Self {
            header,
            audio: Bytes::copy_from_slice(&raw[FRAME_HEADER_LEN..]),
        })
    }

    /// 프레임을 와이어 바이트로 인코딩 (체크섬 재계산 포함)
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + self.audio.len());
        buf.extend_from_slice(&self.header.counter.to_le_bytes());
        buf.extend_from_slice(&self.header.type_tag);

        let mut data = self.header.data;
        if self.header.stream_type() != StreamType::Unknown {
            let sum = data[..FRAME_DATA_LEN - 1]
                .iter()
                .fold(0u8, |acc, &b| acc.wrapping_add(b));
            data[FRAME_DATA_LEN - 1] = sum.wrapping_neg();
        }
        buf.extend_from_slice(&data);
        buf.extend_from_slice(&self.audio);
        buf
    }

    /// 스트림 타입
    pub fn stream_type(&self) -> StreamType {
        self.header.stream_type()
    }
}
