//! announce 계열 페이로드 레이아웃 정의
//!
//! 세 레이아웃 모두 32바이트 데이터 영역 안에 고정 오프셋으로 배치된다.
//! 의미가 규명되지 않은 바이트 구간은 불투명 상수/blob으로 모델링하고
//! 변경 없이 왕복시킨다. 파싱 실패는 `None` 반환 (드랍 후 계속, 치명적
//! 에러 아님).

use crate::{EtherAddr, ETHER_ADDR_LEN, FRAME_DATA_LEN};

/// announce 오프닝 시그니처 길이
pub const ANNOUNCE_MAGIC_LEN: usize = 9;

/// 마스터 announce 오프닝 시그니처 (불투명 고정 패턴)
pub const MASTER_ANNOUNCE_MAGIC: [u8; ANNOUNCE_MAGIC_LEN] =
    [0x01, 0x00, 0x00, 0x0a, 0x01, 0x00, 0x00, 0x00, 0x4d];

/// 슬레이브 첫 announce 오프닝 시그니처 (불투명 고정 패턴)
pub const SPLIT_ANNOUNCE_FIRST: [u8; ANNOUNCE_MAGIC_LEN] =
    [0x01, 0x01, 0x00, 0x0a, 0x01, 0x00, 0x00, 0x00, 0x53];

/// 마스터의 announce response 오프닝 시그니처 (불투명 고정 패턴)
pub const SPLIT_ANNOUNCE_RESPONSE_MAGIC: [u8; ANNOUNCE_MAGIC_LEN] =
    [0x01, 0x02, 0x00, 0x0a, 0x01, 0x00, 0x00, 0x00, 0x52];

// 공통 오프셋: magic(0..9) + addr(9..15)
const OFF_ADDR: usize = ANNOUNCE_MAGIC_LEN;
const OFF_AFTER_ADDR: usize = OFF_ADDR + ETHER_ADDR_LEN; // 15

/// 장치 정보 (마스터 announce에서 파싱, 생성 후 불변)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// 하드웨어 주소
    pub addr: EtherAddr,

    /// 입력 채널 수
    pub in_channels: u8,

    /// 출력 채널 수
    pub out_channels: u8,
}

/// 마스터 announce 페이로드
///
/// 레이아웃: magic[9] | addr[6] | in_channels[1] | out_channels[1] |
/// extra[4] (불투명) | zero[10] | checksum[1]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterAnnounce {
    /// 광고되는 장치 정보
    pub device: DeviceInfo,

    /// 의미 미상의 4바이트 (변경 없이 왕복)
    pub extra: [u8; 4],
}

impl MasterAnnounce {
    pub fn new(device: DeviceInfo) -> Self {
        Self {
            device,
            extra: [0u8; 4],
        }
    }

    /// 32바이트 데이터 영역으로 직렬화 (체크섬 바이트는 코덱이 채움)
    pub fn write_payload(&self) -> [u8; FRAME_DATA_LEN] {
        let mut data = [0u8; FRAME_DATA_LEN];
        data[..ANNOUNCE_MAGIC_LEN].copy_from_slice(&MASTER_ANNOUNCE_MAGIC);
        data[OFF_ADDR..OFF_AFTER_ADDR].copy_from_slice(&self.device.addr);
        data[OFF_AFTER_ADDR] = self.device.in_channels;
        data[OFF_AFTER_ADDR + 1] = self.device.out_channels;
        data[OFF_AFTER_ADDR + 2..OFF_AFTER_ADDR + 6].copy_from_slice(&self.extra);
        data
    }

    /// 데이터 영역에서 파싱 (시그니처 불일치 시 `None`)
    pub fn parse(data: &[u8; FRAME_DATA_LEN]) -> Option<Self> {
        if data[..ANNOUNCE_MAGIC_LEN] != MASTER_ANNOUNCE_MAGIC {
            return None;
        }

        let mut addr = [0u8; ETHER_ADDR_LEN];
        addr.copy_from_slice(&data[OFF_ADDR..OFF_AFTER_ADDR]);

        let mut extra = [0u8; 4];
        extra.copy_from_slice(&data[OFF_AFTER_ADDR + 2..OFF_AFTER_ADDR + 6]);

        Some(Self {
            device: DeviceInfo {
                addr,
                in_channels: data[OFF_AFTER_ADDR],
                out_channels: data[OFF_AFTER_ADDR + 1],
            },
            extra,
        })
    }
}

/// 스플릿 announce 페이로드 (슬레이브 → 마스터)
///
/// 레이아웃: SPLIT_ANNOUNCE_FIRST[9] | addr[6] | identifier[1] |
/// zero[15] | checksum[1]
///
/// 첫 announce는 identifier 0 (미할당), 두 번째 확인 announce는
/// 마스터가 할당한 식별자를 담는다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitAnnounce {
    /// 슬레이브 자신의 하드웨어 주소
    pub addr: EtherAddr,

    /// 할당받은 식별자 (첫 announce는 `None`)
    pub identifier: Option<u8>,
}

impl SplitAnnounce {
    pub fn write_payload(&self) -> [u8; FRAME_DATA_LEN] {
        let mut data = [0u8; FRAME_DATA_LEN];
        data[..ANNOUNCE_MAGIC_LEN].copy_from_slice(&SPLIT_ANNOUNCE_FIRST);
        data[OFF_ADDR..OFF_AFTER_ADDR].copy_from_slice(&self.addr);
        data[OFF_AFTER_ADDR] = self.identifier.unwrap_or(0);
        data
    }

    pub fn parse(data: &[u8; FRAME_DATA_LEN]) -> Option<Self> {
        if data[..ANNOUNCE_MAGIC_LEN] != SPLIT_ANNOUNCE_FIRST {
            return None;
        }

        let mut addr = [0u8; ETHER_ADDR_LEN];
        addr.copy_from_slice(&data[OFF_ADDR..OFF_AFTER_ADDR]);

        let identifier = match data[OFF_AFTER_ADDR] {
            0 => None,
            id => Some(id),
        };

        Some(Self { addr, identifier })
    }
}

/// 스플릿 announce response 페이로드 (마스터 → 슬레이브)
///
/// 레이아웃: SPLIT_ANNOUNCE_RESPONSE_MAGIC[9] | addr[6] | reserved[1] |
/// identifier_assignment[1] | zero[14] | checksum[1]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitAnnounceResponse {
    /// 응답 대상 슬레이브 주소
    pub addr: EtherAddr,

    /// 의미 미상의 1바이트 (변경 없이 왕복)
    pub reserved: u8,

    /// 할당된 식별자
    pub identifier: u8,
}

impl SplitAnnounceResponse {
    pub fn new(addr: EtherAddr, identifier: u8) -> Self {
        Self {
            addr,
            reserved: 0,
            identifier,
        }
    }

    pub fn write_payload(&self) -> [u8; FRAME_DATA_LEN] {
        let mut data = [0u8; FRAME_DATA_LEN];
        data[..ANNOUNCE_MAGIC_LEN].copy_from_slice(&SPLIT_ANNOUNCE_RESPONSE_MAGIC);
        data[OFF_ADDR..OFF_AFTER_ADDR].copy_from_slice(&self.addr);
        data[OFF_AFTER_ADDR] = self.reserved;
        data[OFF_AFTER_ADDR + 1] = self.identifier;
        data
    }

    pub fn parse(data: &[u8; FRAME_DATA_LEN]) -> Option<Self> {
        if data[..ANNOUNCE_MAGIC_LEN] != SPLIT_ANNOUNCE_RESPONSE_MAGIC {
            return None;
        }

        let mut addr = [0u8; ETHER_ADDR_LEN];
        addr.copy_from_slice(&data[OFF_ADDR..OFF_AFTER_ADDR]);

        Some(Self {
            addr,
            reserved: data[OFF_AFTER_ADDR],
            identifier: data[OFF_AFTER_ADDR + 1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: EtherAddr = [0x00, 0x40, 0xab, 0x01, 0x02, 0x03];

    #[test]
    fn test_master_announce_roundtrip() {
        let ann = MasterAnnounce {
            device: DeviceInfo {
                addr: ADDR,
                in_channels: 16,
                out_channels: 8,
            },
            extra: [0xde, 0xad, 0xbe, 0xef],
        };

        let data = ann.write_payload();
        let parsed = MasterAnnounce::parse(&data).unwrap();
        assert_eq!(parsed, ann);
        // 불투명 구간 왕복 확인
        assert_eq!(parsed.extra, [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_split_announce_identifier_encoding() {
        let first = SplitAnnounce {
            addr: ADDR,
            identifier: None,
        };
        let parsed = SplitAnnounce::parse(&first.write_payload()).unwrap();
        assert_eq!(parsed.identifier, None);

        let confirm = SplitAnnounce {
            addr: ADDR,
            identifier: Some(7),
        };
        let parsed = SplitAnnounce::parse(&confirm.write_payload()).unwrap();
        assert_eq!(parsed.identifier, Some(7));
    }

    #[test]
    fn test_response_roundtrip() {
        let resp = SplitAnnounceResponse::new(ADDR, 3);
        let parsed = SplitAnnounceResponse::parse(&resp.write_payload()).unwrap();
        assert_eq!(parsed, resp);
    }

    #[test]
    fn test_wrong_signature_rejected() {
        let data = SplitAnnounce {
            addr: ADDR,
            identifier: None,
        }
        .write_payload();

        // 다른 레이아웃의 파서는 시그니처 불일치로 None
        assert!(MasterAnnounce::parse(&data).is_none());
        assert!(SplitAnnounceResponse::parse(&data).is_none());

        let mut corrupted = data;
        corrupted[0] ^= 0xff;
        assert!(SplitAnnounce::parse(&corrupted).is_none());
    }
}
