//! REAC 루프백 시뮬레이션 - 마스터/슬레이브 엔진을 메모리 와이어로 연결
//!
//! raw Ethernet 전송은 이 크레이트 범위 밖이므로, 전송 대신 mpsc 채널을
//! 와이어로 써서 발견 핸드쉐이크와 제어 사이클 동작을 관찰한다.
//! 손실 주입으로 드랍 내성도 확인할 수 있다.
//!
//! 사용법:
//!   cargo run --release --bin reac-sim -- [OPTIONS]
//!
//! 예시:
//!   # 기본 시뮬레이션 (8000틱, 손실 없음)
//!   cargo run --release --bin reac-sim
//!
//!   # 10% 손실 주입, 40000틱
//!   cargo run --release --bin reac-sim -- --ticks 40000 --loss 0.1

use rand::Rng;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use reac::{Config, EtherAddr, ProtocolEngine, Role};

const MASTER_ADDR: EtherAddr = [0x00, 0x40, 0xab, 0x10, 0x00, 0x01];
const SLAVE_ADDR: EtherAddr = [0x00, 0x40, 0xab, 0x10, 0x00, 0x02];

/// 시뮬레이션 설정
struct SimConfig {
    /// 총 틱 수
    ticks: u64,

    /// 프레임 손실 확률 (0.0 ~ 1.0)
    loss: f64,

    /// 틱 간격 (마이크로초, 0이면 최대 속도)
    tick_interval_us: u64,

    config: Config,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks: 8000,
            loss: 0.0,
            tick_interval_us: 0,
            config: Config::default(),
        }
    }
}

fn parse_args() -> SimConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = SimConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--ticks" | "-t" => {
                if i + 1 < args.len() {
                    config.ticks = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--loss" | "-l" => {
                if i + 1 < args.len() {
                    config.loss = args[i + 1].parse().expect("유효한 비율 필요");
                    i += 1;
                }
            }
            "--interval-us" => {
                if i + 1 < args.len() {
                    config.tick_interval_us = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--lossy-chain" => {
                config.config = Config::lossy_chain();
            }
            "--help" | "-h" => {
                println!(
                    r#"REAC 루프백 시뮬레이션

옵션:
  -t, --ticks <N>        총 틱 수 (기본 8000)
  -l, --loss <RATIO>     프레임 손실 확률 0.0~1.0 (기본 0.0)
      --interval-us <N>  틱 간격 마이크로초 (기본 0 = 최대 속도)
      --lossy-chain      손실 링크용 프로토콜 설정 사용
  -h, --help             도움말
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let sim = parse_args();

    info!("REAC loopback simulation starting...");
    info!("Ticks: {}", sim.ticks);
    info!("Loss: {:.1}%", sim.loss * 100.0);
    info!("cdea interval: {} frames", sim.config.cdea_interval);
    info!("announce interval: {} frames", sim.config.announce_interval);

    let mut master = ProtocolEngine::new(Role::Master, MASTER_ADDR, sim.config.clone());
    let mut slave = ProtocolEngine::new(Role::Slave, SLAVE_ADDR, sim.config.clone());

    // 메모리 와이어: (출발지 주소, 인코딩된 프레임)
    let (to_slave_tx, mut to_slave_rx) = mpsc::channel::<(EtherAddr, Vec<u8>)>(1024);
    let (to_master_tx, mut to_master_rx) = mpsc::channel::<(EtherAddr, Vec<u8>)>(1024);

    let mut rng = rand::thread_rng();
    let mut interval = if sim.tick_interval_us > 0 {
        Some(tokio::time::interval(std::time::Duration::from_micros(
            sim.tick_interval_us,
        )))
    } else {
        None
    };

    let report_every = sim.ticks / 8;

    for tick in 1..=sim.ticks {
        if let Some(interval) = interval.as_mut() {
            interval.tick().await;
        }

        // 마스터 송신 틱
        if let Some(out) = master.prepare_next_frame() {
            if rng.gen::<f64>() >= sim.loss {
                let _ = to_slave_tx.send((MASTER_ADDR, out.frame.encode())).await;
            }
        }

        // 슬레이브 송신 틱
        if let Some(out) = slave.prepare_next_frame() {
            if rng.gen::<f64>() >= sim.loss {
                let _ = to_master_tx.send((SLAVE_ADDR, out.frame.encode())).await;
            }
        }

        // 와이어 비우기
        while let Ok((src, raw)) = to_slave_rx.try_recv() {
            slave.ingest(src, &raw);
        }
        while let Ok((src, raw)) = to_master_rx.try_recv() {
            master.ingest(src, &raw);
        }

        if report_every > 0 && tick % report_every == 0 {
            info!("tick {}: master [{}]", tick, master.stats().summary());
            info!("tick {}: slave  [{}]", tick, slave.stats().summary());
        }
    }

    info!("--- 시뮬레이션 종료 ---");
    info!(
        "슬레이브 핸드쉐이크: {:?}, id={:?}",
        slave.handshake().state(),
        slave.handshake().identifier()
    );
    info!(
        "마스터 레지스트리: {}개 유닛, 퇴출 {}회",
        master.registry().unit_count(),
        master.registry().evicted_total
    );
    info!("master [{}]", master.stats().summary());
    info!("slave  [{}]", slave.stats().summary());

    Ok(())
}
