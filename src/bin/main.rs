// scan-demo: three subsystems sharing one (simulated) radio
//
// Boot: logger -> service -> radio task -> dispatch task -> requesters
//
// The radio task plays back canned energy readings and beacons with
// embassy-time delays and reports through the service's router entry
// points, the way a real driver's callbacks would. Join logic asks for an
// energy sweep then an active scan, diagnostics asks for a narrow energy
// scan, and a periodic task keeps rescanning. All of them see exclusive
// scans; the service queues and serializes them.
//
// Run with: cargo run --features std --bin scan-demo

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Ticker, Timer};
use log::{error, info, warn};
use static_cell::StaticCell;

use scan_dispatch::{
    ChannelMask, NetworkInfo, ScanDuration, ScanEvent, ScanHandler, ScanKind, ScanRadio,
    ScanRequest, ScanService, StartError, StatusCode,
};

const QUEUE_SIZE: usize = 4;
const RESCAN_INTERVAL_SECS: u64 = 3;
const RESCANS: u32 = 3;

// per-channel dwell in the simulation, scaled by the duration exponent
const DWELL_BASE_MS: u64 = 5;

type Service = ScanService<SimRadio, Requester, QUEUE_SIZE>;

static SERVICE: StaticCell<Service> = StaticCell::new();

// ── Simulated radio ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum RadioCmd {
    Start {
        kind: ScanKind,
        channels: ChannelMask,
        duration: ScanDuration,
    },
}

static RADIO_CMDS: Channel<CriticalSectionRawMutex, RadioCmd, 1> = Channel::new();

// set while a scan is playing back, cleared by the radio task
static RADIO_BUSY: AtomicBool = AtomicBool::new(false);
static RADIO_ABORT: AtomicBool = AtomicBool::new(false);

const NETWORKS: [NetworkInfo; 2] = [
    NetworkInfo {
        channel: 15,
        pan_id: 0x1A62,
        extended_pan_id: [0x00, 0x0D, 0x6F, 0x00, 0x0A, 0x4B, 0x1C, 0x01],
        allowing_join: true,
        stack_profile: 2,
        nwk_update_id: 0,
    },
    NetworkInfo {
        channel: 20,
        pan_id: 0x7F3E,
        extended_pan_id: [0x00, 0x0D, 0x6F, 0x00, 0x11, 0x22, 0x33, 0x44],
        allowing_join: false,
        stack_profile: 2,
        nwk_update_id: 3,
    },
];

struct SimRadio;

impl ScanRadio for SimRadio {
    fn start_scan(
        &mut self,
        kind: ScanKind,
        channels: ChannelMask,
        duration: ScanDuration,
    ) -> Result<(), StartError> {
        if channels.is_empty() {
            return Err(StartError::Failed(StatusCode::MAC_INVALID_CHANNEL_MASK));
        }
        if duration.0 > 14 {
            return Err(StartError::Failed(StatusCode::MAC_BAD_SCAN_DURATION));
        }
        if RADIO_BUSY.swap(true, Ordering::AcqRel) {
            return Err(StartError::AlreadyScanning);
        }
        RADIO_ABORT.store(false, Ordering::Release);
        RADIO_CMDS
            .try_send(RadioCmd::Start {
                kind,
                channels,
                duration,
            })
            .map_err(|_| {
                RADIO_BUSY.store(false, Ordering::Release);
                StartError::Failed(StatusCode::ERR_FATAL)
            })
    }

    fn stop_scan(&mut self) {
        RADIO_ABORT.store(true, Ordering::Release);
    }
}

// fake noise floor, a bit louder where the networks live
fn channel_energy(channel: u8) -> i8 {
    let busy = NETWORKS.iter().any(|n| n.channel == channel);
    -95 + (channel as i8 % 7) + if busy { 30 } else { 0 }
}

#[embassy_executor::task]
async fn radio_task(service: &'static Service) -> ! {
    loop {
        let RadioCmd::Start {
            kind,
            channels,
            duration,
        } = RADIO_CMDS.receive().await;

        let dwell = Duration::from_millis(DWELL_BASE_MS << duration.0.min(6));
        let mut last = ChannelMask::FIRST_CHANNEL;

        for channel in channels.iter() {
            Timer::after(dwell).await;
            if RADIO_ABORT.load(Ordering::Acquire) {
                break;
            }
            last = channel;
            match kind {
                ScanKind::Energy => service.on_energy_result(channel, channel_energy(channel)),
                ScanKind::Active => {
                    for net in NETWORKS.iter().filter(|n| n.channel == channel) {
                        service.on_network_found(net, 220, channel_energy(channel));
                    }
                }
            }
        }

        RADIO_BUSY.store(false, Ordering::Release);
        if RADIO_ABORT.swap(false, Ordering::AcqRel) {
            // aborted scans report nothing, the queue was cleared
            continue;
        }
        service.on_scan_complete(last, StatusCode::SUCCESS);
    }
}

// ── Requesters ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Requester {
    Join,
    Diagnostics,
    Rescan(u32),
}

impl ScanHandler for Requester {
    fn on_scan_event(&mut self, event: ScanEvent<'_>) {
        match event {
            ScanEvent::Energy { channel, rssi } => {
                info!("{:?}: ch{} energy {} dBm", self, channel, rssi)
            }
            ScanEvent::NetworkFound { network, lqi, rssi } => info!(
                "{:?}: pan {:#06x} on ch{} (lqi {}, rssi {}, join {})",
                self, network.pan_id, network.channel, lqi, rssi, network.allowing_join
            ),
            ScanEvent::Complete { kind, channel } => match self {
                Requester::Rescan(round) => {
                    info!("rescan {}/{}: {} scan done (last ch{})", round, RESCANS, kind, channel)
                }
                _ => info!("{:?}: {} scan done (last ch{})", self, kind, channel),
            },
            ScanEvent::Failed {
                kind,
                channel,
                status,
            } => warn!("{:?}: {} scan failed on {:?}: {}", self, kind, channel, status),
        }
    }
}

fn submit(service: &Service, request: ScanRequest<Requester>) {
    if let Err(full) = service.enqueue(request) {
        warn!("demo: {:?} dropped ({})", full.0.handler, full);
    }
}

// ── Tasks ───────────────────────────────────────────────────────────

#[embassy_executor::task]
async fn dispatch_task(service: &'static Service) -> ! {
    service.run().await
}

#[embassy_executor::task]
async fn rescan_task(service: &'static Service) {
    let mut ticker = Ticker::every(Duration::from_secs(RESCAN_INTERVAL_SECS));
    for round in 1..=RESCANS {
        ticker.next().await;
        submit(
            service,
            ScanRequest::energy(ChannelMask::ALL, ScanDuration::SHORT, Requester::Rescan(round)),
        );
    }
    info!("demo: periodic rescans finished");
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("booting...");

    let service: &'static Service = SERVICE.init(Service::new(SimRadio));

    for result in [
        spawner.spawn(radio_task(service)),
        spawner.spawn(dispatch_task(service)),
        spawner.spawn(rescan_task(service)),
    ] {
        if let Err(e) = result {
            error!("demo: failed to spawn task: {:?}", e);
            return;
        }
    }
    info!("kernel ready.");

    // join: sweep energy first, then look for networks
    submit(
        service,
        ScanRequest::energy(ChannelMask::ALL, ScanDuration::SHORT, Requester::Join),
    );
    submit(
        service,
        ScanRequest::active(ChannelMask::ALL, ScanDuration::LONG, Requester::Join),
    );
    // diagnostics: bad mask fails at start, narrow scan runs normally
    submit(
        service,
        ScanRequest::energy(ChannelMask::EMPTY, ScanDuration::SHORT, Requester::Diagnostics),
    );
    submit(
        service,
        ScanRequest::energy(
            ChannelMask::single(15).with(20),
            ScanDuration::SHORT,
            Requester::Diagnostics,
        ),
    );

    Timer::after(Duration::from_secs(RESCAN_INTERVAL_SECS * (RESCANS as u64 + 1))).await;

    let left = service.with(|s| s.len());
    info!("demo: shutting down, {} request(s) still queued", left);
    service.clear();
    std::process::exit(0);
}
