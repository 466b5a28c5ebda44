// End-to-end behavior of the scan scheduler against a scripted radio

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use scan_dispatch::{
    ChannelMask, NetworkInfo, ScanDuration, ScanEvent, ScanHandler, ScanKind, ScanRadio,
    ScanRequest, ScanScheduler, StartError, StatusCode,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    Energy(u8, i8),
    Network(u16, u8),
    Done(ScanKind),
    Failed(ScanKind, Option<u8>, StatusCode),
}

type Log = Rc<RefCell<Vec<(char, Seen)>>>;

struct Requester {
    name: char,
    log: Log,
}

impl ScanHandler for Requester {
    fn on_scan_event(&mut self, event: ScanEvent<'_>) {
        let seen = match event {
            ScanEvent::Energy { channel, rssi } => Seen::Energy(channel, rssi),
            ScanEvent::NetworkFound { network, lqi, .. } => Seen::Network(network.pan_id, lqi),
            ScanEvent::Complete { kind, .. } => Seen::Done(kind),
            ScanEvent::Failed {
                kind,
                channel,
                status,
            } => Seen::Failed(kind, channel, status),
        };
        self.log.borrow_mut().push((self.name, seen));
    }
}

#[derive(Default)]
struct ScriptedRadio {
    starts: Vec<(ScanKind, ChannelMask, ScanDuration)>,
    replies: VecDeque<Result<(), StartError>>,
    stops: usize,
}

impl ScanRadio for ScriptedRadio {
    fn start_scan(
        &mut self,
        kind: ScanKind,
        channels: ChannelMask,
        duration: ScanDuration,
    ) -> Result<(), StartError> {
        self.starts.push((kind, channels, duration));
        self.replies.pop_front().unwrap_or(Ok(()))
    }

    fn stop_scan(&mut self) {
        self.stops += 1;
    }
}

type Scheduler = ScanScheduler<ScriptedRadio, Requester, 4>;

fn scheduler() -> (Scheduler, Log) {
    (ScanScheduler::new(ScriptedRadio::default()), Log::default())
}

fn request(kind: ScanKind, name: char, log: &Log) -> ScanRequest<Requester> {
    ScanRequest::new(
        kind,
        ChannelMask::ALL,
        ScanDuration::SHORT,
        Requester {
            name,
            log: log.clone(),
        },
    )
}

fn started(s: &Scheduler) -> Vec<ScanKind> {
    s.radio().starts.iter().map(|(kind, ..)| *kind).collect()
}

fn beacon(pan_id: u16) -> NetworkInfo {
    NetworkInfo {
        channel: 15,
        pan_id,
        extended_pan_id: [0x11; 8],
        allowing_join: true,
        stack_profile: 2,
        nwk_update_id: 0,
    }
}

#[test]
fn example_scenario() {
    let (mut s, log) = scheduler();
    s.enqueue(request(ScanKind::Energy, 'A', &log)).unwrap();
    s.enqueue(request(ScanKind::Active, 'B', &log)).unwrap();
    s.enqueue(request(ScanKind::Energy, 'C', &log)).unwrap();
    assert_eq!(s.len(), 3);

    s.poll();
    assert_eq!(started(&s), [ScanKind::Energy]);

    s.on_energy_result(11, -91);
    s.on_energy_result(12, -88);
    s.radio_mut().replies.push_back(Err(StartError::AlreadyScanning));
    s.on_scan_complete(26, StatusCode::SUCCESS);
    assert_eq!(
        s.pending_kinds().collect::<Vec<_>>(),
        [ScanKind::Active, ScanKind::Energy]
    );

    // B's start is refused once
    s.poll();
    assert_eq!(started(&s), [ScanKind::Energy, ScanKind::Active]);
    assert!(!s.is_scanning());

    s.on_scan_complete(11, StatusCode::ERR_FATAL);
    assert_eq!(s.pending_kinds().collect::<Vec<_>>(), [ScanKind::Energy]);

    s.poll();
    assert_eq!(
        started(&s),
        [ScanKind::Energy, ScanKind::Active, ScanKind::Energy]
    );

    assert_eq!(
        *log.borrow(),
        [
            ('A', Seen::Energy(11, -91)),
            ('A', Seen::Energy(12, -88)),
            ('A', Seen::Done(ScanKind::Energy)),
            (
                'B',
                Seen::Failed(ScanKind::Active, Some(11), StatusCode::ERR_FATAL)
            ),
        ]
    );
}

#[test]
fn dispatch_follows_submission_order() {
    let (mut s, log) = scheduler();
    let names = ['w', 'x', 'y', 'z'];
    let kinds = [
        ScanKind::Active,
        ScanKind::Energy,
        ScanKind::Energy,
        ScanKind::Active,
    ];
    for (name, kind) in names.iter().zip(kinds) {
        s.enqueue(request(kind, *name, &log)).unwrap();
    }

    for _ in 0..names.len() {
        s.poll();
        s.on_scan_complete(20, StatusCode::SUCCESS);
    }
    s.poll();

    assert_eq!(started(&s), kinds);
    let order: Vec<char> = log.borrow().iter().map(|(name, _)| *name).collect();
    assert_eq!(order, names);
    assert!(s.is_idle());
}

#[test]
fn overflow_is_rejected_without_side_effects() {
    let (mut s, log) = scheduler();
    for name in ['a', 'b', 'c', 'd'] {
        s.enqueue(request(ScanKind::Energy, name, &log)).unwrap();
    }

    let err = s.enqueue(request(ScanKind::Active, 'e', &log)).unwrap_err();
    assert_eq!(err.to_string(), "scan queue full, rejected active scan");
    assert_eq!(err.into_request().handler.name, 'e');

    assert_eq!(s.len(), 4);
    assert!(s.pending_kinds().all(|k| k == ScanKind::Energy));
}

#[test]
fn every_request_gets_exactly_one_terminal_event() {
    let (mut s, log) = scheduler();
    s.radio_mut().replies = VecDeque::from([
        Ok(()),
        Err(StartError::Failed(StatusCode::MAC_INVALID_CHANNEL_MASK)),
        Ok(()),
    ]);
    for name in ['a', 'b', 'c'] {
        s.enqueue(request(ScanKind::Active, name, &log)).unwrap();
    }

    s.poll();
    let net = beacon(0x1234);
    s.on_network_found(&net, 180, -45);
    s.on_scan_complete(15, StatusCode::SUCCESS);
    // 'b' fails to start, 'c' is started in the same pass
    s.poll();
    assert!(s.is_scanning());
    s.on_scan_complete(26, StatusCode::NETWORK_DOWN);
    s.poll();

    // late callbacks after everything finished
    s.on_network_found(&net, 10, -90);
    s.on_scan_complete(26, StatusCode::SUCCESS);

    let log = log.borrow();
    for name in ['a', 'b', 'c'] {
        let terminals = log
            .iter()
            .filter(|(n, seen)| *n == name && matches!(seen, Seen::Done(_) | Seen::Failed(..)))
            .count();
        assert_eq!(terminals, 1, "requester {name}");
        // terminal event is the last thing each requester sees
        let last = log.iter().rev().find(|(n, _)| *n == name).map(|(_, seen)| seen);
        assert!(matches!(last, Some(Seen::Done(_) | Seen::Failed(..))));
    }
    assert_eq!(
        log[2],
        (
            'b',
            Seen::Failed(
                ScanKind::Active,
                None,
                StatusCode::MAC_INVALID_CHANNEL_MASK
            )
        )
    );
    assert_eq!(log.len(), 4);
}

#[test]
fn results_never_reach_waiting_requests() {
    let (mut s, log) = scheduler();
    s.enqueue(request(ScanKind::Active, 'a', &log)).unwrap();
    s.enqueue(request(ScanKind::Active, 'b', &log)).unwrap();
    s.poll();

    let net = beacon(0xABCD);
    s.on_network_found(&net, 200, -40);
    s.on_network_found(&net, 190, -42);

    assert!(log.borrow().iter().all(|(name, _)| *name == 'a'));
    assert_eq!(log.borrow()[0].1, Seen::Network(0xABCD, 200));
}

#[test]
fn clear_discards_everything_silently() {
    let (mut s, log) = scheduler();
    for name in ['a', 'b', 'c'] {
        s.enqueue(request(ScanKind::Energy, name, &log)).unwrap();
    }
    s.poll();
    s.on_energy_result(11, -70);

    s.clear();
    assert!(s.is_idle());
    assert_eq!(s.radio().stops, 1);

    s.on_energy_result(12, -71);
    s.on_scan_complete(26, StatusCode::SUCCESS);
    s.poll();

    assert_eq!(*log.borrow(), [('a', Seen::Energy(11, -70))]);
    assert_eq!(started(&s), [ScanKind::Energy]);

    // usable again after clearing
    s.enqueue(request(ScanKind::Active, 'd', &log)).unwrap();
    s.poll();
    assert_eq!(started(&s), [ScanKind::Energy, ScanKind::Active]);
}

#[test]
fn callbacks_on_empty_queue_do_nothing() {
    let (mut s, log) = scheduler();
    s.on_energy_result(11, -60);
    s.on_network_found(&beacon(1), 1, -1);
    s.on_scan_complete(11, StatusCode::ERR_FATAL);

    assert!(log.borrow().is_empty());
    assert!(!s.dispatch_pending());
    assert!(s.radio().starts.is_empty());
}

#[test]
fn request_parameters_reach_the_radio() {
    let (mut s, log) = scheduler();
    let mask = ChannelMask::single(15).with(20).with(25);
    s.enqueue(ScanRequest::energy(
        mask,
        ScanDuration::LONG,
        Requester {
            name: 'p',
            log: log.clone(),
        },
    ))
    .unwrap();
    s.poll();

    assert_eq!(
        s.radio().starts,
        [(ScanKind::Energy, mask, ScanDuration::LONG)]
    );
}
