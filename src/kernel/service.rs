// Interrupt-safe scan service
//
// Wraps ScanScheduler so it can live in a static and be reached from both
// the radio's callback context and task context. All state sits behind a
// critical-section mutex; the scheduler's dispatch flag is mirrored into an
// embassy Signal so the dispatch task sleeps until there is work.
//
// Handlers run with the lock released, so a handler may enqueue, clear or
// inspect the same service from inside its callback.

use core::cell::RefCell;
use core::future::Future;

use critical_section::Mutex;
use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use log::debug;

use super::event::{ScanEvent, ScanHandler};
use super::queue::{QueueFull, ScanRequest};
use super::scheduler::{Cycle, DEFAULT_QUEUE_SIZE, ScanScheduler};
use crate::radio::{NetworkInfo, ScanRadio, StatusCode};

pub type DefaultService<R, H> = ScanService<R, H, DEFAULT_QUEUE_SIZE>;

pub struct ScanService<R, H, const N: usize> {
    scheduler: Mutex<RefCell<ScanScheduler<R, H, N>>>,
    dispatch: Signal<CriticalSectionRawMutex, ()>,
}

impl<R, H, const N: usize> ScanService<R, H, N>
where
    R: ScanRadio,
    H: ScanHandler,
{
    pub const fn new(radio: R) -> Self {
        Self {
            scheduler: Mutex::new(RefCell::new(ScanScheduler::new(radio))),
            dispatch: Signal::new(),
        }
    }

    // every mutation goes through here so the dispatch task hears about it
    fn lock<T>(&self, f: impl FnOnce(&mut ScanScheduler<R, H, N>) -> T) -> T {
        critical_section::with(|cs| {
            let mut scheduler = self.scheduler.borrow_ref_mut(cs);
            let out = f(&mut scheduler);
            if scheduler.dispatch_pending() {
                self.dispatch.signal(());
            }
            out
        })
    }

    pub fn enqueue(&self, request: ScanRequest<H>) -> Result<(), QueueFull<H>> {
        self.lock(|s| s.enqueue(request))
    }

    pub fn clear(&self) {
        self.lock(|s| s.clear())
    }

    pub fn reset(&self) {
        self.lock(|s| s.reset());
        self.dispatch.reset();
    }

    // lend the head's handler out, call it unlocked, take it back
    fn deliver_to_head(&self, event: ScanEvent<'_>) {
        let Some(mut lease) = self.lock(|s| s.lend_head()) else {
            debug!("scan: no handler to take {:?}", event);
            return;
        };
        lease.handler.on_scan_event(event);
        if let Some(finished) = self.lock(|s| s.give_back(lease)) {
            finished.deliver();
        }
    }

    /// Radio callback: energy reading for one channel.
    pub fn on_energy_result(&self, channel: u8, rssi: i8) {
        self.deliver_to_head(ScanEvent::Energy { channel, rssi });
    }

    /// Radio callback: a network answered the active scan.
    pub fn on_network_found(&self, network: &NetworkInfo, lqi: u8, rssi: i8) {
        self.deliver_to_head(ScanEvent::NetworkFound { network, lqi, rssi });
    }

    /// Radio callback: the running scan ended.
    pub fn on_scan_complete(&self, channel: u8, status: StatusCode) {
        if let Some(finished) = self.lock(|s| s.complete_head(channel, status)) {
            finished.deliver();
        }
    }

    /// Synchronous dispatch until the signal settles, for callers that run
    /// their own main loop instead of spawning [`run`](Self::run).
    pub fn dispatch_now(&self) -> bool {
        let mut ran = false;
        loop {
            match self.lock(|s| s.dispatch_once()) {
                Cycle::Idle => return ran,
                Cycle::Ran => ran = true,
                Cycle::Finished(finished) => {
                    ran = true;
                    finished.deliver();
                }
            }
        }
    }

    /// Read-only look at the scheduler.
    pub fn with<T>(&self, f: impl FnOnce(&ScanScheduler<R, H, N>) -> T) -> T {
        critical_section::with(|cs| f(&self.scheduler.borrow_ref(cs)))
    }

    /// Dispatch task body. Sleeps until something raises the signal.
    pub async fn run(&self) -> ! {
        loop {
            self.dispatch.wait().await;
            self.dispatch_now();
        }
    }

    /// Run the dispatch loop until `stop` resolves.
    pub async fn run_until<F: Future>(&self, stop: F) -> F::Output {
        match select(stop, self.run()).await {
            Either::First(out) => out,
            Either::Second(never) => never,
        }
    }
}
