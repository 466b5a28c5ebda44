// Scan scheduler: one radio, many requesters
//
// enqueue -> dispatch signal -> poll() starts the head scan -> radio calls
// back through the router -> terminal event pops the head and re-raises
// the signal for the next request.
//
// The dispatch signal is level triggered: raising it twice before poll()
// runs still produces one dispatch cycle. Nothing here blocks and nothing
// here is Sync; see service.rs for the interrupt-safe wrapper.
//
// Handlers never run while the queue is mid-update. A finished request is
// popped first and handed back as `Finished`; intermediate results lend
// the head's handler out as a `Lease` and take it back afterwards. The
// plain &mut methods below do both inline, the service does them with its
// lock released so handlers can submit more scans.

use log::{debug, info, warn};

use super::event::{ScanEvent, ScanHandler};
use super::queue::{QueueFull, RequestQueue, ScanRequest};
use crate::radio::{
    ChannelMask, NetworkInfo, ScanDuration, ScanKind, ScanRadio, StartError, StatusCode,
};

/// Queue depth used by [`DefaultScheduler`].
pub const DEFAULT_QUEUE_SIZE: usize = 10;

pub type DefaultScheduler<R, H> = ScanScheduler<R, H, DEFAULT_QUEUE_SIZE>;

struct Entry<H> {
    ticket: u32,
    kind: ScanKind,
    channels: ChannelMask,
    duration: ScanDuration,
    // None while lent out for delivery
    handler: Option<H>,
}

/// A request that is done, popped, and still owes its handler the
/// terminal event.
pub struct Finished<H> {
    pub handler: H,
    pub event: ScanEvent<'static>,
}

impl<H: ScanHandler> Finished<H> {
    pub fn deliver(mut self) {
        self.handler.on_scan_event(self.event);
    }
}

/// The head's handler, lent out to receive one intermediate result.
/// Give it back with [`ScanScheduler::give_back`].
pub struct Lease<H> {
    ticket: u32,
    pub handler: H,
}

/// Outcome of one dispatch cycle.
pub enum Cycle<H> {
    /// The signal was not raised.
    Idle,
    /// Head started, radio busy, or nothing queued.
    Ran,
    /// Head could not be started and is done.
    Finished(Finished<H>),
}

pub struct ScanScheduler<R, H, const N: usize> {
    radio: R,
    queue: RequestQueue<Entry<H>, N>,
    next_ticket: u32,
    // terminal event for a request whose handler was lent out when it ended
    owed: Option<(u32, ScanEvent<'static>)>,
    // head has an accepted scan in flight
    scanning: bool,
    dispatch_pending: bool,
}

impl<R, H, const N: usize> ScanScheduler<R, H, N>
where
    R: ScanRadio,
    H: ScanHandler,
{
    pub const fn new(radio: R) -> Self {
        Self {
            radio,
            queue: RequestQueue::new(),
            next_ticket: 0,
            owed: None,
            scanning: false,
            dispatch_pending: false,
        }
    }

    /// Queue a scan. The radio is not touched until the next [`poll`](Self::poll).
    pub fn enqueue(&mut self, request: ScanRequest<H>) -> Result<(), QueueFull<H>> {
        if self.queue.is_full() {
            let full = QueueFull(request);
            warn!("scan: {}", full);
            return Err(full);
        }

        let ScanRequest {
            kind,
            channels,
            duration,
            handler,
        } = request;
        // room checked above
        let _ = self.queue.push(Entry {
            ticket: self.next_ticket,
            kind,
            channels,
            duration,
            handler: Some(handler),
        });
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.dispatch_pending = true;

        info!(
            "scan: queued {} scan on {} ({} pending)",
            kind,
            channels,
            self.queue.len()
        );
        Ok(())
    }

    /// Abort the radio and drop every queued request.
    ///
    /// Dropped requests get no terminal event. Anything that needs a
    /// completion guarantee must not rely on this.
    pub fn clear(&mut self) {
        self.radio.stop_scan();
        let dropped = self.queue.len();
        self.queue.clear();
        self.scanning = false;
        if dropped > 0 {
            warn!("scan: cleared, {} request(s) dropped without notice", dropped);
        }
    }

    /// [`clear`](Self::clear), and forget any pending dispatch.
    pub fn reset(&mut self) {
        self.clear();
        self.dispatch_pending = false;
    }

    /// Run the dispatch loop while its signal is raised.
    ///
    /// A head whose start fails outright is finished here and the next
    /// request is tried in the same call. Returns true if any cycle ran.
    pub fn poll(&mut self) -> bool {
        let mut ran = false;
        loop {
            match self.dispatch_once() {
                Cycle::Idle => return ran,
                Cycle::Ran => ran = true,
                Cycle::Finished(finished) => {
                    ran = true;
                    finished.deliver();
                }
            }
        }
    }

    /// One dispatch cycle, leaving delivery of a failed start to the caller.
    pub fn dispatch_once(&mut self) -> Cycle<H> {
        if !self.dispatch_pending {
            return Cycle::Idle;
        }
        self.dispatch_pending = false;

        if self.scanning {
            return Cycle::Ran;
        }
        let Some(head) = self.queue.peek() else {
            return Cycle::Ran;
        };
        let (kind, channels, duration) = (head.kind, head.channels, head.duration);

        match self.radio.start_scan(kind, channels, duration) {
            Ok(()) => {
                info!("scan: started {} scan on {}", kind, channels);
                self.scanning = true;
                Cycle::Ran
            }
            Err(StartError::AlreadyScanning) => {
                // radio will report completion of whatever it is running
                debug!("scan: radio busy, {} scan stays queued", kind);
                Cycle::Ran
            }
            Err(StartError::Failed(status)) => {
                // a refusal is never a success, whatever the driver says
                let status = if status.is_success() {
                    StatusCode::ERR_FATAL
                } else {
                    status
                };
                warn!("scan: {} scan start failed: {}", kind, status);
                match self.finish_head(ScanEvent::Failed {
                    kind,
                    channel: None,
                    status,
                }) {
                    Some(finished) => Cycle::Finished(finished),
                    None => Cycle::Ran,
                }
            }
        }
    }

    // pop the head and signal the next dispatch; hands back the handler
    // unless it is lent out, in which case the event waits for give_back
    fn finish_head(&mut self, event: ScanEvent<'static>) -> Option<Finished<H>> {
        let entry = self.queue.pop()?;
        self.scanning = false;
        self.dispatch_pending = true;

        match entry.handler {
            Some(handler) => Some(Finished { handler, event }),
            None => {
                if self.owed.replace((entry.ticket, event)).is_some() {
                    warn!("scan: two handlers lent out, earlier terminal event lost");
                }
                None
            }
        }
    }

    /// The radio finished (or gave up on) the current scan.
    ///
    /// Either way the head is done and the queue moves on, so one broken
    /// request cannot stall the rest. The caller delivers the result.
    pub fn complete_head(&mut self, channel: u8, status: StatusCode) -> Option<Finished<H>> {
        let Some(kind) = self.queue.peek().map(|head| head.kind) else {
            if !status.is_success() {
                warn!("scan: stale completion ({}) on empty queue", status);
            } else {
                debug!("scan: stale completion on empty queue");
            }
            return None;
        };

        let event = if status.is_success() {
            info!("scan: {} scan complete", kind);
            ScanEvent::Complete { kind, channel }
        } else {
            warn!("scan: {} scan failed on ch{}: {}", kind, channel, status);
            ScanEvent::Failed {
                kind,
                channel: Some(channel),
                status,
            }
        };
        self.finish_head(event)
    }

    /// Lend out the head's handler for one intermediate result.
    pub fn lend_head(&mut self) -> Option<Lease<H>> {
        let head = self.queue.peek_mut()?;
        let handler = head.handler.take()?;
        Some(Lease {
            ticket: head.ticket,
            handler,
        })
    }

    /// Return a lent handler. If its request ended meanwhile the handler
    /// comes back with the terminal event it is owed; if the request was
    /// cleared the handler is dropped.
    pub fn give_back(&mut self, lease: Lease<H>) -> Option<Finished<H>> {
        if let Some(head) = self.queue.peek_mut() {
            if head.ticket == lease.ticket && head.handler.is_none() {
                head.handler = Some(lease.handler);
                return None;
            }
        }
        match self.owed.take() {
            Some((ticket, event)) if ticket == lease.ticket => Some(Finished {
                handler: lease.handler,
                event,
            }),
            other => {
                self.owed = other;
                None
            }
        }
    }

    fn deliver_to_head(&mut self, event: ScanEvent<'_>) -> bool {
        match self.queue.peek_mut().and_then(|head| head.handler.as_mut()) {
            Some(handler) => {
                handler.on_scan_event(event);
                true
            }
            None => false,
        }
    }

    /// Energy reading for one channel of the running energy scan.
    pub fn on_energy_result(&mut self, channel: u8, rssi: i8) {
        if !self.deliver_to_head(ScanEvent::Energy { channel, rssi }) {
            debug!("scan: stale energy result ch{} ignored", channel);
        }
    }

    /// A network answered the running active scan.
    pub fn on_network_found(&mut self, network: &NetworkInfo, lqi: u8, rssi: i8) {
        if !self.deliver_to_head(ScanEvent::NetworkFound { network, lqi, rssi }) {
            debug!("scan: stale beacon from pan {:#06x} ignored", network.pan_id);
        }
    }

    /// [`complete_head`](Self::complete_head) and deliver the result.
    pub fn on_scan_complete(&mut self, channel: u8, status: StatusCode) {
        if let Some(finished) = self.complete_head(channel, status) {
            finished.deliver();
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn dispatch_pending(&self) -> bool {
        self.dispatch_pending
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Kinds of every queued request, head first.
    pub fn pending_kinds(&self) -> impl Iterator<Item = ScanKind> + '_ {
        self.queue.iter().map(|entry| entry.kind)
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }
}
