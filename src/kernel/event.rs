// Scan events delivered to requesters
//
// One variant per (scan kind, outcome) pair so a handler never has to
// guess whether a byte is an RSSI or a status code. A request sees zero
// or more Energy/NetworkFound events followed by exactly one terminal
// event (Complete or Failed).

use crate::radio::{NetworkInfo, ScanKind, StatusCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent<'a> {
    /// Energy reading for one channel of an energy scan.
    Energy { channel: u8, rssi: i8 },
    /// A network answered an active scan.
    NetworkFound {
        network: &'a NetworkInfo,
        lqi: u8,
        rssi: i8,
    },
    /// The scan finished successfully. Terminal.
    Complete { kind: ScanKind, channel: u8 },
    /// The scan could not be started or the radio reported failure. Terminal.
    ///
    /// `channel` is `None` when the scan never started.
    Failed {
        kind: ScanKind,
        channel: Option<u8>,
        status: StatusCode,
    },
}

impl ScanEvent<'_> {
    pub const fn kind(&self) -> ScanKind {
        match self {
            ScanEvent::Energy { .. } => ScanKind::Energy,
            ScanEvent::NetworkFound { .. } => ScanKind::Active,
            ScanEvent::Complete { kind, .. } | ScanEvent::Failed { kind, .. } => *kind,
        }
    }

    /// True for the last event a request will ever see.
    pub const fn is_complete(&self) -> bool {
        matches!(self, ScanEvent::Complete { .. } | ScanEvent::Failed { .. })
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self, ScanEvent::Failed { .. })
    }

    /// Final status, only on terminal events.
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            ScanEvent::Complete { .. } => Some(StatusCode::SUCCESS),
            ScanEvent::Failed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Receives the events of one scan request.
pub trait ScanHandler {
    fn on_scan_event(&mut self, event: ScanEvent<'_>);
}

impl<F> ScanHandler for F
where
    F: FnMut(ScanEvent<'_>),
{
    fn on_scan_event(&mut self, event: ScanEvent<'_>) {
        self(event)
    }
}
