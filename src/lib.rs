// scan-dispatch: shares one 802.15.4 radio between everything that wants
// to scan (join logic, diagnostics, periodic rescans)

#![no_std]

#[cfg(test)]
extern crate std;

pub mod kernel;
pub mod radio;

pub use kernel::{
    DEFAULT_QUEUE_SIZE, DefaultScheduler, DefaultService, QueueFull, ScanEvent, ScanHandler,
    ScanRequest, ScanScheduler, ScanService,
};
pub use radio::{
    ChannelMask, NetworkInfo, ScanDuration, ScanKind, ScanRadio, StartError, StatusCode,
};
