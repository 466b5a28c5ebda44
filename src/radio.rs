// Radio driver contract consumed by the scan scheduler
//
// One 802.15.4 radio, one scan at a time. The driver accepts or rejects
// a start request synchronously; everything after that (energy readings,
// beacons, completion) arrives later through the scheduler's router.
//
// Channel numbers follow page 0: 11..=26 in the 2.4 GHz band.

use core::fmt;

/// What kind of scan the radio should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanKind {
    /// Measure channel energy, one reading per channel.
    Energy,
    /// Send beacon requests and report every network that answers.
    Active,
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanKind::Energy => write!(f, "energy"),
            ScanKind::Active => write!(f, "active"),
        }
    }
}

/// Set of radio channels, bit n = channel n.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelMask(u32);

impl ChannelMask {
    pub const EMPTY: Self = Self(0);

    /// Every page 0 channel in the 2.4 GHz band (11..=26).
    pub const ALL: Self = Self(0x07FF_F800);

    pub const FIRST_CHANNEL: u8 = 11;
    pub const LAST_CHANNEL: u8 = 26;

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn single(channel: u8) -> Self {
        Self::EMPTY.with(channel)
    }

    // out of range channels are ignored
    pub const fn with(self, channel: u8) -> Self {
        if channel < 32 {
            Self(self.0 | (1 << channel))
        } else {
            self
        }
    }

    pub const fn contains(self, channel: u8) -> bool {
        channel < 32 && self.0 & (1 << channel) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Channel numbers in ascending order.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0u8..32).filter(move |&ch| self.contains(ch))
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Per-channel scan duration. Driver-defined exponent, passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanDuration(pub u8);

impl ScanDuration {
    /// Short dwell, good enough for join-time energy sweeps.
    pub const SHORT: Self = Self(3);
    /// Dwell long enough to catch slow beacon responders.
    pub const LONG: Self = Self(5);
}

impl Default for ScanDuration {
    fn default() -> Self {
        Self::SHORT
    }
}

/// Status code reported by the radio stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u8);

impl StatusCode {
    pub const SUCCESS: Self = Self(0x00);
    pub const ERR_FATAL: Self = Self(0x01);
    pub const MAC_INVALID_CHANNEL_MASK: Self = Self(0x3A);
    pub const MAC_BAD_SCAN_DURATION: Self = Self(0x3B);
    pub const MAC_INCORRECT_SCAN_TYPE: Self = Self(0x3C);
    pub const MAC_SCANNING: Self = Self(0x3D);
    pub const NETWORK_DOWN: Self = Self(0x90);

    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }

    const fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::SUCCESS => "success",
            Self::ERR_FATAL => "fatal error",
            Self::MAC_INVALID_CHANNEL_MASK => "invalid channel mask",
            Self::MAC_BAD_SCAN_DURATION => "bad scan duration",
            Self::MAC_INCORRECT_SCAN_TYPE => "incorrect scan type",
            Self::MAC_SCANNING => "already scanning",
            Self::NETWORK_DOWN => "network down",
            _ => return None,
        })
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({:#04x})", name, self.0),
            None => write!(f, "status {:#04x}", self.0),
        }
    }
}

impl core::error::Error for StatusCode {}

/// Why the radio refused to start a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    /// A scan is already running. Transient, the radio will call back.
    AlreadyScanning,
    /// The radio rejected the scan outright. The status should not be
    /// [`StatusCode::SUCCESS`]; the scheduler reports one as
    /// [`StatusCode::ERR_FATAL`].
    Failed(StatusCode),
}

impl StartError {
    /// Map a raw status from the radio stack. `None` means the scan started.
    pub const fn from_status(status: StatusCode) -> Option<Self> {
        match status {
            StatusCode::SUCCESS => None,
            StatusCode::MAC_SCANNING => Some(StartError::AlreadyScanning),
            other => Some(StartError::Failed(other)),
        }
    }

    pub const fn status(self) -> StatusCode {
        match self {
            StartError::AlreadyScanning => StatusCode::MAC_SCANNING,
            StartError::Failed(status) => status,
        }
    }
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartError::AlreadyScanning => write!(f, "radio already scanning"),
            StartError::Failed(status) => write!(f, "scan start rejected: {}", status),
        }
    }
}

impl core::error::Error for StartError {}

/// Beacon summary for a network discovered by an active scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    pub channel: u8,
    pub pan_id: u16,
    pub extended_pan_id: [u8; 8],
    pub allowing_join: bool,
    pub stack_profile: u8,
    pub nwk_update_id: u8,
}

/// The radio as seen by the scheduler.
///
/// Implementations report progress back by calling the scheduler's
/// `on_energy_result`, `on_network_found` and `on_scan_complete`, in that
/// order per scan: any number of results, then exactly one completion.
pub trait ScanRadio {
    fn start_scan(
        &mut self,
        kind: ScanKind,
        channels: ChannelMask,
        duration: ScanDuration,
    ) -> Result<(), StartError>;

    /// Best-effort abort of whatever scan is in flight.
    fn stop_scan(&mut self);
}

impl<R: ScanRadio + ?Sized> ScanRadio for &mut R {
    fn start_scan(
        &mut self,
        kind: ScanKind,
        channels: ChannelMask,
        duration: ScanDuration,
    ) -> Result<(), StartError> {
        (**self).start_scan(kind, channels, duration)
    }

    fn stop_scan(&mut self) {
        (**self).stop_scan()
    }
}
