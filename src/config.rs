//! Decoder configuration: frame/modulation selection and bridge options.
//!
//! The host picks one [`FrameMode`] and one [`ModulationMode`]; [`resolve`]
//! expands them into the detailed [`DecoderConfig`] the decoder thread reads.

use std::time::Duration;

/// Samples per symbol before any protocol forcing (4800 symbols/s at 48kHz).
pub const DEFAULT_SAMPLES_PER_SYMBOL: u32 = 10;

/// Symbol center before any protocol forcing.
pub const DEFAULT_SYMBOL_CENTER: u32 = 4;

/// Which radio protocols the decoder should look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameMode {
    /// X2-TDMA, P25 Phase 1, NXDN96 and DMR/MOTOTRBO.
    #[default]
    AutoDetect,
    /// D-STAR only.
    Dstar,
    /// X2-TDMA only.
    X2Tdma,
    /// EDACS/ProVoice only. Forces 9600 symbols/s and GFSK.
    ProVoice,
    /// P25 Phase 1 only.
    P25Phase1,
    /// NXDN 4800 baud (IDAS) only. Forces 2400 symbols/s and GFSK.
    Nxdn48Idas,
    /// NXDN 9600 baud only. Forces GFSK.
    Nxdn96,
    /// DMR/MOTOTRBO only.
    DmrMototrbo,
}

impl FrameMode {
    /// Every frame mode, in selector order.
    pub const ALL: [FrameMode; 8] = [
        Self::AutoDetect,
        Self::Dstar,
        Self::X2Tdma,
        Self::ProVoice,
        Self::P25Phase1,
        Self::Nxdn48Idas,
        Self::Nxdn96,
        Self::DmrMototrbo,
    ];

    /// Protocols enabled by this mode.
    #[must_use]
    pub const fn protocols(self) -> ProtocolSet {
        match self {
            Self::AutoDetect => ProtocolSet {
                x2tdma: true,
                p25_phase1: true,
                nxdn96: true,
                dmr: true,
                ..ProtocolSet::NONE
            },
            Self::Dstar => ProtocolSet {
                dstar: true,
                ..ProtocolSet::NONE
            },
            Self::X2Tdma => ProtocolSet {
                x2tdma: true,
                ..ProtocolSet::NONE
            },
            Self::ProVoice => ProtocolSet {
                provoice: true,
                ..ProtocolSet::NONE
            },
            Self::P25Phase1 => ProtocolSet {
                p25_phase1: true,
                ..ProtocolSet::NONE
            },
            Self::Nxdn48Idas => ProtocolSet {
                nxdn48: true,
                ..ProtocolSet::NONE
            },
            Self::Nxdn96 => ProtocolSet {
                nxdn96: true,
                ..ProtocolSet::NONE
            },
            Self::DmrMototrbo => ProtocolSet {
                dmr: true,
                ..ProtocolSet::NONE
            },
        }
    }

    /// Symbol timing this mode imposes, if any.
    #[must_use]
    pub const fn forced_timing(self) -> Option<SymbolTiming> {
        match self {
            Self::ProVoice => Some(SymbolTiming {
                samples_per_symbol: 5,
                symbol_center: 2,
            }),
            Self::Nxdn48Idas => Some(SymbolTiming {
                samples_per_symbol: 20,
                symbol_center: 10,
            }),
            _ => None,
        }
    }

    /// Modulation this mode imposes, if any.
    ///
    /// A forced modulation wins over whatever [`ModulationMode`] was chosen.
    #[must_use]
    pub const fn forced_modulation(self) -> Option<ModulationMode> {
        match self {
            Self::ProVoice | Self::Nxdn48Idas | Self::Nxdn96 => Some(ModulationMode::Gfsk),
            _ => None,
        }
    }

    /// Operator-facing notices describing what this mode restricts.
    #[must_use]
    pub const fn notices(self) -> &'static [&'static str] {
        match self {
            Self::AutoDetect => &[],
            Self::Dstar => &["decoding only D-STAR frames"],
            Self::X2Tdma => &["decoding only X2-TDMA frames"],
            Self::ProVoice => &[
                "setting symbol rate to 9600 / second",
                "enabling only GFSK modulation optimizations",
                "decoding only ProVoice frames",
            ],
            Self::P25Phase1 => &["decoding only P25 Phase 1 frames"],
            Self::Nxdn48Idas => &[
                "setting symbol rate to 2400 / second",
                "enabling only GFSK modulation optimizations",
                "decoding only NXDN 4800 baud frames",
            ],
            Self::Nxdn96 => &[
                "enabling only GFSK modulation optimizations",
                "decoding only NXDN 9600 baud frames",
            ],
            Self::DmrMototrbo => &["decoding only DMR/MOTOTRBO frames"],
        }
    }
}

/// Which demodulator optimizations the decoder may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModulationMode {
    /// C4FM, QPSK and GFSK all enabled.
    #[default]
    AutoSelect,
    /// C4FM only.
    C4fm,
    /// GFSK only.
    Gfsk,
    /// QPSK only.
    Qpsk,
}

impl ModulationMode {
    /// Every modulation mode, in selector order.
    pub const ALL: [ModulationMode; 4] = [Self::AutoSelect, Self::C4fm, Self::Gfsk, Self::Qpsk];

    /// Modulations enabled by this mode.
    #[must_use]
    pub const fn modulations(self) -> ModulationSet {
        match self {
            Self::AutoSelect => ModulationSet {
                c4fm: true,
                qpsk: true,
                gfsk: true,
            },
            Self::C4fm => ModulationSet {
                c4fm: true,
                qpsk: false,
                gfsk: false,
            },
            Self::Gfsk => ModulationSet {
                c4fm: false,
                qpsk: false,
                gfsk: true,
            },
            Self::Qpsk => ModulationSet {
                c4fm: false,
                qpsk: true,
                gfsk: false,
            },
        }
    }

    /// Numeric modulation selector the demodulator starts from.
    #[must_use]
    pub const fn rf_modulation(self) -> RfModulation {
        match self {
            Self::AutoSelect | Self::C4fm => RfModulation::C4fm,
            Self::Gfsk => RfModulation::Gfsk,
            Self::Qpsk => RfModulation::Qpsk,
        }
    }

    /// Operator-facing notice for this mode, if it restricts anything.
    #[must_use]
    pub const fn notice(self) -> Option<&'static str> {
        match self {
            Self::AutoSelect => None,
            Self::C4fm => Some("enabling only C4FM modulation optimizations"),
            Self::Gfsk => Some("enabling only GFSK modulation optimizations"),
            Self::Qpsk => Some("enabling only QPSK modulation optimizations"),
        }
    }
}

/// Numeric modulation selector (`rf_mod`) handed to the demodulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RfModulation {
    /// Selector 0.
    C4fm = 0,
    /// Selector 1.
    Qpsk = 1,
    /// Selector 2.
    Gfsk = 2,
}

impl RfModulation {
    /// Returns the raw selector value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Set of enabled radio protocols. Flags are independent of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ProtocolSet {
    /// D-STAR.
    pub dstar: bool,
    /// X2-TDMA.
    pub x2tdma: bool,
    /// P25 Phase 1.
    pub p25_phase1: bool,
    /// NXDN 4800 baud.
    pub nxdn48: bool,
    /// NXDN 9600 baud.
    pub nxdn96: bool,
    /// DMR/MOTOTRBO.
    pub dmr: bool,
    /// EDACS/ProVoice.
    pub provoice: bool,
}

impl ProtocolSet {
    /// No protocol enabled.
    pub const NONE: ProtocolSet = ProtocolSet {
        dstar: false,
        x2tdma: false,
        p25_phase1: false,
        nxdn48: false,
        nxdn96: false,
        dmr: false,
        provoice: false,
    };

    /// Number of enabled protocols.
    #[must_use]
    pub fn count(&self) -> usize {
        [
            self.dstar,
            self.x2tdma,
            self.p25_phase1,
            self.nxdn48,
            self.nxdn96,
            self.dmr,
            self.provoice,
        ]
        .iter()
        .filter(|&&enabled| enabled)
        .count()
    }
}

/// Set of enabled modulation optimizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModulationSet {
    /// C4FM.
    pub c4fm: bool,
    /// QPSK.
    pub qpsk: bool,
    /// GFSK.
    pub gfsk: bool,
}

/// Symbol timing derived from the selected symbol rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolTiming {
    /// Input samples per symbol.
    pub samples_per_symbol: u32,
    /// Sample index within a symbol used for slicing.
    pub symbol_center: u32,
}

impl Default for SymbolTiming {
    fn default() -> Self {
        Self {
            samples_per_symbol: DEFAULT_SAMPLES_PER_SYMBOL,
            symbol_center: DEFAULT_SYMBOL_CENTER,
        }
    }
}

/// Resolved decoder parameters. Immutable once the bridge is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Enabled protocols.
    pub protocols: ProtocolSet,
    /// Enabled modulation optimizations.
    pub modulations: ModulationSet,
    /// Starting demodulator selector.
    pub rf_modulation: RfModulation,
    /// Symbol timing.
    pub timing: SymbolTiming,
    /// Unvoiced speech synthesis quality.
    pub uv_quality: i32,
    /// Decoder verbosity level.
    pub verbosity: i32,
    /// Diagnostic error bars.
    pub error_bars: bool,
    /// Pass-through mode: report full production on every call.
    pub empty_frames: bool,
    /// Instance identifier, used for diagnostics only.
    pub instance: u32,
}

/// Expands the host's frame/modulation selection into a [`DecoderConfig`].
///
/// The modulation selector is applied first, then any modulation or timing
/// the frame mode forces is laid on top. ProVoice, NXDN48 and NXDN96 therefore
/// always end up GFSK-only whatever `modulation` says.
///
/// Pass-through is off and the instance is 0; use [`BridgeParams::resolve`]
/// to set them.
///
/// # Example
///
/// ```
/// use dsd_bridge::{resolve, FrameMode, ModulationMode, RfModulation};
///
/// let config = resolve(FrameMode::ProVoice, ModulationMode::AutoSelect, 3, 2, false);
/// assert_eq!(config.timing.samples_per_symbol, 5);
/// assert_eq!(config.timing.symbol_center, 2);
/// assert!(config.modulations.gfsk && !config.modulations.c4fm && !config.modulations.qpsk);
/// assert_eq!(config.rf_modulation, RfModulation::Gfsk);
/// ```
#[must_use]
pub fn resolve(
    frame: FrameMode,
    modulation: ModulationMode,
    uv_quality: i32,
    verbosity: i32,
    error_bars: bool,
) -> DecoderConfig {
    let effective = frame.forced_modulation().unwrap_or(modulation);

    DecoderConfig {
        protocols: frame.protocols(),
        modulations: effective.modulations(),
        rf_modulation: effective.rf_modulation(),
        timing: frame.forced_timing().unwrap_or_default(),
        uv_quality,
        verbosity,
        error_bars,
        empty_frames: false,
        instance: 0,
    }
}

/// Construction parameters for a bridge, as the host scheduler supplies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeParams {
    /// Protocol selector.
    pub frame: FrameMode,
    /// Modulation selector.
    pub modulation: ModulationMode,
    /// Unvoiced speech synthesis quality.
    pub uv_quality: i32,
    /// Diagnostic error bars.
    pub error_bars: bool,
    /// Decoder verbosity level.
    pub verbosity: i32,
    /// Pass-through mode.
    pub empty_frames: bool,
    /// Instance identifier for logs.
    pub instance: u32,
}

impl Default for BridgeParams {
    fn default() -> Self {
        Self {
            frame: FrameMode::AutoDetect,
            modulation: ModulationMode::AutoSelect,
            uv_quality: 3,
            error_bars: false,
            verbosity: 2,
            empty_frames: false,
            instance: 0,
        }
    }
}

impl BridgeParams {
    /// Resolves these parameters into a full decoder configuration.
    #[must_use]
    pub fn resolve(&self) -> DecoderConfig {
        DecoderConfig {
            empty_frames: self.empty_frames,
            instance: self.instance,
            ..resolve(
                self.frame,
                self.modulation,
                self.uv_quality,
                self.verbosity,
                self.error_bars,
            )
        }
    }

    /// The explicit modulation selector the frame mode overrides, if any.
    ///
    /// `None` when the frame mode forces nothing, when the selector is
    /// [`ModulationMode::AutoSelect`], or when it already matches.
    #[must_use]
    pub fn overridden_modulation(&self) -> Option<ModulationMode> {
        let forced = self.frame.forced_modulation()?;
        match self.modulation {
            ModulationMode::AutoSelect => None,
            requested if requested == forced => None,
            requested => Some(requested),
        }
    }
}

/// Runtime options for the bridge machinery itself.
///
/// # Example
///
/// ```
/// use dsd_bridge::BridgeOptions;
/// use std::time::Duration;
///
/// let options = BridgeOptions {
///     shutdown_timeout: Some(Duration::from_secs(1)),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// How long teardown waits for the decoder thread to acknowledge its stop.
    ///
    /// `None` waits indefinitely. When the wait expires teardown reports
    /// [`BridgeError::ShutdownTimeout`](crate::BridgeError::ShutdownTimeout)
    /// and leaves the shared state alive for the thread.
    /// Default: 5 seconds
    pub shutdown_timeout: Option<Duration>,

    /// Capacity of the decoded audio accumulator, in samples.
    ///
    /// Decoded audio waits here until a call requests it.
    /// Default: 160 000 samples
    pub audio_capacity: usize,

    /// Name for the decoder thread. Default: `dsd-decoder-<instance>`.
    pub thread_name: Option<String>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Some(Duration::from_secs(5)),
            audio_capacity: 160_000,
            thread_name: None,
        }
    }
}
