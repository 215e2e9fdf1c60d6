//! Domain types for CipherScan

pub mod candle;
pub mod signal;

pub use candle::{Candle, CandleSeries, Gap, GapKind, SeriesError, Timeframe};
pub use signal::{Direction, IndicatorReading, RiskTier, SignalEvent, StochRsiPoint};

/// Symbol type alias
pub type Symbol = String;
