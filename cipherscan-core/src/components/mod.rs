//! Signal components — indicator trait, crossover detection, confirmation.
//!
//! - Indicator: pure numeric series over candles
//! - Signal: oscillator/signal-line crossovers inside the extreme zones
//! - Confirmation: Stochastic RSI agreement gate that produces signal events

pub mod confirmation;
pub mod indicator;
pub mod signal;

pub use confirmation::{
    ConfirmationConfig, ConfirmationFilter, ConfirmationLine, Evaluation, Verdict,
};
pub use indicator::{Indicator, IndicatorValues};
pub use signal::{crossover_at, detect_crossovers, ZoneLevels};
