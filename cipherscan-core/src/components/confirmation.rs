//! Stochastic RSI confirmation of crossover candidates.
//!
//! A candidate from the indicator engine becomes a `SignalEvent` only when the
//! Stochastic RSI at the same candle agrees with its direction:
//! buy needs the confirmation line at or below `oversold`, sell at or above
//! `overbought`. Disagreement drops the candidate.
//!
//! The filter does not look at the risk tier; callers stamp it on the event.

use serde::{Deserialize, Serialize};

use super::indicator::Indicator;
use crate::domain::{
    CandleSeries, Direction, IndicatorReading, RiskTier, SignalEvent, StochRsiPoint, Timeframe,
};
use crate::indicators::{StochRsi, StochRsiLines};

/// Which Stochastic RSI line has to agree with the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationLine {
    K,
    #[default]
    D,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub rsi_period: usize,
    pub stoch_period: usize,
    pub k_smooth: usize,
    pub d_smooth: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub line: ConfirmationLine,
    /// Also require money flow moving in the candidate's direction.
    pub require_money_flow: bool,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            stoch_period: 14,
            k_smooth: 3,
            d_smooth: 3,
            oversold: 30.0,
            overbought: 70.0,
            line: ConfirmationLine::D,
            require_money_flow: false,
        }
    }
}

/// Outcome of checking one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Confirmed,
    StochRsiDisagrees,
    /// Stochastic RSI not yet defined at the candle.
    StochRsiUnavailable,
    MoneyFlowDisagrees,
}

/// A candidate together with the filter's verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub index: usize,
    pub direction: Direction,
    pub verdict: Verdict,
    pub stoch_rsi: Option<StochRsiPoint>,
}

#[derive(Debug, Clone)]
pub struct ConfirmationFilter {
    config: ConfirmationConfig,
    stoch_rsi: StochRsi,
}

impl ConfirmationFilter {
    /// Panics on zero periods; configs are validated before they get here.
    pub fn new(config: ConfirmationConfig) -> Self {
        let stoch_rsi = StochRsi::new(
            config.rsi_period,
            config.stoch_period,
            config.k_smooth,
            config.d_smooth,
        );
        Self { config, stoch_rsi }
    }

    pub fn config(&self) -> &ConfirmationConfig {
        &self.config
    }

    /// Minimum segment length before the confirmation line is defined.
    pub fn lookback(&self) -> usize {
        match self.config.line {
            ConfirmationLine::K => self.stoch_rsi.k_lookback() + 1,
            ConfirmationLine::D => self.stoch_rsi.lookback() + 1,
        }
    }

    /// Stochastic RSI over the whole series, computed per contiguous segment.
    ///
    /// Values inside gaps and warmups are NaN.
    pub fn stoch_lines(&self, series: &CandleSeries) -> StochRsiLines {
        let n = series.len();
        let mut out = StochRsiLines {
            rsi: vec![f64::NAN; n],
            k: vec![f64::NAN; n],
            d: vec![f64::NAN; n],
        };

        for segment in series.segments() {
            let start = segment.start;
            let lines = self.stoch_rsi.lines(&series.candles()[segment]);
            out.rsi[start..start + lines.rsi.len()].copy_from_slice(&lines.rsi);
            out.k[start..start + lines.k.len()].copy_from_slice(&lines.k);
            out.d[start..start + lines.d.len()].copy_from_slice(&lines.d);
        }

        out
    }

    /// Verdict for every candidate reading, in order.
    pub fn evaluate(&self, readings: &[IndicatorReading], lines: &StochRsiLines) -> Vec<Evaluation> {
        readings
            .iter()
            .enumerate()
            .filter_map(|(pos, reading)| {
                let direction = reading.candidate?;
                let previous = pos
                    .checked_sub(1)
                    .map(|p| &readings[p])
                    .filter(|p| p.index + 1 == reading.index);
                Some(self.evaluate_one(reading, previous, direction, lines))
            })
            .collect()
    }

    fn evaluate_one(
        &self,
        reading: &IndicatorReading,
        previous: Option<&IndicatorReading>,
        direction: Direction,
        lines: &StochRsiLines,
    ) -> Evaluation {
        let i = reading.index;
        let point = match (lines.k.get(i), lines.d.get(i)) {
            (Some(&k), Some(&d)) => Some(StochRsiPoint { k, d }),
            _ => None,
        };
        let line_value = point.map(|p| match self.config.line {
            ConfirmationLine::K => p.k,
            ConfirmationLine::D => p.d,
        });

        let verdict = match line_value {
            None => Verdict::StochRsiUnavailable,
            Some(v) if v.is_nan() => Verdict::StochRsiUnavailable,
            Some(v) => {
                let agrees = match direction {
                    Direction::Buy => v <= self.config.oversold,
                    Direction::Sell => v >= self.config.overbought,
                };
                if !agrees {
                    Verdict::StochRsiDisagrees
                } else if self.config.require_money_flow
                    && !money_flow_agrees(reading, previous, direction)
                {
                    Verdict::MoneyFlowDisagrees
                } else {
                    Verdict::Confirmed
                }
            }
        };

        Evaluation {
            index: i,
            direction,
            verdict,
            stoch_rsi: point.filter(|p| !p.k.is_nan() || !p.d.is_nan()),
        }
    }

    /// Confirmed events for a series and its engine readings.
    pub fn confirm(
        &self,
        series: &CandleSeries,
        readings: &[IndicatorReading],
        tier: RiskTier,
    ) -> Vec<SignalEvent> {
        let lines = self.stoch_lines(series);
        self.confirm_with_lines(series.symbol(), series.timeframe(), readings, &lines, tier)
    }

    /// Same as `confirm` with precomputed Stochastic RSI lines.
    pub fn confirm_with_lines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        readings: &[IndicatorReading],
        lines: &StochRsiLines,
        tier: RiskTier,
    ) -> Vec<SignalEvent> {
        self.evaluate(readings, lines)
            .into_iter()
            .filter(|e| e.verdict == Verdict::Confirmed)
            .filter_map(|e| {
                let pos = readings.iter().position(|r| r.index == e.index)?;
                let trigger = readings[pos];
                let mut supporting = Vec::with_capacity(2);
                if let Some(prev) = pos.checked_sub(1).map(|p| readings[p]) {
                    if prev.index + 1 == trigger.index {
                        supporting.push(prev);
                    }
                }
                supporting.push(trigger);
                Some(SignalEvent {
                    symbol: symbol.to_string(),
                    timeframe,
                    direction: e.direction,
                    risk_tier: tier,
                    timestamp: trigger.timestamp,
                    supporting_readings: supporting,
                    stoch_rsi: e.stoch_rsi?,
                })
            })
            .collect()
    }
}

impl Default for ConfirmationFilter {
    fn default() -> Self {
        Self::new(ConfirmationConfig::default())
    }
}

fn money_flow_agrees(
    reading: &IndicatorReading,
    previous: Option<&IndicatorReading>,
    direction: Direction,
) -> bool {
    let Some(prev) = previous else {
        return false;
    };
    match direction {
        Direction::Buy => reading.momentum_value > prev.momentum_value,
        Direction::Sell => reading.momentum_value < prev.momentum_value,
    }
}
