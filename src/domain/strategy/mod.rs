//! Strategy capability and registry.
//!
//! A strategy is anything implementing [`SignalSource`]: a pure function from
//! a bar table to one [`Signal`] per bar. Strategies never see positions,
//! returns, or other strategies' output. The [`StrategyRegistry`] maps a
//! stable identifier to a constructor so the CLI can select strategies by
//! name.

pub mod bollinger_volume;
pub mod channel_breakout;
pub mod ma_crossover;

use crate::domain::bar::BarTable;
use crate::domain::error::StratbenchError;
use crate::domain::signal::Signal;
use crate::ports::config_port::ConfigPort;
use std::collections::BTreeMap;

pub use bollinger_volume::BollingerVolume;
pub use channel_breakout::ChannelBreakout;
pub use ma_crossover::MaCrossover;

/// Signal generation capability.
///
/// Implementations must not look past the bar being evaluated and must return
/// exactly one signal per bar of `table`.
pub trait SignalSource: Send + Sync {
    /// Registry identifier, e.g. `bollinger_volume`.
    fn id(&self) -> &str;

    /// Display name used in reports.
    fn name(&self) -> &str;

    fn generate_signals(&self, table: &BarTable) -> Result<Vec<Signal>, StratbenchError>;
}

pub type StrategyConstructor = fn(&dyn ConfigPort) -> Result<Box<dyn SignalSource>, StratbenchError>;

/// Keyword selecting every registered strategy.
pub const ALL_STRATEGIES: &str = "all";

#[derive(Clone, Default)]
pub struct StrategyRegistry {
    constructors: BTreeMap<&'static str, StrategyConstructor>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(bollinger_volume::ID, bollinger_volume::boxed);
        registry.register(channel_breakout::ID, channel_breakout::boxed);
        registry.register(ma_crossover::ID, ma_crossover::boxed);
        registry
    }

    pub fn register(&mut self, id: &'static str, constructor: StrategyConstructor) {
        self.constructors.insert(id, constructor);
    }

    /// Registered identifiers in sorted order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.constructors.contains_key(id)
    }

    pub fn build(
        &self,
        id: &str,
        config: &dyn ConfigPort,
    ) -> Result<Box<dyn SignalSource>, StratbenchError> {
        let constructor =
            self.constructors
                .get(id)
                .ok_or_else(|| StratbenchError::UnknownStrategy { id: id.to_string() })?;
        constructor(config)
    }

    /// Builds the selected strategies in selection order. An empty selection
    /// or one containing `all` builds every registered strategy; repeated ids
    /// are built once.
    pub fn build_selection(
        &self,
        selection: &[String],
        config: &dyn ConfigPort,
    ) -> Result<Vec<Box<dyn SignalSource>>, StratbenchError> {
        let ids: Vec<&str> = if selection.is_empty()
            || selection.iter().any(|s| s.eq_ignore_ascii_case(ALL_STRATEGIES))
        {
            self.ids()
        } else {
            let mut ids: Vec<&str> = Vec::with_capacity(selection.len());
            for id in selection {
                if !ids.contains(&id.as_str()) {
                    ids.push(id.as_str());
                }
            }
            ids
        };

        ids.into_iter().map(|id| self.build(id, config)).collect()
    }
}

/// Config section holding a strategy's parameters.
pub fn config_section(id: &str) -> String {
    format!("strategy.{id}")
}

pub(crate) fn positive_param(
    config: &dyn ConfigPort,
    id: &str,
    key: &str,
    default: f64,
) -> Result<f64, StratbenchError> {
    let section = config_section(id);
    let value = config.get_double(&section, key, default);
    if !(value.is_finite() && value > 0.0) {
        return Err(StratbenchError::ConfigInvalid {
            section,
            key: key.to_string(),
            reason: format!("must be a positive number, got {value}"),
        });
    }
    Ok(value)
}

pub(crate) fn period_param(
    config: &dyn ConfigPort,
    id: &str,
    key: &str,
    default: usize,
) -> Result<usize, StratbenchError> {
    let section = config_section(id);
    let value = config.get_int(&section, key, default as i64);
    match usize::try_from(value) {
        Ok(period) if period >= 1 => Ok(period),
        _ => Err(StratbenchError::ConfigInvalid {
            section,
            key: key.to_string(),
            reason: format!("must be at least 1, got {value}"),
        }),
    }
}
