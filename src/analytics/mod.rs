//! Pure market maths: indicators, signal voting, portfolio metrics and screening.

pub mod indicators;
pub mod portfolio;
pub mod screening;
pub mod signals;

pub use portfolio::{compute_metrics, Holding, PortfolioMetrics, RiskFigures};
pub use screening::{Candidate, Criteria, ScreeningStrategy};
pub use signals::{generate_signals, IndicatorSnapshot, IndicatorValues, SignalAnalysis};
