//! Alert Generator: turns smoothed track state plus classifier signals into ranked alerts.

mod condition;
mod generator;

pub use condition::{Activity, AlertCondition, Severity};
pub use generator::{Alert, AlertPolicy, SemanticSignal, generate_alert, rank_alerts};
