//! Plain-text rendering of controller records for the CLI.

use std::fmt::Write;

use screenlogic_protocol::{ControllerConfig, ControllerStatus};

pub fn config_text(cfg: &ControllerConfig) -> String {
    let mut out = String::new();
    let units = if cfg.celsius { "C" } else { "F" };
    let _ = writeln!(out, "Model: {} (id {})", cfg.model, cfg.id);
    let _ = writeln!(out, "Units: {units}");
    let _ = writeln!(out, "Equipment: {:?}", cfg.equipment);
    if !cfg.intelliflo.is_empty() {
        let slots: Vec<String> = cfg.intelliflo.iter().map(|p| p.slot.to_string()).collect();
        let _ = writeln!(out, "IntelliFlo pumps: {}", slots.join(", "));
    }
    let _ = writeln!(out, "Circuits:");
    for c in &cfg.circuits {
        let _ = writeln!(
            out,
            "  {:>4}  {:<20} {:<16} {}",
            c.id,
            c.name,
            c.function.to_string(),
            c.interface
        );
    }
    out
}

/// Status listing, naming circuits from `cfg` when it is available.
pub fn status_text(status: &ControllerStatus, cfg: Option<&ControllerConfig>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "State: {}", status.state);
    if status.alert != 0 {
        let _ = writeln!(out, "Alerts: {}", status.alert);
    }
    for c in &status.circuits {
        let name = cfg.and_then(|cfg| cfg.circuit_name(c.id)).unwrap_or("");
        let state = if c.on { "on" } else { "off" };
        let _ = writeln!(out, "  {:>4}  {:<20} {state}", c.id, name);
    }
    out
}
