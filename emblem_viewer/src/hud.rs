//! Window title readout: emblem, color, and a live hand/spread meter.

use emblem_field::{GestureSignal, Rgb, ShapeId};

const METER_CELLS: usize = 10;

/// Text bar for a spread in `[0, 1]`, e.g. `[######....]`.
pub fn spread_meter(spread: f32) -> String {
    let spread = if spread.is_finite() {
        spread.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (spread * METER_CELLS as f32).round() as usize;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        ".".repeat(METER_CELLS - filled)
    )
}

pub fn status_title(shape: ShapeId, color: Rgb, signal: GestureSignal, spread: f32) -> String {
    let hand = if signal.detected {
        format!("hand {:.2}", signal.openness)
    } else {
        "no hand".to_string()
    };
    format!(
        "Emblem Field - {} {} | {hand} | spread {} {:.2}",
        shape.label(),
        color,
        spread_meter(spread),
        spread
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_fills_with_spread() {
        assert_eq!(spread_meter(0.0), "[..........]");
        assert_eq!(spread_meter(0.55), "[######....]");
        assert_eq!(spread_meter(3.0), "[##########]");
        assert_eq!(spread_meter(f32::NAN), "[..........]");
    }

    #[test]
    fn title_reports_hand_state() {
        let seen = status_title(
            ShapeId::Heart,
            Rgb::WHITE,
            GestureSignal::detected(0.8),
            0.5,
        );
        assert!(seen.starts_with("Emblem Field - Heart"));
        assert!(seen.contains("hand 0.80"));
        let missing = status_title(ShapeId::Tree, Rgb::WHITE, GestureSignal::NONE, 0.0);
        assert!(missing.contains("no hand"));
    }
}
