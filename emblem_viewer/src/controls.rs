//! Keyboard selection surface.
//!
//! `1`-`7` pick an emblem, `C` cycles through the color palette, and when no
//! recording drives the tracker `Space` shows/hides a simulated hand whose
//! openness follows `Up`/`Down`.

use emblem_field::{ManualHand, Rgb, ShapeId};
use winit::keyboard::{Key, NamedKey};

/// Colors offered by the `C` key, after each emblem's own color.
pub const PALETTE: [Rgb; 6] = [
    Rgb::WHITE,
    Rgb::new(0xff, 0xd7, 0x00),
    Rgb::new(0x00, 0xe5, 0xff),
    Rgb::new(0xff, 0x4f, 0x81),
    Rgb::new(0x7c, 0xff, 0x6b),
    Rgb::new(0xb3, 0x88, 0xff),
];

const OPENNESS_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    SelectShape(ShapeId),
    NextShape,
    CycleColor,
    Open,
    Close,
    ToggleHand,
    Quit,
}

pub fn action_for_key(key: &Key) -> Option<Action> {
    match key {
        Key::Named(NamedKey::Escape) => Some(Action::Quit),
        Key::Named(NamedKey::ArrowUp) => Some(Action::Open),
        Key::Named(NamedKey::ArrowDown) => Some(Action::Close),
        Key::Named(NamedKey::Space) => Some(Action::ToggleHand),
        Key::Named(NamedKey::Tab) => Some(Action::NextShape),
        Key::Character(text) => action_for_char(text.chars().next()?),
        _ => None,
    }
}

fn action_for_char(ch: char) -> Option<Action> {
    match ch.to_ascii_lowercase() {
        'c' => Some(Action::CycleColor),
        'q' => Some(Action::Quit),
        digit @ '1'..='7' => {
            let index = digit as usize - '1' as usize;
            Some(Action::SelectShape(ShapeId::ALL[index]))
        }
        _ => None,
    }
}

/// Steps through [`PALETTE`]; reset whenever a shape is picked so the first
/// press after a shape change moves off the emblem's own color.
#[derive(Debug, Default)]
pub struct ColorCycle {
    next: usize,
}

impl ColorCycle {
    pub fn advance(&mut self) -> Rgb {
        let color = PALETTE[self.next % PALETTE.len()];
        self.next = (self.next + 1) % PALETTE.len();
        color
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Keyboard-driven stand-in for a camera hand.
#[derive(Debug)]
pub struct SimulatedHand {
    hand: ManualHand,
    openness: f32,
    visible: bool,
}

impl SimulatedHand {
    /// Picks up whatever the handle currently reports (e.g. `--hand`).
    pub fn new(hand: ManualHand) -> Self {
        let current = hand.current();
        Self {
            hand,
            openness: current.openness,
            visible: current.detected,
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        self.publish();
    }

    pub fn open(&mut self) {
        self.adjust(OPENNESS_STEP);
    }

    pub fn close(&mut self) {
        self.adjust(-OPENNESS_STEP);
    }

    pub fn openness(&self) -> f32 {
        self.openness
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn adjust(&mut self, delta: f32) {
        self.openness = (self.openness + delta).clamp(0.0, 1.0);
        // Adjusting implies a hand is in view.
        self.visible = true;
        self.publish();
    }

    fn publish(&self) {
        if self.visible {
            self.hand.show(self.openness);
        } else {
            self.hand.hide();
        }
    }
}
