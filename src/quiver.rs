//! Arrow glyphs for drawing a velocity field.
//!
//! Geometry only, in data coordinates. Arrow proportions are measured in
//! shaft widths.

use crate::format::BirdState;

/// Shaft width as a fraction of the domain size.
const SHAFT_WIDTH: f64 = 0.005;
const HEAD_WIDTH: f64 = 3.0;
const HEAD_LENGTH: f64 = 5.0;
const HEAD_AXIS_LENGTH: f64 = 4.5;

/// Arrow scaling shared by all birds of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quiver {
    length_per_speed: f64,
    width: f64,
}

impl Quiver {
    /// Pick a scale from the mean speed and number of arrows so that a typical
    /// arrow stays short relative to the domain.
    pub fn autoscale(birds: &[BirdState], domain_size: f64) -> Self {
        let width = SHAFT_WIDTH * domain_size;

        let n_birds = birds.len();
        if n_birds == 0 {
            return Self {
                length_per_speed: 0.0,
                width,
            };
        }

        let mean_speed = birds.iter().map(BirdState::speed).sum::<f64>() / n_birds as f64;
        let spacing = (n_birds as f64).sqrt().max(10.0);
        let length_per_speed = if mean_speed.is_finite() && mean_speed > 0.0 {
            domain_size / (1.8 * mean_speed * spacing)
        } else {
            0.0
        };

        Self {
            length_per_speed,
            width,
        }
    }

    /// Arrow anchored at the bird's position, or `None` when it has no length.
    pub fn arrow(&self, bird: &BirdState) -> Option<Arrow> {
        let speed = bird.speed();
        let length = speed * self.length_per_speed;
        if !length.is_finite() || length <= 0.0 {
            return None;
        }

        Some(Arrow {
            origin: (bird.x, bird.y),
            direction: (bird.vx / speed, bird.vy / speed),
            length,
            width: self.width,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrow {
    origin: (f64, f64),
    direction: (f64, f64),
    length: f64,
    width: f64,
}

impl Arrow {
    pub fn tip(&self) -> (f64, f64) {
        self.place(self.length, 0.0)
    }

    /// Closed outline: shaft, swept-back head, back to the shaft.
    pub fn outline(&self) -> [(f64, f64); 7] {
        // Short arrows shrink as a whole instead of losing their head.
        let mut width = self.width;
        let full_head = HEAD_LENGTH * width;
        if self.length < full_head {
            width *= self.length / full_head;
        }

        let half_shaft = width / 2.0;
        let half_head = HEAD_WIDTH * width / 2.0;
        let joint = self.length - HEAD_AXIS_LENGTH * width;
        let barb = self.length - HEAD_LENGTH * width;

        [
            self.place(0.0, -half_shaft),
            self.place(joint, -half_shaft),
            self.place(barb, -half_head),
            self.tip(),
            self.place(barb, half_head),
            self.place(joint, half_shaft),
            self.place(0.0, half_shaft),
        ]
    }

    fn place(&self, along: f64, across: f64) -> (f64, f64) {
        let (dx, dy) = self.direction;
        (
            self.origin.0 + along * dx - across * dy,
            self.origin.1 + along * dy + across * dx,
        )
    }
}
