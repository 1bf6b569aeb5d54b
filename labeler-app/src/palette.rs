use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Colors GitHub renders poorly or that read as "unset".
const RESERVED_COLORS: &[&str] = &["000000", "ffffff"];

/// Source of colors for newly created labels.
pub trait ColorSource: Send {
    /// Six lowercase hex digits, no leading `#`.
    fn next_color(&mut self) -> String;
}

/// Every label gets the same color.
#[derive(Debug, Clone)]
pub struct FixedColor(String);

impl FixedColor {
    pub fn new(color: &str) -> Self {
        Self(color.trim().trim_start_matches('#').to_ascii_lowercase())
    }
}

impl ColorSource for FixedColor {
    fn next_color(&mut self) -> String {
        self.0.clone()
    }
}

/// Uniformly random colors, skipping reserved values.
#[derive(Debug, Clone)]
pub struct RandomColors {
    rng: StdRng,
}

impl RandomColors {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomColors {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorSource for RandomColors {
    fn next_color(&mut self) -> String {
        loop {
            let value: u32 = self.rng.gen_range(0..=0x00FF_FFFF);
            let color = format!("{value:06x}");
            if !RESERVED_COLORS.contains(&color.as_str()) {
                return color;
            }
        }
    }
}
