use constants::selection::BACKGROUND_COLOUR;

/// Exact 24-bit pick colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectionColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl SelectionColor {
    pub const BACKGROUND: SelectionColor = SelectionColor {
        r: BACKGROUND_COLOUR[0],
        g: BACKGROUND_COLOUR[1],
        b: BACKGROUND_COLOUR[2],
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_packed(packed: u32) -> Self {
        Self {
            r: (packed & 0xff) as u8,
            g: ((packed >> 8) & 0xff) as u8,
            b: ((packed >> 16) & 0xff) as u8,
        }
    }

    pub fn packed(&self) -> u32 {
        self.r as u32 | (self.g as u32) << 8 | (self.b as u32) << 16
    }

    /// Normalised RGBA for flat-colour drawing.
    pub fn to_rgba(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            1.0,
        ]
    }

    /// Quantise a normalised colour read back from a framebuffer.
    pub fn from_rgba(rgba: [f32; 4]) -> Self {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(channel(rgba[0]), channel(rgba[1]), channel(rgba[2]))
    }
}

/// Sequential base-256 RGB counter, red as the least significant digit.
///
/// Starts just above (1, 1, 1), so no generated colour is ever the
/// background. Running past blue = 255 means every 24-bit colour has been
/// handed out, which only happens when selectables leak.
#[derive(Debug, Clone)]
pub struct ColorGenerator {
    last: u32,
}

impl Default for ColorGenerator {
    fn default() -> Self {
        Self { last: 0x01_01_01 }
    }
}

impl ColorGenerator {
    pub fn next_color(&mut self) -> SelectionColor {
        self.last += 1;
        if self.last > 0xff_ff_ff {
            panic!("selection manager is out of colours to generate");
        }
        SelectionColor::from_packed(self.last)
    }

    #[cfg(test)]
    pub(crate) fn starting_at(last: u32) -> Self {
        Self { last }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_carries_into_green() {
        let mut generator = ColorGenerator::default();
        assert_eq!(generator.next_color(), SelectionColor::new(2, 1, 1));

        let mut generator = ColorGenerator::starting_at(0x01_01_fe);
        assert_eq!(generator.next_color(), SelectionColor::new(255, 1, 1));
        assert_eq!(generator.next_color(), SelectionColor::new(0, 2, 1));
    }

    #[test]
    #[should_panic(expected = "out of colours")]
    fn exhausting_colour_space_is_fatal() {
        let mut generator = ColorGenerator::starting_at(0xff_ff_fe);
        generator.next_color();
        generator.next_color();
    }

    #[test]
    fn rgba_round_trip_is_exact() {
        let colour = SelectionColor::new(7, 200, 13);
        assert_eq!(SelectionColor::from_rgba(colour.to_rgba()), colour);
    }
}
