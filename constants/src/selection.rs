/// Number of fresh pick colours generated each time the pool runs dry
pub const COLOUR_CHUNK_SIZE: usize = 256;

/// Tint applied to selected or in-action objects (RGB)
pub const SELECTED_COLOUR: [f32; 3] = [1.0, 0.0, 1.0];

/// Pick colour of empty space; never handed out to a selectable
pub const BACKGROUND_COLOUR: [u8; 3] = [0, 0, 0];
