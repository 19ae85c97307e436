/// Initial distance between camera and look-target (metres)
pub const DEFAULT_ORBIT_RADIUS: f32 = 5.0;

/// Initial spherical angles of the orbit camera (radians)
pub const DEFAULT_THETA: f32 = std::f32::consts::FRAC_PI_4;
pub const DEFAULT_PHI: f32 = std::f32::consts::FRAC_PI_4;

/// Theta stays strictly inside the poles (≈0.5° .. ≈179.5°)
pub const MIN_THETA: f32 = 0.008_726_646;
pub const MAX_THETA: f32 = 3.132_866;

/// Fling velocity bounds; velocity below the minimum stops the fling
pub const MAX_FLING_VELOCITY: f32 = 25.0;
pub const MIN_FLING_VELOCITY: f32 = 0.05;

/// Gesture velocity divisor when converting a fling to orbit velocity
pub const FLING_VELOCITY_DIVISOR: f32 = 500.0;

/// Per-frame multiplicative fling decay
pub const FLING_DECAY: f32 = 0.9;

/// Largest pan step accepted per gesture event
pub const MAX_TRANSLATE_SPEED: f32 = 0.18;

/// Pan speed scales with orbit radius by this divisor
pub const TRANSLATION_SCALE_DIVISOR: f32 = 6.0;

/// Degrees of orbit per pixel of drag
pub const ORBIT_GESTURE_COEFFICIENT: f32 = 0.25;

/// Pixels of two-finger drag per unit of pan
pub const PAN_GESTURE_DIVISOR: f32 = 50.0;

/// Touch travel below which a press and release count as a tap (pixels)
pub const TAP_SLOP_PX: f32 = 6.0;

/// Pinch scale per mouse wheel line in the preview app.
pub const WHEEL_ZOOM_BASE: f32 = 1.1;

/// Wheel pixels treated as one line.
pub const WHEEL_PIXELS_PER_LINE: f32 = 100.0;

/// Two clicks closer than this form a double tap.
pub const DOUBLE_CLICK_SECS: f64 = 0.3;
