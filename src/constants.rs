//! Constants used throughout the crate

/// Face mesh indices (478-point topology with refined irises)
pub const FACE_NOSE_TIP: usize = 1;
pub const FACE_FOREHEAD: usize = 10;
pub const FACE_CHIN: usize = 152;
pub const FACE_LEFT_EYE_OUTER: usize = 33;
pub const FACE_LEFT_EYE_INNER: usize = 133;
pub const FACE_RIGHT_EYE_INNER: usize = 362;
pub const FACE_RIGHT_EYE_OUTER: usize = 263;
pub const FACE_LEFT_EYELID_UPPER: usize = 159;
pub const FACE_LEFT_EYELID_LOWER: usize = 145;
pub const FACE_RIGHT_EYELID_UPPER: usize = 386;
pub const FACE_RIGHT_EYELID_LOWER: usize = 374;
pub const FACE_LEFT_IRIS: usize = 468;
pub const FACE_RIGHT_IRIS: usize = 473;

/// Number of points in a full face mesh with irises
pub const NUM_FACE_LANDMARKS: usize = 478;

/// Body pose indices (33-point topology)
pub const POSE_LEFT_SHOULDER: usize = 11;
pub const POSE_RIGHT_SHOULDER: usize = 12;
pub const POSE_LEFT_HIP: usize = 23;
pub const POSE_RIGHT_HIP: usize = 24;

/// Number of points in a full body pose
pub const NUM_POSE_LANDMARKS: usize = 33;

/// Smallest span used as a geometric divisor
pub const GEOMETRY_EPSILON: f64 = 1e-4;

/// Face scale blend weights
pub const FACE_SCALE_HEIGHT_WEIGHT: f64 = 0.64;
pub const FACE_SCALE_WIDTH_WEIGHT: f64 = 0.36;

/// Torso scale blend weights
pub const TORSO_SHOULDER_WEIGHT: f64 = 0.45;
pub const TORSO_HEIGHT_WEIGHT: f64 = 0.45;
pub const TORSO_HIP_WEIGHT: f64 = 0.10;

/// Calibration window defaults
pub const DEFAULT_CALIBRATION_DURATION_MS: f64 = 5000.0;
pub const DEFAULT_CALIBRATION_EXTENSION_MS: f64 = 3000.0;
pub const DEFAULT_MIN_CALIBRATION_SAMPLES: usize = 45;
pub const DEFAULT_CALIBRATION_SAMPLE_CAPACITY: usize = 1200;

/// Smoothing rate bounds
pub const SMOOTHING_ALPHA_MIN: f64 = 0.01;
pub const SMOOTHING_ALPHA_MAX: f64 = 1.0;

/// Upper bound on a single state machine step
pub const DEFAULT_MAX_TICK_MS: f64 = 200.0;

/// Frame clock defaults for the session
pub const DEFAULT_FIRST_FRAME_DT_MS: f64 = 16.7;
pub const DEFAULT_MAX_FRAME_DT_MS: f64 = 100.0;
pub const DEFAULT_TRACE_INTERVAL_MS: f64 = 1400.0;
pub const DEFAULT_OPEN_FAILURE_ROLLBACK_MS: f64 = 450.0;

/// Redirect target and browser profile
pub const DEFAULT_REDIRECT_URL: &str = "https://careers.mcdonalds.com/";
pub const BROWSER_PROFILE_DIR: &str = "focusguard-browser-profile";
