//! Canonical variable, coordinate and attribute names of a GCM dataset.

/// Longitude coordinate (degrees east)
pub const LON: &str = "lon";
/// Latitude coordinate (degrees north)
pub const LAT: &str = "lat";
/// Vertical (pressure) coordinate
pub const Z: &str = "Z";
/// Time coordinate
pub const TIME: &str = "time";

/// Temperature
pub const T: &str = "T";
/// Zonal (eastward) wind
pub const U: &str = "U";
/// Meridional (northward) wind
pub const V: &str = "V";
/// Vertical wind
pub const W: &str = "W";
/// Horizontal area of the grid cell centres
pub const AREA_C: &str = "area_c";

/// Surface gravity
pub const GRAVITY: &str = "g";
/// Rotation period
pub const P_ROT: &str = "P_rot";
/// Orbital period
pub const P_ORB: &str = "P_orb";
/// Planetary radius
pub const R_P: &str = "R_p";
/// Pressure unit attribute
pub const P_UNIT: &str = "p_unit";
/// Time unit attribute
pub const TIME_UNIT: &str = "time_unit";
/// Tag attribute
pub const TAG: &str = "tag";
/// Model time step in seconds (needed for iter <-> day conversion)
pub const DT: &str = "dt";

/// Cloud abundance
pub const CLOUD_ABUNDANCE: &str = "ClAb";
/// Cloud particle radius
pub const CLOUD_RADIUS: &str = "ClDr";
/// Cloud scattering opacity
pub const CLOUD_SCATTERING: &str = "ClKs";
/// Cloud absorption opacity
pub const CLOUD_ABSORPTION: &str = "ClKa";

/// Horizontal dimensions reduced by area averages
pub const HORIZONTAL_DIMS: [&str; 2] = [LON, LAT];
