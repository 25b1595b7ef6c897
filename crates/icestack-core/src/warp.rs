//! Reprojection of radar captures to web-mercator.
//!
//! The radar delivers captures on a local azimuthal-equidistant grid
//! centered on the antenna; map clients want EPSG:3857. The warp walks the
//! destination grid, maps each pixel back through the projection pair
//! (mercator → geographic → azimuthal-equidistant → source pixel) and
//! samples the source bilinearly. Zero is the nodata value on both sides.

use image::GrayImage;

/// Radar antenna latitude (degrees).
pub const RADAR_LAT_DEG: f64 = 71.2925;
/// Radar antenna longitude (degrees).
pub const RADAR_LON_DEG: f64 = -156.788333333333;
/// Sphere radius of the radar's local projection (meters).
pub const RADAR_SPHERE_RADIUS_M: f64 = 6_358_944.3;

/// Web-mercator sphere radius (meters).
const MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// Nominal radar range: half-width of the source grid (meters).
pub const DEFAULT_HALF_EXTENT_M: f64 = 12_000.0;

// ── Error type ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarpError {
    /// The source image has no pixels.
    EmptySource,
    /// The projected source footprint collapsed to a degenerate extent.
    DegenerateExtent,
}

impl std::fmt::Display for WarpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySource => write!(f, "source image has no pixels"),
            Self::DegenerateExtent => write!(f, "projected extent is degenerate"),
        }
    }
}

impl std::error::Error for WarpError {}

// ── Projections ────────────────────────────────────────────────────────────

/// Spherical azimuthal-equidistant projection.
///
/// `forward` maps geographic coordinates (radians) to local meters,
/// `inverse` maps local meters back. The pair are inverses of each other up
/// to floating-point error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aeqd {
    lat0_rad: f64,
    lon0_rad: f64,
    radius_m: f64,
}

impl Aeqd {
    pub fn new(lat0_deg: f64, lon0_deg: f64, radius_m: f64) -> Self {
        Self {
            lat0_rad: lat0_deg.to_radians(),
            lon0_rad: lon0_deg.to_radians(),
            radius_m,
        }
    }

    /// The radar's own projection.
    pub fn radar() -> Self {
        Self::new(RADAR_LAT_DEG, RADAR_LON_DEG, RADAR_SPHERE_RADIUS_M)
    }

    /// Geographic (lat, lon) radians → local (x, y) meters.
    pub fn forward(&self, lat_rad: f64, lon_rad: f64) -> [f64; 2] {
        let dlon = lon_rad - self.lon0_rad;
        let cos_c = self.lat0_rad.sin() * lat_rad.sin()
            + self.lat0_rad.cos() * lat_rad.cos() * dlon.cos();
        let c = cos_c.clamp(-1.0, 1.0).acos();
        // k → 1 as c → 0.
        let k = if c.abs() < 1e-12 { 1.0 } else { c / c.sin() };
        let x = self.radius_m * k * lat_rad.cos() * dlon.sin();
        let y = self.radius_m
            * k
            * (self.lat0_rad.cos() * lat_rad.sin()
                - self.lat0_rad.sin() * lat_rad.cos() * dlon.cos());
        [x, y]
    }

    /// Local (x, y) meters → geographic (lat, lon) radians.
    pub fn inverse(&self, xy: [f64; 2]) -> [f64; 2] {
        let rho = (xy[0] * xy[0] + xy[1] * xy[1]).sqrt();
        if rho < 1e-9 {
            return [self.lat0_rad, self.lon0_rad];
        }
        let c = rho / self.radius_m;
        let lat = (c.cos() * self.lat0_rad.sin() + xy[1] * c.sin() * self.lat0_rad.cos() / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let lon = self.lon0_rad
            + (xy[0] * c.sin()).atan2(
                rho * self.lat0_rad.cos() * c.cos() - xy[1] * self.lat0_rad.sin() * c.sin(),
            );
        [lat, lon]
    }
}

/// Spherical web-mercator (EPSG:3857).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mercator {
    radius_m: f64,
}

impl Default for Mercator {
    fn default() -> Self {
        Self {
            radius_m: MERCATOR_RADIUS_M,
        }
    }
}

impl Mercator {
    /// Geographic (lat, lon) radians → mercator (x, y) meters.
    pub fn forward(&self, lat_rad: f64, lon_rad: f64) -> [f64; 2] {
        let x = self.radius_m * lon_rad;
        let y = self.radius_m * (std::f64::consts::FRAC_PI_4 + lat_rad / 2.0).tan().ln();
        [x, y]
    }

    /// Mercator (x, y) meters → geographic (lat, lon) radians.
    pub fn inverse(&self, xy: [f64; 2]) -> [f64; 2] {
        let lon = xy[0] / self.radius_m;
        let lat = 2.0 * (xy[1] / self.radius_m).exp().atan() - std::f64::consts::FRAC_PI_2;
        [lat, lon]
    }
}

// ── Source grid ────────────────────────────────────────────────────────────

/// Georeference of a radar capture: a square grid of local meters centered
/// on the antenna, north up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarGrid {
    pub projection: Aeqd,
    /// Half-width of the grid in meters.
    pub half_extent_m: f64,
}

impl Default for RadarGrid {
    fn default() -> Self {
        Self {
            projection: Aeqd::radar(),
            half_extent_m: DEFAULT_HALF_EXTENT_M,
        }
    }
}

impl RadarGrid {
    /// Local meters → continuous source pixel coordinates (pixel centers at
    /// half-integer offsets), or `None` outside the grid.
    fn source_pixel(&self, local_xy: [f64; 2], width: u32, height: u32) -> Option<[f64; 2]> {
        let e = self.half_extent_m;
        let u = (local_xy[0] + e) / (2.0 * e);
        let v = (e - local_xy[1]) / (2.0 * e);
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return None;
        }
        Some([u * width as f64 - 0.5, v * height as f64 - 0.5])
    }

    /// Corner and edge-midpoint anchors of the grid in local meters.
    fn footprint_anchors(&self) -> [[f64; 2]; 8] {
        let e = self.half_extent_m;
        [
            [-e, -e],
            [-e, 0.0],
            [-e, e],
            [0.0, -e],
            [0.0, e],
            [e, -e],
            [e, 0.0],
            [e, e],
        ]
    }
}

// ── Resampling ─────────────────────────────────────────────────────────────

/// Sample a grayscale image at a sub-pixel position, bilinear. Positions
/// outside the image return 0 (nodata).
fn bilinear_sample(img: &GrayImage, x: f64, y: f64) -> u8 {
    let (w, h) = img.dimensions();
    if x < 0.0 || y < 0.0 {
        return 0;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    if x0 + 1 >= w || y0 + 1 >= h {
        return 0;
    }
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;
    let p00 = img.get_pixel(x0, y0)[0] as f64;
    let p10 = img.get_pixel(x0 + 1, y0)[0] as f64;
    let p01 = img.get_pixel(x0, y0 + 1)[0] as f64;
    let p11 = img.get_pixel(x0 + 1, y0 + 1)[0] as f64;
    let v = (1.0 - fx) * (1.0 - fy) * p00
        + fx * (1.0 - fy) * p10
        + (1.0 - fx) * fy * p01
        + fx * fy * p11;
    v.round().clamp(0.0, 255.0) as u8
}

/// Reproject a radar capture onto a north-up EPSG:3857 grid.
///
/// The destination extent is the mercator bounding box of the source
/// footprint; the destination width matches the source width and the height
/// follows the extent's aspect ratio.
pub fn reproject(src: &GrayImage, grid: &RadarGrid) -> Result<GrayImage, WarpError> {
    let (src_w, src_h) = src.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(WarpError::EmptySource);
    }

    let mercator = Mercator::default();

    // Mercator bounding box of the source footprint.
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for anchor in grid.footprint_anchors() {
        let [lat, lon] = grid.projection.inverse(anchor);
        let [x, y] = mercator.forward(lat, lon);
        if !x.is_finite() || !y.is_finite() {
            return Err(WarpError::DegenerateExtent);
        }
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if x_max - x_min <= 0.0 || y_max - y_min <= 0.0 {
        return Err(WarpError::DegenerateExtent);
    }

    let dst_w = src_w;
    let dst_h = ((dst_w as f64) * (y_max - y_min) / (x_max - x_min))
        .round()
        .max(1.0) as u32;

    let mut dst = GrayImage::new(dst_w, dst_h);
    for dy in 0..dst_h {
        // Row ordering is north-down in pixel space.
        let y_merc = y_max - (dy as f64 + 0.5) / dst_h as f64 * (y_max - y_min);
        for dx in 0..dst_w {
            let x_merc = x_min + (dx as f64 + 0.5) / dst_w as f64 * (x_max - x_min);
            let [lat, lon] = mercator.inverse([x_merc, y_merc]);
            let local = grid.projection.forward(lat, lon);
            let value = match grid.source_pixel(local, src_w, src_h) {
                Some([sx, sy]) => bilinear_sample(src, sx, sy),
                None => 0,
            };
            dst.put_pixel(dx, dy, image::Luma([value]));
        }
    }
    Ok(dst)
}
