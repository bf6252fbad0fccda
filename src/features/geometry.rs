use geo::{Area, Coord, Geometry, LineString, Polygon};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("geometry is missing")]
    Null,

    #[error("unsupported geometry `{0}`, expected a polygon")]
    Unsupported(String),

    #[error("exterior ring has {0} coordinates, a closed polygon needs at least 4")]
    DegenerateRing(usize),

    #[error("coordinate ({x}, {y}) is not finite")]
    NonFinite { x: f64, y: f64 },

    #[error("coordinate ({lon}, {lat}) lies outside the projection domain")]
    OutOfDomain { lon: f64, lat: f64 },

    #[error("malformed coordinates: {0}")]
    Malformed(String),
}

/// Maps coordinates into a planar reference system measured in meters.
pub trait MetricProjection {
    /// EPSG code of the target reference system, if it has one.
    fn epsg(&self) -> Option<u32>;

    fn project(&self, coord: Coord<f64>) -> Result<Coord<f64>, GeometryError>;
}

/// Lambert cylindrical equal-area projection on the WGS 84 ellipsoid with standard
/// parallels at ±30°, i.e. EPSG:6933 (EASE-Grid 2.0 global).
///
/// Input coordinates are (longitude, latitude) in degrees.
#[derive(Clone, Copy, Debug)]
pub struct EqualAreaCylindrical {
    semi_major: f64,
    eccentricity: f64,
    k0: f64,
}

impl EqualAreaCylindrical {
    pub const EPSG: u32 = 6933;

    const WGS84_SEMI_MAJOR: f64 = 6_378_137.0;
    const WGS84_INVERSE_FLATTENING: f64 = 298.257_223_563;
    const STANDARD_PARALLEL_DEG: f64 = 30.0;

    pub fn new() -> Self {
        let f = 1.0 / Self::WGS84_INVERSE_FLATTENING;
        let e2 = f * (2.0 - f);
        let phi1 = Self::STANDARD_PARALLEL_DEG.to_radians();
        let k0 = phi1.cos() / (1.0 - e2 * phi1.sin().powi(2)).sqrt();
        Self {
            semi_major: Self::WGS84_SEMI_MAJOR,
            eccentricity: e2.sqrt(),
            k0,
        }
    }

    /// Authalic `q` term of the ellipsoidal equal-area projections.
    fn q(&self, phi: f64) -> f64 {
        let e = self.eccentricity;
        let e2 = e * e;
        let s = phi.sin();
        let log_term = ((1.0 - e * s) / (1.0 + e * s)).ln();
        (1.0 - e2) * (s / (1.0 - e2 * s * s) - log_term / (2.0 * e))
    }
}

impl Default for EqualAreaCylindrical {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricProjection for EqualAreaCylindrical {
    fn epsg(&self) -> Option<u32> {
        Some(Self::EPSG)
    }

    fn project(&self, coord: Coord<f64>) -> Result<Coord<f64>, GeometryError> {
        let (lon, lat) = (coord.x, coord.y);
        if !lon.is_finite() || !lat.is_finite() {
            return Err(GeometryError::NonFinite { x: lon, y: lat });
        }
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(GeometryError::OutOfDomain { lon, lat });
        }

        let x = self.semi_major * self.k0 * lon.to_radians();
        let y = self.semi_major * self.q(lat.to_radians()) / (2.0 * self.k0);
        Ok(Coord { x, y })
    }
}

/// Identity projection for geometries that are already in a metric system.
#[derive(Clone, Copy, Debug, Default)]
pub struct Planar;

impl MetricProjection for Planar {
    fn epsg(&self) -> Option<u32> {
        None
    }

    fn project(&self, coord: Coord<f64>) -> Result<Coord<f64>, GeometryError> {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(GeometryError::NonFinite {
                x: coord.x,
                y: coord.y,
            });
        }
        Ok(coord)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryFeatures {
    /// Planar area of the projected polygon, holes subtracted (m²).
    pub area: f64,
    /// Coordinates in the exterior ring, closing coordinate included.
    pub vertex_count: usize,
}

/// Measures area and vertex count of a polygon after projecting it to a metric system.
#[derive(Clone, Debug, Default)]
pub struct GeometryFeaturizer<P = EqualAreaCylindrical> {
    projection: P,
}

impl GeometryFeaturizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: MetricProjection> GeometryFeaturizer<P> {
    pub fn with_projection(projection: P) -> Self {
        Self { projection }
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn featurize(
        &self,
        geometry: Option<&Geometry<f64>>,
    ) -> Result<GeometryFeatures, GeometryError> {
        let polygon = as_polygon(geometry.ok_or(GeometryError::Null)?)?;
        self.featurize_polygon(&polygon)
    }

    pub fn featurize_polygon(
        &self,
        polygon: &Polygon<f64>,
    ) -> Result<GeometryFeatures, GeometryError> {
        let vertex_count = polygon.exterior().0.len();
        if vertex_count < 4 {
            return Err(GeometryError::DegenerateRing(vertex_count));
        }

        let exterior = self.project_ring(polygon.exterior())?;
        let interiors = polygon
            .interiors()
            .iter()
            .map(|ring| self.project_ring(ring))
            .collect::<Result<Vec<_>, _>>()?;
        let area = Polygon::new(exterior, interiors).unsigned_area();

        Ok(GeometryFeatures { area, vertex_count })
    }

    fn project_ring(&self, ring: &LineString<f64>) -> Result<LineString<f64>, GeometryError> {
        ring.coords()
            .map(|c| self.projection.project(*c))
            .collect::<Result<Vec<_>, _>>()
            .map(LineString::new)
    }
}

fn as_polygon(geometry: &Geometry<f64>) -> Result<Polygon<f64>, GeometryError> {
    match geometry {
        Geometry::Polygon(polygon) => Ok(polygon.clone()),
        Geometry::MultiPolygon(multi) if multi.0.len() == 1 => Ok(multi.0[0].clone()),
        Geometry::MultiPolygon(multi) => Err(GeometryError::Unsupported(format!(
            "MultiPolygon with {} parts",
            multi.0.len()
        ))),
        Geometry::Rect(rect) => Ok(rect.to_polygon()),
        Geometry::Triangle(triangle) => Ok(triangle.to_polygon()),
        other => Err(GeometryError::Unsupported(kind(other).to_string())),
    }
}

fn kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
