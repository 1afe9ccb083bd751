//! The route along which travel times are simulated.

/// Factor to convert km/h into m/s
pub const KMH_PER_MS: f64 = 3.6;

/// Convert a speed in km/h into m/s
#[inline]
pub fn kmh_to_ms(kmh: f64) -> f64 {
    kmh / KMH_PER_MS
}

/// A road segment.
/// Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    id: String,
    // [m]
    length: f64,
    // [m/s]
    freeflow_speed: f64,
}

impl Segment {
    /// Create a segment from a length in meters and a freeflow speed in m/s.
    /// Both have to be positive and finite.
    pub fn new(id: String, length: f64, freeflow_speed: f64) -> Segment {
        assert!(length.is_finite() && length > 0.0, "invalid segment length {}", length);
        assert!(freeflow_speed.is_finite() && freeflow_speed > 0.0, "invalid freeflow speed {}", freeflow_speed);
        Segment { id, length, freeflow_speed }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Length in meters
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Freeflow speed in m/s
    pub fn freeflow_speed(&self) -> f64 {
        self.freeflow_speed
    }
}

/// Ordered sequence of segments.
/// The position of a segment in the route is also the index of its profile in the `ProfileStore`
/// it was loaded together with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    segments: Vec<Segment>,
}

impl Route {
    pub fn new(segments: Vec<Segment>) -> Route {
        Route { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Total length in meters
    pub fn length(&self) -> f64 {
        self.segments.iter().map(Segment::length).sum()
    }

    /// Travel time in seconds when driving every segment at freeflow speed
    pub fn freeflow_travel_time(&self) -> f64 {
        self.segments.iter().map(|segment| segment.length / segment.freeflow_speed).sum()
    }
}
