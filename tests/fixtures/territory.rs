//! Work sites in a compact service territory.
//!
//! Two dense neighborhoods a few miles apart plus scattered rural poles.

/// A named work site.
#[derive(Debug, Clone)]
pub struct Site {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Site {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

// ============================================================================
// Midtown (sites within a few hundred yards of each other)
// ============================================================================

pub const MIDTOWN: &[Site] = &[
    Site::new("midtown-01", 38.5721, -121.4790),
    Site::new("midtown-02", 38.5728, -121.4781),
    Site::new("midtown-03", 38.5735, -121.4795),
    Site::new("midtown-04", 38.5716, -121.4770),
    Site::new("midtown-05", 38.5742, -121.4786),
];

// ============================================================================
// East side
// ============================================================================

pub const EAST_SIDE: &[Site] = &[
    Site::new("east-01", 38.5540, -121.4180),
    Site::new("east-02", 38.5548, -121.4172),
    Site::new("east-03", 38.5533, -121.4191),
];

// ============================================================================
// Rural (isolated, each its own cluster)
// ============================================================================

pub const RURAL: &[Site] = &[
    Site::new("rural-01", 38.7010, -121.2200),
    Site::new("rural-02", 38.4100, -121.6350),
    Site::new("rural-03", 38.8450, -121.5100),
];

/// Every site in the territory.
pub fn all_sites() -> Vec<Site> {
    MIDTOWN
        .iter()
        .chain(EAST_SIDE)
        .chain(RURAL)
        .cloned()
        .collect()
}
