//! Content fingerprint of a study-area geometry.

use geo::MultiPolygon;
use sha2::{Digest, Sha256};

/// SHA-256 over the ring coordinates, hex encoded.
///
/// Two geometries with the same vertices in the same order share a
/// fingerprint regardless of the input channel they came from.
pub fn geometry_fingerprint(geometry: &MultiPolygon<f64>) -> String {
    let mut hasher = Sha256::new();
    for polygon in &geometry.0 {
        hasher.update(b"P");
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            hasher.update(b"R");
            for c in &ring.0 {
                hasher.update(c.x.to_le_bytes());
                hasher.update(c.y.to_le_bytes());
            }
        }
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(offset: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: offset, y: 0.0),
            (x: offset + 1.0, y: 0.0),
            (x: offset + 1.0, y: 1.0),
            (x: offset, y: 0.0),
        ]])
    }

    #[test]
    fn test_fingerprint_consistency() {
        assert_eq!(geometry_fingerprint(&square(0.0)), geometry_fingerprint(&square(0.0)));
        assert_eq!(geometry_fingerprint(&square(0.0)).len(), 64);
    }

    #[test]
    fn test_different_geometry_different_fingerprint() {
        assert_ne!(geometry_fingerprint(&square(0.0)), geometry_fingerprint(&square(0.5)));
    }
}
