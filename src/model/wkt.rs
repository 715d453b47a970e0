//! Well-known text for the geometries stored in `geom` columns.

use std::fmt::Write;

use geo_types::{Coord, LineString, MultiLineString, Point};

pub trait ToWkt {
    fn to_wkt(&self) -> String;
}

fn write_coords(out: &mut String, coords: impl Iterator<Item = Coord<f64>>) {
    out.push('(');
    for (i, c) in coords.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{} {}", c.x, c.y);
    }
    out.push(')');
}

impl ToWkt for Point<f64> {
    fn to_wkt(&self) -> String {
        format!("POINT({} {})", self.x(), self.y())
    }
}

impl ToWkt for LineString<f64> {
    fn to_wkt(&self) -> String {
        let mut out = String::from("LINESTRING");
        write_coords(&mut out, self.coords().copied());
        out
    }
}

impl ToWkt for MultiLineString<f64> {
    fn to_wkt(&self) -> String {
        let mut out = String::from("MULTILINESTRING(");
        for (i, line) in self.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_coords(&mut out, line.coords().copied());
        }
        out.push(')');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::coord;

    #[test]
    fn test_point() {
        assert_eq!(Point::new(-122.5, 45.25).to_wkt(), "POINT(-122.5 45.25)");
    }

    #[test]
    fn test_line_string() {
        let line = LineString::new(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 1.5, y: 2.0 }]);
        assert_eq!(line.to_wkt(), "LINESTRING(0 0, 1.5 2)");
    }

    #[test]
    fn test_multi_line_string() {
        let a = LineString::new(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }]);
        let b = LineString::new(vec![coord! { x: 2.0, y: 2.0 }, coord! { x: 3.0, y: 3.0 }]);
        assert_eq!(
            MultiLineString::new(vec![a, b]).to_wkt(),
            "MULTILINESTRING((0 0, 1 1), (2 2, 3 3))"
        );
    }
}
