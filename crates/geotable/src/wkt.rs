//! Recursive-descent parser for the WKT subset used in the `geom` column.
//!
//! Grammar:
//!   GEOM  := KEYWORD [ 'Z' | 'M' | 'ZM' ] BODY
//!   POINT           (x y [z] [m])
//!   LINESTRING      (p, p, ...)
//!   MULTILINESTRING ( (p, ...), (p, ...), ... )
//!   POLYGON         ( (p, ...), (p, ...), ... )   ring 0 outer, rest holes
//!   MULTIPOLYGON    ( (( ... )), (( ... )), ... )
//!
//! Keywords are case-insensitive and may carry the dimension marker as a
//! suffix (`POINTZ`) or as a separate token (`POINT Z`); either way the
//! marker is consumed and discarded, and ordinates past x, y are parsed
//! with backtracking and thrown away. Anything left after the body is an
//! error.

use thiserror::Error;

use crate::{Geometry, LineString, Point, Polygon};

#[derive(Debug, Error, PartialEq)]
pub enum WktError {
    /// Leading keyword is not one of the known geometry types.
    #[error("WKT unsupported geometry type: {0}")]
    UnsupportedGeometryType(String),

    /// The input breaks the grammar at the cursor; the payload says what
    /// was expected or found.
    #[error("WKT {0}")]
    UnexpectedToken(String),

    /// Non-whitespace input left over after a complete geometry.
    #[error("WKT unexpected trailing input: {0}")]
    TrailingInput(String),
}

type Result<T> = std::result::Result<T, WktError>;

/// Parse one geometry from `input`, consuming it entirely.
pub fn parse(input: &str) -> Result<Geometry> {
    let mut cur = Cursor::new(input);

    let keyword = cur.read_word()?;
    cur.skip_dimension_token()?;

    let geometry = if keyword.starts_with("point") {
        cur.expect(b'(')?;
        let p = cur.read_point()?;
        cur.expect(b')')?;
        Geometry::Point(p)
    } else if keyword.starts_with("linestring") {
        Geometry::LineString(cur.read_point_list()?)
    } else if keyword.starts_with("multilinestring") {
        let mut lines = Vec::new();
        cur.expect(b'(')?;
        loop {
            lines.push(cur.read_point_list()?);
            if !cur.consume(b',') {
                break;
            }
        }
        cur.expect(b')')?;
        Geometry::MultiLineString(lines)
    } else if keyword.starts_with("polygon") {
        Geometry::Polygon(cur.read_polygon()?)
    } else if keyword.starts_with("multipolygon") {
        let mut polygons = Vec::new();
        cur.expect(b'(')?;
        loop {
            polygons.push(cur.read_polygon()?);
            if !cur.consume(b',') {
                break;
            }
        }
        cur.expect(b')')?;
        Geometry::MultiPolygon(polygons)
    } else {
        return Err(WktError::UnsupportedGeometryType(keyword));
    };

    cur.skip_ws();
    if !cur.at_end() {
        return Err(WktError::TrailingInput(cur.rest().trim().to_string()));
    }

    Ok(geometry)
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    #[inline]
    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    #[inline]
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// One run of ASCII letters, lowercased.
    fn read_word(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;

        while matches!(self.peek(), Some(b) if b.is_ascii_alphabetic()) {
            self.pos += 1;
        }

        if start == self.pos {
            return Err(WktError::UnexpectedToken("expected type keyword".into()));
        }

        Ok(self.text[start..self.pos].to_ascii_lowercase())
    }

    /// A standalone Z/M/ZM marker between the keyword and the body; any
    /// other word here is an error.
    fn skip_dimension_token(&mut self) -> Result<()> {
        self.skip_ws();

        if matches!(self.peek(), Some(b) if b.is_ascii_alphabetic()) {
            let token = self.read_word()?;
            if token != "z" && token != "m" && token != "zm" {
                return Err(WktError::UnexpectedToken(format!(
                    "unexpected token before coordinates: {}",
                    token
                )));
            }
        }

        self.skip_ws();
        Ok(())
    }

    fn consume(&mut self, c: u8) -> bool {
        self.skip_ws();

        if self.peek() == Some(c) {
            self.pos += 1;
            self.skip_ws();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: u8) -> Result<()> {
        if self.consume(c) {
            Ok(())
        } else {
            Err(WktError::UnexpectedToken(format!(
                "expected '{}'",
                c as char
            )))
        }
    }

    /// Number literal: [sign] digits ['.' digits] [('e'|'E') [sign] digits].
    /// At least one mantissa digit is required, and an exponent marker
    /// without digits invalidates the whole literal.
    fn read_number(&mut self) -> Result<f64> {
        self.skip_ws();
        let start = self.pos;

        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }

        let mut has_digit = false;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            has_digit = true;
            self.pos += 1;
        }

        if self.peek() == Some(b'.') {
            self.pos += 1;
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                has_digit = true;
                self.pos += 1;
            }
        }

        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }

            let mut exp_digit = false;
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                exp_digit = true;
                self.pos += 1;
            }

            has_digit = has_digit && exp_digit;
        }

        if !has_digit {
            return Err(WktError::UnexpectedToken("expected number".into()));
        }

        self.text[start..self.pos]
            .parse()
            .map_err(|_| WktError::UnexpectedToken("expected number".into()))
    }

    /// x and y, then up to two further ordinates read and discarded.
    fn read_point(&mut self) -> Result<Point> {
        let x = self.read_number()?;
        let y = self.read_number()?;

        let mark = self.pos;
        match self.read_number() {
            Ok(_) => {
                let mark = self.pos;
                if self.read_number().is_err() {
                    self.pos = mark;
                }
            }
            Err(_) => self.pos = mark,
        }

        Ok(Point { x, y })
    }

    fn read_point_list(&mut self) -> Result<LineString> {
        let mut points = Vec::new();

        self.expect(b'(')?;
        points.push(self.read_point()?);

        while self.consume(b',') {
            points.push(self.read_point()?);
        }

        self.expect(b')')?;
        Ok(points)
    }

    fn read_polygon(&mut self) -> Result<Polygon> {
        let mut rings = Vec::new();

        self.expect(b'(')?;
        loop {
            rings.push(self.read_point_list()?);
            if !self.consume(b',') {
                break;
            }
        }
        self.expect(b')')?;

        Ok(Polygon { rings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn parses_point() {
        assert_eq!(parse("POINT (5 5)").unwrap(), Geometry::Point(p(5.0, 5.0)));
        assert_eq!(parse("point(1 -2)").unwrap(), Geometry::Point(p(1.0, -2.0)));
    }

    #[test]
    fn extra_ordinates_are_discarded() {
        assert_eq!(
            parse("POINT (1 2 3)").unwrap(),
            Geometry::Point(p(1.0, 2.0))
        );
        assert_eq!(
            parse("POINT (1 2 3 4)").unwrap(),
            Geometry::Point(p(1.0, 2.0))
        );
    }

    #[test]
    fn dimension_marker_variants() {
        assert_eq!(
            parse("POINT Z (1 2 3)").unwrap(),
            Geometry::Point(p(1.0, 2.0))
        );
        assert_eq!(
            parse("POINT ZM (1 2 3 4)").unwrap(),
            Geometry::Point(p(1.0, 2.0))
        );
        // Marker welded onto the keyword.
        assert_eq!(
            parse("POINTZ (1 2 3)").unwrap(),
            Geometry::Point(p(1.0, 2.0))
        );
        assert_eq!(
            parse("LINESTRINGZM (0 0 1 1, 2 2 3 3)").unwrap(),
            Geometry::LineString(vec![p(0.0, 0.0), p(2.0, 2.0)])
        );
    }

    #[test]
    fn linestring_keeps_xy_and_drops_z() {
        let flat = parse("LINESTRING (0 0, 1 1, 2 2)").unwrap();
        assert_eq!(
            flat,
            Geometry::LineString(vec![p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0)])
        );

        let with_z = parse("LINESTRING Z (0 0 5, 1 1 6)").unwrap();
        assert_eq!(
            with_z,
            Geometry::LineString(vec![p(0.0, 0.0), p(1.0, 1.0)])
        );
    }

    #[test]
    fn parses_multilinestring() {
        let g = parse("MULTILINESTRING ((0 0, 1 0), (5 5, 6 6, 7 7))").unwrap();
        match g {
            Geometry::MultiLineString(lines) => {
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[0], vec![p(0.0, 0.0), p(1.0, 0.0)]);
                assert_eq!(lines[1].len(), 3);
            }
            other => panic!("expected MultiLineString, got {:?}", other),
        }
    }

    #[test]
    fn parses_polygon_with_hole() {
        let g = parse("POLYGON ((0 0, 10 0, 10 10, 0 10), (2 2, 3 2, 3 3))").unwrap();
        match g {
            Geometry::Polygon(poly) => {
                assert_eq!(poly.rings.len(), 2);
                assert_eq!(poly.rings[0].len(), 4);
                assert_eq!(poly.rings[1].len(), 3);
            }
            other => panic!("expected Polygon, got {:?}", other),
        }
    }

    #[test]
    fn parses_multipolygon() {
        let g = parse("MULTIPOLYGON (((0 0, 1 0, 1 1)), ((5 5, 6 5, 6 6), (5.2 5.2, 5.8 5.2, 5.8 5.8)))")
            .unwrap();
        match g {
            Geometry::MultiPolygon(polys) => {
                assert_eq!(polys.len(), 2);
                assert_eq!(polys[0].rings.len(), 1);
                assert_eq!(polys[1].rings.len(), 2);
            }
            other => panic!("expected MultiPolygon, got {:?}", other),
        }
    }

    #[test]
    fn number_forms() {
        assert_eq!(
            parse("POINT (-1.5 +2)").unwrap(),
            Geometry::Point(p(-1.5, 2.0))
        );
        assert_eq!(
            parse("POINT (1e3 2E-2)").unwrap(),
            Geometry::Point(p(1000.0, 0.02))
        );
        assert_eq!(parse("POINT (.5 1.)").unwrap(), Geometry::Point(p(0.5, 1.0)));
    }

    #[test]
    fn exponent_without_digits_is_rejected() {
        assert_eq!(
            parse("POINT (1e 2)").unwrap_err(),
            WktError::UnexpectedToken("expected number".into())
        );
    }

    #[test]
    fn unknown_keyword_is_named() {
        assert_eq!(
            parse("CIRCLE (0 0)").unwrap_err(),
            WktError::UnsupportedGeometryType("circle".into())
        );
    }

    #[test]
    fn trailing_input_is_rejected() {
        assert_eq!(
            parse("POINT (1 2) extra").unwrap_err(),
            WktError::TrailingInput("extra".into())
        );
    }

    #[test]
    fn unclosed_body_is_rejected() {
        assert_eq!(
            parse("POINT (1 2").unwrap_err(),
            WktError::UnexpectedToken("expected ')'".into())
        );
        assert_eq!(
            parse("LINESTRING (1 2, )").unwrap_err(),
            WktError::UnexpectedToken("expected number".into())
        );
    }

    #[test]
    fn stray_word_before_body_is_rejected() {
        assert_eq!(
            parse("POINT Q (1 2)").unwrap_err(),
            WktError::UnexpectedToken("unexpected token before coordinates: q".into())
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(
            parse("").unwrap_err(),
            WktError::UnexpectedToken("expected type keyword".into())
        );
        assert_eq!(
            parse("   ").unwrap_err(),
            WktError::UnexpectedToken("expected type keyword".into())
        );
    }
}
