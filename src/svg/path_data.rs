//! Parser for the SVG path-data mini language (`d` attribute).
//!
//! Commands are walked in document order and split into sub-paths; curve
//! segments are flattened to line segments at a fixed sampling resolution.
//! The flattening is a lossy, deterministic approximation.

use std::f64::consts::TAU;

use crate::error::ParseError;
use crate::math::{Point2, Vector2, COORD_TOLERANCE};

use super::SamplingParams;

/// One sub-path of a `d` attribute, already flattened to line segments.
#[derive(Debug, Clone)]
pub struct SubPath {
    /// Flattened points in document order.
    pub points: Vec<Point2>,
    /// `true` on an explicit close command or when the pen returned to the
    /// sub-path start within tolerance.
    pub closed: bool,
}

/// Parses a `d` attribute into flattened sub-paths.
///
/// # Errors
///
/// Returns [`ParseError`] when the data contains an unknown command, a
/// malformed number, or a command with an incomplete argument list.
pub fn parse_path_data(d: &str, params: &SamplingParams) -> Result<Vec<SubPath>, ParseError> {
    Parser::new(d, params).run()
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    params: &'a SamplingParams,
    pen: Point2,
    subpath_start: Point2,
    current: Vec<Point2>,
    out: Vec<SubPath>,
    /// Control point of the previous segment, for `S`/`T` reflection.
    prev_cubic_ctrl: Option<Point2>,
    prev_quad_ctrl: Option<Point2>,
}

impl<'a> Parser<'a> {
    fn new(d: &'a str, params: &'a SamplingParams) -> Self {
        Self {
            lexer: Lexer::new(d),
            params,
            pen: Point2::origin(),
            subpath_start: Point2::origin(),
            current: Vec::new(),
            out: Vec::new(),
            prev_cubic_ctrl: None,
            prev_quad_ctrl: None,
        }
    }

    fn run(mut self) -> Result<Vec<SubPath>, ParseError> {
        let mut command: Option<char> = None;
        loop {
            self.lexer.skip_separators();
            let Some(next) = self.lexer.peek() else { break };

            let cmd = if next.is_ascii_alphabetic() {
                self.lexer.advance();
                next as char
            } else if let Some(prev) = command {
                // Implicit repetition: a moveto repeats as lineto.
                match prev {
                    'M' => 'L',
                    'm' => 'l',
                    other => other,
                }
            } else {
                return Err(ParseError::MalformedNumber {
                    token: (next as char).to_string(),
                    context: "path data before any command".into(),
                });
            };

            self.apply(cmd)?;
            command = Some(cmd);
        }
        self.flush_open();
        Ok(self.out)
    }

    #[allow(clippy::too_many_lines)]
    fn apply(&mut self, cmd: char) -> Result<(), ParseError> {
        let relative = cmd.is_ascii_lowercase();
        match cmd.to_ascii_uppercase() {
            'M' => {
                let target = self.point(cmd, relative)?;
                self.flush_open();
                self.pen = target;
                self.subpath_start = target;
                self.current.push(target);
                self.reset_ctrl();
            }
            'L' => {
                let target = self.point(cmd, relative)?;
                self.line_to(target);
            }
            'H' => {
                let x = self.lexer.number(cmd)?;
                let target = if relative {
                    Point2::new(self.pen.x + x, self.pen.y)
                } else {
                    Point2::new(x, self.pen.y)
                };
                self.line_to(target);
            }
            'V' => {
                let y = self.lexer.number(cmd)?;
                let target = if relative {
                    Point2::new(self.pen.x, self.pen.y + y)
                } else {
                    Point2::new(self.pen.x, y)
                };
                self.line_to(target);
            }
            'C' => {
                let c1 = self.point(cmd, relative)?;
                let c2 = self.point(cmd, relative)?;
                let end = self.point(cmd, relative)?;
                self.cubic_to(c1, c2, end);
            }
            'S' => {
                let c1 = self.reflected_cubic_ctrl();
                let c2 = self.point(cmd, relative)?;
                let end = self.point(cmd, relative)?;
                self.cubic_to(c1, c2, end);
            }
            'Q' => {
                let ctrl = self.point(cmd, relative)?;
                let end = self.point(cmd, relative)?;
                self.quad_to(ctrl, end);
            }
            'T' => {
                let ctrl = self.reflected_quad_ctrl();
                let end = self.point(cmd, relative)?;
                self.quad_to(ctrl, end);
            }
            'A' => {
                let rx = self.lexer.number(cmd)?;
                let ry = self.lexer.number(cmd)?;
                let x_rotation = self.lexer.number(cmd)?;
                let large_arc = self.lexer.flag(cmd)?;
                let sweep = self.lexer.flag(cmd)?;
                let end = self.point(cmd, relative)?;
                self.arc_to(rx, ry, x_rotation.to_radians(), large_arc, sweep, end);
            }
            'Z' => {
                self.close_subpath();
            }
            _ => return Err(ParseError::UnknownCommand { command: cmd }),
        }
        Ok(())
    }

    fn point(&mut self, cmd: char, relative: bool) -> Result<Point2, ParseError> {
        let x = self.lexer.number(cmd)?;
        let y = self.lexer.number(cmd)?;
        Ok(if relative {
            Point2::new(self.pen.x + x, self.pen.y + y)
        } else {
            Point2::new(x, y)
        })
    }

    fn ensure_started(&mut self) {
        // A drawing command before any moveto, or directly after a close,
        // starts from the current pen position.
        if self.current.is_empty() {
            self.subpath_start = self.pen;
            self.current.push(self.pen);
        }
    }

    fn line_to(&mut self, target: Point2) {
        self.ensure_started();
        self.current.push(target);
        self.pen = target;
        self.reset_ctrl();
    }

    fn cubic_to(&mut self, c1: Point2, c2: Point2, end: Point2) {
        self.ensure_started();
        let p0 = self.pen;
        let n = self.params.curve_segments.max(1);
        for i in 1..=n {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / n as f64;
            let mt = 1.0 - t;
            let point = Point2::from(
                p0.coords * (mt * mt * mt)
                    + c1.coords * (3.0 * mt * mt * t)
                    + c2.coords * (3.0 * mt * t * t)
                    + end.coords * (t * t * t),
            );
            self.current.push(point);
        }
        self.pen = end;
        self.prev_cubic_ctrl = Some(c2);
        self.prev_quad_ctrl = None;
    }

    fn quad_to(&mut self, ctrl: Point2, end: Point2) {
        self.ensure_started();
        let p0 = self.pen;
        let n = self.params.curve_segments.max(1);
        for i in 1..=n {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / n as f64;
            let mt = 1.0 - t;
            let point = Point2::from(
                p0.coords * (mt * mt) + ctrl.coords * (2.0 * mt * t) + end.coords * (t * t),
            );
            self.current.push(point);
        }
        self.pen = end;
        self.prev_quad_ctrl = Some(ctrl);
        self.prev_cubic_ctrl = None;
    }

    /// Elliptical arc via the W3C endpoint-to-center conversion (F.6.5).
    fn arc_to(&mut self, rx: f64, ry: f64, phi: f64, large_arc: bool, sweep: bool, end: Point2) {
        self.ensure_started();
        let start = self.pen;

        if rx.abs() < COORD_TOLERANCE || ry.abs() < COORD_TOLERANCE {
            self.line_to(end);
            return;
        }
        if (end - start).norm() < COORD_TOLERANCE {
            return;
        }

        let mut rx = rx.abs();
        let mut ry = ry.abs();
        let (sin_phi, cos_phi) = phi.sin_cos();

        // Transform to the ellipse-aligned frame.
        let half = (start - end) * 0.5;
        let x1p = cos_phi * half.x + sin_phi * half.y;
        let y1p = -sin_phi * half.x + cos_phi * half.y;

        // Scale radii up if the endpoints cannot be connected otherwise.
        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        if lambda > 1.0 {
            let s = lambda.sqrt();
            rx *= s;
            ry *= s;
        }

        let num = (rx * rx) * (ry * ry) - (rx * rx) * (y1p * y1p) - (ry * ry) * (x1p * x1p);
        let den = (rx * rx) * (y1p * y1p) + (ry * ry) * (x1p * x1p);
        let mut coeff = (num.max(0.0) / den).sqrt();
        if large_arc == sweep {
            coeff = -coeff;
        }
        let cxp = coeff * rx * y1p / ry;
        let cyp = -coeff * ry * x1p / rx;

        let center = Point2::new(
            cos_phi * cxp - sin_phi * cyp + f64::midpoint(start.x, end.x),
            sin_phi * cxp + cos_phi * cyp + f64::midpoint(start.y, end.y),
        );

        let angle_of = |v: Vector2| v.y.atan2(v.x);
        let theta1 = angle_of(Vector2::new((x1p - cxp) / rx, (y1p - cyp) / ry));
        let theta2 = angle_of(Vector2::new((-x1p - cxp) / rx, (-y1p - cyp) / ry));
        let mut delta = (theta2 - theta1) % TAU;
        if sweep && delta < 0.0 {
            delta += TAU;
        } else if !sweep && delta > 0.0 {
            delta -= TAU;
        }

        let n = self.params.curve_segments.max(1);
        for i in 1..=n {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / n as f64;
            let theta = theta1 + delta * t;
            let (sin_t, cos_t) = theta.sin_cos();
            let point = Point2::new(
                center.x + rx * cos_t * cos_phi - ry * sin_t * sin_phi,
                center.y + rx * cos_t * sin_phi + ry * sin_t * cos_phi,
            );
            self.current.push(point);
        }
        // Snap the final sample to the exact endpoint.
        if let Some(last) = self.current.last_mut() {
            *last = end;
        }
        self.pen = end;
        self.reset_ctrl();
    }

    fn close_subpath(&mut self) {
        if self.current.len() > 1 {
            let points = std::mem::take(&mut self.current);
            self.out.push(SubPath { points, closed: true });
        } else {
            self.current.clear();
        }
        self.pen = self.subpath_start;
        self.reset_ctrl();
    }

    /// Flushes a sub-path ended by a moveto or end-of-data. It still counts
    /// as closed when the pen returned to its start within tolerance.
    fn flush_open(&mut self) {
        if self.current.len() > 1 {
            let points = std::mem::take(&mut self.current);
            let closed = points.len() > 2
                && (points[points.len() - 1] - points[0]).norm() < COORD_TOLERANCE;
            self.out.push(SubPath { points, closed });
        } else {
            self.current.clear();
        }
    }

    fn reflected_cubic_ctrl(&self) -> Point2 {
        match self.prev_cubic_ctrl {
            Some(ctrl) => Point2::from(self.pen.coords * 2.0 - ctrl.coords),
            None => self.pen,
        }
    }

    fn reflected_quad_ctrl(&self) -> Point2 {
        match self.prev_quad_ctrl {
            Some(ctrl) => Point2::from(self.pen.coords * 2.0 - ctrl.coords),
            None => self.pen,
        }
    }

    fn reset_ctrl(&mut self) {
        self.prev_cubic_ctrl = None;
        self.prev_quad_ctrl = None;
    }
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn skip_separators(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b == b',' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Reads one number: optional sign, digits, optional fraction and
    /// exponent. `1-2` and `1.5.5` lex as two numbers, per the SVG grammar.
    fn number(&mut self, command: char) -> Result<f64, ParseError> {
        self.skip_separators();
        let start = self.pos;

        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.advance();
        }
        let mut digits = false;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.advance();
            digits = true;
        }
        if self.peek() == Some(b'.') {
            self.advance();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
                digits = true;
            }
        }
        if digits && matches!(self.peek(), Some(b'e' | b'E')) {
            let mark = self.pos;
            self.advance();
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.advance();
            }
            let mut exp_digits = false;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
                exp_digits = true;
            }
            if !exp_digits {
                self.pos = mark;
            }
        }

        if !digits {
            if self.pos >= self.src.len() {
                return Err(ParseError::IncompleteCommand { command });
            }
            let bad = self.rest_token();
            return Err(ParseError::MalformedNumber {
                token: bad,
                context: format!("arguments of path command '{command}'"),
            });
        }

        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        text.parse::<f64>().map_err(|_| ParseError::MalformedNumber {
            token: text.to_string(),
            context: format!("arguments of path command '{command}'"),
        })
    }

    /// Reads an arc flag, which is a single `0` or `1` digit.
    fn flag(&mut self, command: char) -> Result<bool, ParseError> {
        self.skip_separators();
        match self.peek() {
            Some(b'0') => {
                self.advance();
                Ok(false)
            }
            Some(b'1') => {
                self.advance();
                Ok(true)
            }
            None => Err(ParseError::IncompleteCommand { command }),
            Some(_) => Err(ParseError::MalformedNumber {
                token: self.rest_token(),
                context: format!("flag argument of path command '{command}'"),
            }),
        }
    }

    fn rest_token(&self) -> String {
        let rest = &self.src[self.pos..];
        let end = rest
            .iter()
            .position(|b| b.is_ascii_whitespace() || *b == b',')
            .unwrap_or(rest.len())
            .min(16);
        String::from_utf8_lossy(&rest[..end]).into_owned()
    }
}
