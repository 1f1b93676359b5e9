// Declarative layout lengths
//
// Layout nodes loaded from the config file describe each edge as a small
// length expression instead of a closure:
// - `120`      fixed pixels
// - `10%`      percent of the parent along the same axis
// - `50vw`     percent of the window width (`vh` for height)
// - `100%-40`  sums and differences of the above, left to right

use super::geometry::{Geometry, LayoutInput};
use super::ComputeFn;
use crate::error::LayoutError;
use serde::{Deserialize, Serialize};

/// Which parent dimension a percentage refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// One term of a length expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Term {
    Px(f64),
    Percent(f64),
    Vw(f64),
    Vh(f64),
}

impl Term {
    fn resolve(self, axis: Axis, input: &LayoutInput) -> f64 {
        let parent = match axis {
            Axis::Horizontal => input.parent_width,
            Axis::Vertical => input.parent_height,
        };
        match self {
            Term::Px(px) => px,
            Term::Percent(p) => parent * p / 100.0,
            Term::Vw(p) => input.window_width * p / 100.0,
            Term::Vh(p) => input.window_height * p / 100.0,
        }
    }

    fn parse(raw: &str, whole: &str) -> Result<Self, LayoutError> {
        let invalid = || LayoutError::InvalidLength(whole.to_string());
        let number = |s: &str| {
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(invalid)
        };

        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid());
        }
        if let Some(n) = raw.strip_suffix('%') {
            Ok(Term::Percent(number(n)?))
        } else if let Some(n) = raw.strip_suffix("vw") {
            Ok(Term::Vw(number(n)?))
        } else if let Some(n) = raw.strip_suffix("vh") {
            Ok(Term::Vh(number(n)?))
        } else {
            Ok(Term::Px(number(raw.strip_suffix("px").unwrap_or(raw))?))
        }
    }
}

/// A parsed length: a signed sum of terms
#[derive(Debug, Clone, PartialEq)]
pub struct Length {
    terms: Vec<(f64, Term)>,
}

impl Length {
    pub fn px(px: f64) -> Self {
        Self {
            terms: vec![(1.0, Term::Px(px))],
        }
    }

    pub fn percent(p: f64) -> Self {
        Self {
            terms: vec![(1.0, Term::Percent(p))],
        }
    }

    /// Parse an expression such as `100%-40` or `25vw+8`
    pub fn parse(expr: &str) -> Result<Self, LayoutError> {
        let mut terms = Vec::new();
        let mut sign = 1.0;
        let mut start = 0;

        for (i, c) in expr.char_indices() {
            // A leading sign belongs to the first term
            let splits = (c == '+' || c == '-')
                && !expr[..i].trim().is_empty()
                && !exponent_sign(expr, i);
            if splits {
                terms.push((sign, Term::parse(&expr[start..i], expr)?));
                sign = if c == '-' { -1.0 } else { 1.0 };
                start = i + 1;
            }
        }
        terms.push((sign, Term::parse(&expr[start..], expr)?));

        Ok(Self { terms })
    }

    pub fn resolve(&self, axis: Axis, input: &LayoutInput) -> f64 {
        self.terms
            .iter()
            .map(|(sign, term)| sign * term.resolve(axis, input))
            .sum()
    }
}

/// True when the sign at `at` belongs to an exponent such as `1e-3`
fn exponent_sign(expr: &str, at: usize) -> bool {
    let mut before = expr[..at].chars().rev();
    matches!(before.next(), Some('e' | 'E'))
        && before.next().is_some_and(|c| c.is_ascii_digit() || c == '.')
}

fn zero() -> String {
    "0".to_string()
}

fn full() -> String {
    "100%".to_string()
}

/// A layout node as declared in `[[layouts]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub name: String,
    /// None = child of the window
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default = "zero")]
    pub x: String,
    #[serde(default = "zero")]
    pub y: String,
    #[serde(default = "full")]
    pub width: String,
    #[serde(default = "full")]
    pub height: String,
}

impl LayoutSpec {
    /// A node filling its parent
    pub fn new(name: &str, parent: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            x: zero(),
            y: zero(),
            width: full(),
            height: full(),
        }
    }

    pub fn at(mut self, x: &str, y: &str) -> Self {
        self.x = x.to_string();
        self.y = y.to_string();
        self
    }

    pub fn sized(mut self, width: &str, height: &str) -> Self {
        self.width = width.to_string();
        self.height = height.to_string();
        self
    }

    /// Parse every edge up front and build the pure compute function
    pub fn compute_fn(&self) -> Result<ComputeFn, LayoutError> {
        let x = Length::parse(&self.x)?;
        let y = Length::parse(&self.y)?;
        let width = Length::parse(&self.width)?;
        let height = Length::parse(&self.height)?;

        Ok(Box::new(move |input: &LayoutInput| {
            Geometry::new(
                x.resolve(Axis::Horizontal, input),
                y.resolve(Axis::Vertical, input),
                width.resolve(Axis::Horizontal, input),
                height.resolve(Axis::Vertical, input),
            )
        }))
    }
}
