// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Media query parsing and evaluation.
//!
//! The supported grammar is a comma-separated list of alternatives, each a
//! sequence of terms joined by `and`:
//!
//! - media types `all`, `screen` (match) and `print` (never matches), optionally prefixed by `only`;
//! - `(min-width: ..)`, `(max-width: ..)`, `(min-height: ..)`, `(max-height: ..)` in `px` or `em`;
//! - `(orientation: portrait | landscape)`;
//! - `(prefers-color-scheme: light | dark)`.
//!
//! ```
//! use canopy_dom::{ColorScheme, MediaEnvironment, MediaQuery};
//!
//! let q = MediaQuery::parse("screen and (min-width: 600px), (prefers-color-scheme: dark)").unwrap();
//! let narrow_light = MediaEnvironment { width: 400.0, height: 800.0, color_scheme: ColorScheme::Light };
//! let wide_light = MediaEnvironment { width: 800.0, ..narrow_light };
//! let narrow_dark = MediaEnvironment { color_scheme: ColorScheme::Dark, ..narrow_light };
//! assert!(!q.evaluate(&narrow_light));
//! assert!(q.evaluate(&wide_light));
//! assert!(q.evaluate(&narrow_dark));
//! ```

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::DomError;

/// Pixels per `em` when evaluating lengths.
const PX_PER_EM: f64 = 16.0;

/// Preferred color scheme of the environment.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum ColorScheme {
    /// Light.
    #[default]
    Light,
    /// Dark.
    Dark,
}

/// Viewport orientation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Orientation {
    /// Height is at least the width.
    Portrait,
    /// Width exceeds the height.
    Landscape,
}

/// What a media query is evaluated against.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MediaEnvironment {
    /// Viewport width in CSS pixels.
    pub width: f64,
    /// Viewport height in CSS pixels.
    pub height: f64,
    /// Preferred color scheme.
    pub color_scheme: ColorScheme,
}

impl MediaEnvironment {
    /// Orientation implied by the viewport size.
    pub fn orientation(&self) -> Orientation {
        if self.height >= self.width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Condition {
    MediaType(bool),
    MinWidth(f64),
    MaxWidth(f64),
    MinHeight(f64),
    MaxHeight(f64),
    Orientation(Orientation),
    ColorScheme(ColorScheme),
}

impl Condition {
    fn evaluate(&self, env: &MediaEnvironment) -> bool {
        match *self {
            Self::MediaType(matches) => matches,
            Self::MinWidth(v) => env.width >= v,
            Self::MaxWidth(v) => env.width <= v,
            Self::MinHeight(v) => env.height >= v,
            Self::MaxHeight(v) => env.height <= v,
            Self::Orientation(o) => env.orientation() == o,
            Self::ColorScheme(s) => env.color_scheme == s,
        }
    }
}

/// A parsed media query.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaQuery {
    text: String,
    alternatives: Vec<Vec<Condition>>,
}

impl MediaQuery {
    /// Parse a media query. The empty query matches everything.
    pub fn parse(text: &str) -> Result<Self, DomError> {
        let invalid = || DomError::InvalidMediaQuery(text.into());
        let lowered = text.trim().to_ascii_lowercase();
        let mut alternatives = Vec::new();
        if !lowered.is_empty() {
            for alternative in lowered.split(',') {
                let mut conditions = Vec::new();
                for term in split_and(alternative.trim()) {
                    conditions.push(parse_term(term).ok_or_else(invalid)?);
                }
                if conditions.is_empty() {
                    return Err(invalid());
                }
                alternatives.push(conditions);
            }
        }
        Ok(Self {
            text: text.into(),
            alternatives,
        })
    }

    /// The query as written.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns true if any alternative matches `env`.
    pub fn evaluate(&self, env: &MediaEnvironment) -> bool {
        self.alternatives.is_empty()
            || self
                .alternatives
                .iter()
                .any(|conds| conds.iter().all(|c| c.evaluate(env)))
    }
}

fn split_and(alternative: &str) -> impl Iterator<Item = &str> {
    alternative
        .split(" and ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn parse_term(term: &str) -> Option<Condition> {
    let term = term.strip_prefix("only ").map(str::trim).unwrap_or(term);
    match term {
        "all" | "screen" => return Some(Condition::MediaType(true)),
        "print" => return Some(Condition::MediaType(false)),
        _ => {}
    }
    let inner = term.strip_prefix('(')?.strip_suffix(')')?;
    let (name, value) = inner.split_once(':')?;
    let value = value.trim();
    match name.trim() {
        "min-width" => parse_length(value).map(Condition::MinWidth),
        "max-width" => parse_length(value).map(Condition::MaxWidth),
        "min-height" => parse_length(value).map(Condition::MinHeight),
        "max-height" => parse_length(value).map(Condition::MaxHeight),
        "orientation" => match value {
            "portrait" => Some(Condition::Orientation(Orientation::Portrait)),
            "landscape" => Some(Condition::Orientation(Orientation::Landscape)),
            _ => None,
        },
        "prefers-color-scheme" => match value {
            "light" => Some(Condition::ColorScheme(ColorScheme::Light)),
            "dark" => Some(Condition::ColorScheme(ColorScheme::Dark)),
            _ => None,
        },
        _ => None,
    }
}

fn parse_length(value: &str) -> Option<f64> {
    if let Some(px) = value.strip_suffix("px") {
        return px.trim().parse().ok();
    }
    if let Some(em) = value.strip_suffix("rem").or_else(|| value.strip_suffix("em")) {
        return em.trim().parse::<f64>().ok().map(|v| v * PX_PER_EM);
    }
    match value.parse::<f64>() {
        Ok(v) if v == 0.0 => Some(0.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(width: f64, height: f64) -> MediaEnvironment {
        MediaEnvironment {
            width,
            height,
            color_scheme: ColorScheme::Light,
        }
    }

    #[test]
    fn width_bounds_are_inclusive() {
        let q = MediaQuery::parse("(min-width: 600px) and (max-width: 40em)").unwrap();
        assert!(!q.evaluate(&env(599.0, 100.0)));
        assert!(q.evaluate(&env(600.0, 100.0)));
        assert!(q.evaluate(&env(640.0, 100.0)));
        assert!(!q.evaluate(&env(641.0, 100.0)));
    }

    #[test]
    fn orientation_follows_aspect() {
        let q = MediaQuery::parse("(orientation: portrait)").unwrap();
        assert!(q.evaluate(&env(300.0, 300.0)));
        assert!(!q.evaluate(&env(301.0, 300.0)));
    }

    #[test]
    fn media_types_and_empty_query() {
        assert!(MediaQuery::parse("").unwrap().evaluate(&env(1.0, 1.0)));
        assert!(MediaQuery::parse("only screen").unwrap().evaluate(&env(1.0, 1.0)));
        assert!(!MediaQuery::parse("print").unwrap().evaluate(&env(1.0, 1.0)));
        assert_eq!(MediaQuery::parse("  Screen ").unwrap().text(), "  Screen ");
    }

    #[test]
    fn unsupported_features_are_rejected() {
        for bad in ["(hover: hover)", "(min-width)", "screen and", "(max-width: wide)", ","] {
            assert_eq!(
                MediaQuery::parse(bad),
                Err(DomError::InvalidMediaQuery(bad.into())),
                "{bad}"
            );
        }
    }
}
