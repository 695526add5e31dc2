//! Hover state for the single shared tooltip.
//!
//! At most one county is hovered at a time. Rendering reads this state; only
//! the hover handlers change it.

use crate::types::{EducationRecord, MapModel, RenderedCounty};

/// Tooltip panel offset from the pointer, in page pixels.
pub const TOOLTIP_OFFSET: (f64, f64) = (10.0, -28.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: &'static str,
    pub width: f64,
}

pub const DEFAULT_STROKE: StrokeStyle = StrokeStyle { color: "#fff", width: 0.5 };
pub const EMPHASIS_STROKE: StrokeStyle = StrokeStyle { color: "#333", width: 2.0 };

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum HoverState {
    #[default]
    Idle,
    Hovered { fips: u32, pointer: Pointer },
}

impl HoverState {
    /// Pointer entered `county`. Any previous hover is left first. Counties
    /// without a record do not react to hover.
    pub fn enter(&mut self, county: &RenderedCounty, pointer: Pointer) {
        self.leave();
        if let (Some(fips), Some(_)) = (county.fips, &county.record) {
            *self = HoverState::Hovered { fips, pointer };
        }
    }

    pub fn leave(&mut self) {
        *self = HoverState::Idle;
    }

    pub fn hovered(&self) -> Option<u32> {
        match self {
            HoverState::Idle => None,
            HoverState::Hovered { fips, .. } => Some(*fips),
        }
    }

    pub fn stroke_for(&self, fips: u32) -> StrokeStyle {
        if self.hovered() == Some(fips) {
            EMPHASIS_STROKE
        } else {
            DEFAULT_STROKE
        }
    }
}

/// Contents and position of the visible tooltip.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip<'a> {
    pub record: &'a EducationRecord,
    pub left: f64,
    pub top: f64,
}

impl<'a> Tooltip<'a> {
    /// `None` when nothing is hovered.
    pub fn resolve(hover: &HoverState, model: &'a MapModel) -> Option<Self> {
        let HoverState::Hovered { fips, pointer } = hover else {
            return None;
        };
        let record = model.county(*fips)?.record.as_ref()?;
        Some(Tooltip {
            record,
            left: pointer.x + TOOLTIP_OFFSET.0,
            top: pointer.y + TOOLTIP_OFFSET.1,
        })
    }

    pub fn heading(&self) -> String {
        format!("{}, {}", self.record.area_name, self.record.state)
    }

    pub fn education_line(&self) -> String {
        format!("Education: {}%", self.record.bachelors_or_higher)
    }

    pub fn fips_line(&self) -> String {
        format!("FIPS: {}", self.record.fips)
    }
}
