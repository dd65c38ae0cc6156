//! Walls and the themed wall factory
//!
//! Three kinds of wall share one capability set (`can_be_destroyed`,
//! `destroyed`) but react differently to a blast:
//! - Unbreakable: never changes, always stops the blast
//! - Breakable: gone after one hit, stops the blast
//! - Hard: loses one hit point per blast, gone at zero, stops the blast on
//!   every hit including the one that breaks it

use serde::{Deserialize, Serialize};

use crate::Cell;
use crate::consts::HARD_WALL_HITS;
use crate::error::ConfigError;
use crate::settings::Theme;

/// Wall type tag used by factories and layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallKind {
    Unbreakable,
    Breakable,
    Hard,
}

impl WallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WallKind::Unbreakable => "unbreakable",
            WallKind::Breakable => "breakable",
            WallKind::Hard => "hard",
        }
    }

    /// Parse a textual wall tag. Unknown tags are a build-time mismatch.
    pub fn from_tag(tag: &str) -> Result<Self, ConfigError> {
        match tag.to_lowercase().as_str() {
            "unbreakable" => Ok(WallKind::Unbreakable),
            "breakable" => Ok(WallKind::Breakable),
            "hard" => Ok(WallKind::Hard),
            _ => Err(ConfigError::UnknownWallType(tag.to_string())),
        }
    }
}

/// Art variant the renderer picks for a wall. No gameplay effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WallVisual {
    #[default]
    Generic,
    DesertBreakable,
    DesertHard,
    ForestBreakable,
    ForestHard,
    CityBreakable,
    CityHard,
}

/// Per-kind wall state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallBody {
    Unbreakable,
    Breakable,
    Hard { hits_remaining: u8 },
}

/// What a single blast hit did to a wall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Wall ignored the hit
    Absorbed,
    /// Wall lost a hit point but still stands
    Damaged { hits_remaining: u8 },
    /// Wall broke on this hit
    Destroyed,
}

/// A single wall tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    pub body: WallBody,
    pub visual: WallVisual,
    destroyed: bool,
}

impl Wall {
    pub fn unbreakable() -> Self {
        Self {
            body: WallBody::Unbreakable,
            visual: WallVisual::Generic,
            destroyed: false,
        }
    }

    pub fn breakable(visual: WallVisual) -> Self {
        Self {
            body: WallBody::Breakable,
            visual,
            destroyed: false,
        }
    }

    pub fn hard(visual: WallVisual, hits: u8) -> Self {
        Self {
            body: WallBody::Hard {
                hits_remaining: hits.max(1),
            },
            visual,
            destroyed: false,
        }
    }

    pub fn kind(&self) -> WallKind {
        match self.body {
            WallBody::Unbreakable => WallKind::Unbreakable,
            WallBody::Breakable => WallKind::Breakable,
            WallBody::Hard { .. } => WallKind::Hard,
        }
    }

    pub fn can_be_destroyed(&self) -> bool {
        match self.body {
            WallBody::Unbreakable => false,
            WallBody::Breakable => !self.destroyed,
            WallBody::Hard { hits_remaining } => hits_remaining > 0,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Remaining hits for hard walls
    pub fn hits_remaining(&self) -> Option<u8> {
        match self.body {
            WallBody::Hard { hits_remaining } => Some(hits_remaining),
            _ => None,
        }
    }

    /// Apply one blast hit. Every kind stops propagation, so the caller only
    /// needs the outcome to decide whether to clear the cell.
    pub fn take_hit(&mut self) -> HitOutcome {
        if self.destroyed {
            return HitOutcome::Absorbed;
        }
        match &mut self.body {
            WallBody::Unbreakable => HitOutcome::Absorbed,
            WallBody::Breakable => {
                self.destroyed = true;
                HitOutcome::Destroyed
            }
            WallBody::Hard { hits_remaining } => {
                *hits_remaining = hits_remaining.saturating_sub(1);
                if *hits_remaining == 0 {
                    self.destroyed = true;
                    HitOutcome::Destroyed
                } else {
                    HitOutcome::Damaged {
                        hits_remaining: *hits_remaining,
                    }
                }
            }
        }
    }
}

/// Builds walls for one visual theme
pub trait WallFactory {
    fn theme(&self) -> Theme;

    fn create_wall(&self, kind: WallKind, cell: Cell) -> Wall;

    /// Build a wall from a textual tag (layouts, config files)
    fn create_from_tag(&self, tag: &str, cell: Cell) -> Result<Wall, ConfigError> {
        let kind = WallKind::from_tag(tag)?;
        Ok(self.create_wall(kind, cell))
    }
}

/// Factory for the three stock themes
#[derive(Debug, Clone, Copy)]
pub struct ThemedWallFactory {
    pub theme: Theme,
    pub hard_wall_hits: u8,
}

impl ThemedWallFactory {
    pub fn new(theme: Theme, hard_wall_hits: u8) -> Self {
        Self {
            theme,
            hard_wall_hits,
        }
    }
}

impl Default for ThemedWallFactory {
    fn default() -> Self {
        Self::new(Theme::default(), HARD_WALL_HITS)
    }
}

impl WallFactory for ThemedWallFactory {
    fn theme(&self) -> Theme {
        self.theme
    }

    fn create_wall(&self, kind: WallKind, _cell: Cell) -> Wall {
        let (breakable, hard) = match self.theme {
            Theme::Desert => (WallVisual::DesertBreakable, WallVisual::DesertHard),
            Theme::Forest => (WallVisual::ForestBreakable, WallVisual::ForestHard),
            Theme::City => (WallVisual::CityBreakable, WallVisual::CityHard),
        };
        match kind {
            WallKind::Unbreakable => Wall::unbreakable(),
            WallKind::Breakable => Wall::breakable(breakable),
            WallKind::Hard => Wall::hard(hard, self.hard_wall_hits),
        }
    }
}
