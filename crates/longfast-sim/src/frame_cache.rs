//! Frame deduplication.
//!
//! A frame only needs a fresh render when something visible changed: the set
//! of transmitting towers, the committed coverage, the links drawn from active
//! transmitters, or the set of links already drawn. Consecutive frames with
//! equal keys are visually identical and reuse the last render.

use serde::Serialize;

/// Everything that determines what a frame looks like.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FrameStateKey<'a> {
    /// Towers on air, sorted.
    pub active_towers: Vec<&'a str>,
    /// Bumped on every committed transmission.
    pub received_version: u64,
    /// Links from active towers to audible towers that have not transmitted, sorted.
    pub pending_links: Vec<(&'a str, &'a str)>,
    /// Bumped when a new link joins the drawn set.
    pub seen_links_version: u64,
}

/// Whether a frame needs its own render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderDecision {
    /// State changed; render this frame.
    Render,
    /// State unchanged; reuse the render of `frame`.
    Reuse { frame: u64 },
}

impl RenderDecision {
    pub fn needs_render(&self) -> bool {
        matches!(self, RenderDecision::Render)
    }
}

/// Remembers the last rendered key.
#[derive(Debug, Default)]
pub struct FrameStateCache<'a> {
    last: Option<(FrameStateKey<'a>, u64)>,
    rendered: u64,
    reused: u64,
}

impl<'a> FrameStateCache<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `key` with the last rendered key and record the outcome.
    ///
    /// The first frame always renders.
    pub fn observe(&mut self, frame: u64, key: FrameStateKey<'a>) -> RenderDecision {
        match &self.last {
            Some((last_key, last_frame)) if *last_key == key => {
                self.reused += 1;
                RenderDecision::Reuse { frame: *last_frame }
            }
            _ => {
                self.last = Some((key, frame));
                self.rendered += 1;
                RenderDecision::Render
            }
        }
    }

    /// Key of the most recent rendered frame.
    pub fn last_key(&self) -> Option<&FrameStateKey<'a>> {
        self.last.as_ref().map(|(key, _)| key)
    }

    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    pub fn reused(&self) -> u64 {
        self.reused
    }
}
