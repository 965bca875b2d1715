//! Measured patch samples grouped by channel
//!
//! Each measured patch is classified from its device RGB values. Grey
//! patches feed the grey fit, single-channel patches feed the per-channel
//! fits, and mixed patches are ignored.

use crate::domain::table::Channel;

/// Device RGB values are reported on a 0..100 scale
pub const DEVICE_SCALE: f64 = 100.0;

/// Classification of a measured patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    Gray,
    Single(Channel),
}

impl PatchKind {
    /// Classifies a patch from device RGB values (0..100)
    ///
    /// Returns `None` for mixed patches and for kinds that were not requested.
    pub fn classify(rgb: [f64; 3], include_gray: bool, include_color: bool) -> Option<Self> {
        let [r, g, b] = rgb;

        if r == g && g == b {
            return include_gray.then_some(PatchKind::Gray);
        }
        if !include_color {
            return None;
        }

        match (r > 0.0, g > 0.0, b > 0.0) {
            (true, false, false) if g == 0.0 && b == 0.0 => Some(PatchKind::Single(Channel::Red)),
            (false, true, false) if r == 0.0 && b == 0.0 => Some(PatchKind::Single(Channel::Green)),
            (false, false, true) if r == 0.0 && g == 0.0 => Some(PatchKind::Single(Channel::Blue)),
            _ => None,
        }
    }
}

/// Input level / luminance pairs for one channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSamples {
    pub levels: Vec<f64>,
    pub luminance: Vec<f64>,
}

impl ChannelSamples {
    pub fn push(&mut self, level: f64, luminance: f64) {
        self.levels.push(level);
        self.luminance.push(luminance);
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Luminance divided by its maximum, or `None` when the maximum is not positive
    pub fn normalized_luminance(&self) -> Option<Vec<f64>> {
        let max = self.luminance.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() || max <= 0.0 {
            return None;
        }
        Some(self.luminance.iter().map(|l| l / max).collect())
    }
}

/// All samples extracted from one measurement run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementSet {
    pub gray: ChannelSamples,
    pub red: ChannelSamples,
    pub green: ChannelSamples,
    pub blue: ChannelSamples,
}

impl MeasurementSet {
    /// Records one patch, returning how it was classified
    pub fn record(
        &mut self,
        rgb: [f64; 3],
        luminance: f64,
        include_gray: bool,
        include_color: bool,
    ) -> Option<PatchKind> {
        let kind = PatchKind::classify(rgb, include_gray, include_color)?;
        let level = match kind {
            PatchKind::Gray => rgb[0],
            PatchKind::Single(channel) => rgb[channel.index()],
        } / DEVICE_SCALE;

        self.samples_mut(kind).push(level, luminance);
        Some(kind)
    }

    pub fn samples(&self, kind: PatchKind) -> &ChannelSamples {
        match kind {
            PatchKind::Gray => &self.gray,
            PatchKind::Single(Channel::Red) => &self.red,
            PatchKind::Single(Channel::Green) => &self.green,
            PatchKind::Single(Channel::Blue) => &self.blue,
        }
    }

    fn samples_mut(&mut self, kind: PatchKind) -> &mut ChannelSamples {
        match kind {
            PatchKind::Gray => &mut self.gray,
            PatchKind::Single(Channel::Red) => &mut self.red,
            PatchKind::Single(Channel::Green) => &mut self.green,
            PatchKind::Single(Channel::Blue) => &mut self.blue,
        }
    }

    pub fn total(&self) -> usize {
        self.gray.len() + self.red.len() + self.green.len() + self.blue.len()
    }
}
