// SPDX-License-Identifier: GPL-3.0-only
//! Linear fade to black

/// Alpha values for each fade frame
///
/// Starts below the opaque first frame and decreases by a fixed step,
/// clamping the last frame to exactly 0. A step of `s` yields `ceil(255 / s)`
/// frames.
#[derive(Debug, Clone)]
pub struct FadeSchedule {
    alpha: u8,
    step: u8,
    done: bool,
}

impl FadeSchedule {
    pub fn new(step: u8) -> Self {
        Self {
            alpha: u8::MAX,
            step: step.max(1),
            done: false,
        }
    }

    /// Number of frames the schedule yields
    pub fn frame_count(step: u8) -> usize {
        (u8::MAX as usize).div_ceil(step.max(1) as usize)
    }
}

impl Iterator for FadeSchedule {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.done {
            return None;
        }
        self.alpha = self.alpha.saturating_sub(self.step);
        self.done = self.alpha == 0;
        Some(self.alpha)
    }
}

/// Scale a color channel towards black
#[inline]
pub fn shade(channel: u8, alpha: u8) -> u8 {
    ((channel as u16 * alpha as u16) / 255) as u8
}
