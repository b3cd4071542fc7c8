//! Playback scheduling with the boot renderer's timing rules

use crate::LoadedPackage;
use abanim_core::limits::{MAX_LOOP_COUNT, MIN_FRAME_DURATION_US};
use abanim_core::manifest::{DEFAULT_FRAME_DURATION_US, DEFAULT_MAX_MEMORY};
use abanim_core::Manifest;

/// Order and timing in which a renderer presents a container's frames.
///
/// Loop counts are capped at 100 with 0 meaning "forever", every frame is
/// shown for at least 10 ms, and a non-zero `max_total_duration_ms` stops
/// playback once the accumulated display time reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSchedule {
    durations_us: Vec<u32>,
    loop_count: u32,
    budget_us: u64,
    frame_bytes: u64,
    max_memory: u64,
}

impl PlaybackSchedule {
    /// Builds a schedule from a manifest and the frame table durations
    pub fn new(manifest: &Manifest, durations_us: &[u32]) -> Self {
        let default_us = match manifest.frame_duration_us {
            0 => DEFAULT_FRAME_DURATION_US,
            us => us,
        };
        let durations_us = durations_us
            .iter()
            .map(|&us| {
                let us = if us == 0 { default_us } else { us };
                us.max(MIN_FRAME_DURATION_US)
            })
            .collect();

        Self {
            durations_us,
            loop_count: manifest.loop_count.min(MAX_LOOP_COUNT),
            budget_us: manifest.max_total_duration_ms as u64 * 1000,
            frame_bytes: manifest.logical_width as u64 * manifest.logical_height as u64 * 4,
            // An unset budget keeps the renderer's default
            max_memory: match manifest.max_memory {
                0 => DEFAULT_MAX_MEMORY,
                bytes => bytes,
            },
        }
    }

    /// Schedule for a decoded container
    pub fn from_package(package: &LoadedPackage) -> Self {
        let durations: Vec<u32> = package.frames.iter().map(|f| f.duration_us).collect();
        Self::new(&package.manifest, &durations)
    }

    /// Loops to play; `None` repeats until the time budget (if any) runs out
    pub fn loops(&self) -> Option<u32> {
        (self.loop_count > 0).then_some(self.loop_count)
    }

    /// Per-frame display durations after clamping
    pub fn frame_durations_us(&self) -> &[u32] {
        &self.durations_us
    }

    /// Display time of one pass through the sequence
    pub fn pass_duration_us(&self) -> u64 {
        self.durations_us.iter().map(|&us| us as u64).sum()
    }

    /// Total display time, or `None` when playback never ends
    pub fn total_duration_us(&self) -> Option<u64> {
        if self.durations_us.is_empty() {
            return Some(0);
        }
        if self.loop_count == 0 && self.budget_us == 0 {
            return None;
        }
        Some(self.iter().map(|(_, us)| us as u64).sum())
    }

    /// Whether the renderer's front and back buffers fit in `max_memory`
    pub fn fits_memory_budget(&self) -> bool {
        self.frame_bytes > 0 && self.frame_bytes.saturating_mul(2) <= self.max_memory
    }

    /// Iterates `(frame_index, duration_us)` in presentation order
    pub fn iter(&self) -> PlaybackIter<'_> {
        PlaybackIter {
            schedule: self,
            loop_index: 0,
            frame_index: 0,
            elapsed_us: 0,
            finished: self.durations_us.is_empty(),
        }
    }
}

impl<'a> IntoIterator for &'a PlaybackSchedule {
    type Item = (usize, u32);
    type IntoIter = PlaybackIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`PlaybackSchedule`]
#[derive(Debug, Clone)]
pub struct PlaybackIter<'a> {
    schedule: &'a PlaybackSchedule,
    loop_index: u32,
    frame_index: usize,
    elapsed_us: u64,
    finished: bool,
}

impl Iterator for PlaybackIter<'_> {
    type Item = (usize, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let schedule = self.schedule;
        let item = (self.frame_index, schedule.durations_us[self.frame_index]);

        self.elapsed_us += item.1 as u64;
        if schedule.budget_us > 0 && self.elapsed_us >= schedule.budget_us {
            self.finished = true;
        }

        self.frame_index += 1;
        if self.frame_index == schedule.durations_us.len() {
            self.frame_index = 0;
            self.loop_index += 1;
            if schedule.loop_count > 0 && self.loop_index >= schedule.loop_count {
                self.finished = true;
            }
        }

        Some(item)
    }
}
