//! Awaitable tweens.
//!
//! Every animation step is a future that resolves once the step has reached
//! its final transform, so sequencing is plain `.await` ordering.

use std::f32::consts::PI;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

use crate::model::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub scale: f32,
    /// Rotation around the vertical axis, radians.
    pub yaw: f32,
}

impl Transform {
    pub fn at(translation: Vec3) -> Self {
        Self { translation, scale: 1.0, yaw: 0.0 }
    }

    pub fn lifted(self, height: f32) -> Self {
        Self { translation: self.translation + Vec3::UP * height, ..self }
    }

    pub fn facing(self, toward: Vec3) -> Self {
        let d = toward - self.translation;
        if d.x == 0.0 && d.z == 0.0 {
            return self;
        }
        Self { yaw: d.x.atan2(d.z), ..self }
    }

    fn lerp(self, to: Transform, t: f32) -> Transform {
        Transform {
            translation: self.translation.lerp(to.translation, t),
            scale: self.scale + (to.scale - self.scale) * t,
            yaw: self.yaw + (to.yaw - self.yaw) * t,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::at(Vec3::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    InOutQuad,
    OutCubic,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::InOutQuad => {
                if t < 0.5 { 2.0 * t * t } else { 1.0 - (-2.0 * t + 2.0).powi(2) / 2.0 }
            }
            Easing::OutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Tween {
    pub from: Transform,
    pub to: Transform,
    pub duration: Duration,
    pub easing: Easing,
    /// Height of the vertical arc added on top of the straight path.
    pub arc: f32,
}

impl Tween {
    pub fn new(from: Transform, to: Transform, duration: Duration) -> Self {
        Self { from, to, duration, easing: Easing::InOutQuad, arc: 0.0 }
    }

    pub fn eased(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_arc(mut self, arc: f32) -> Self {
        self.arc = arc;
        self
    }

    pub fn sample(&self, progress: f32) -> Transform {
        let p = progress.clamp(0.0, 1.0);
        let mut t = self.from.lerp(self.to, self.easing.apply(p));
        if self.arc != 0.0 {
            t.translation.y += self.arc * (PI * p).sin();
        }
        t
    }
}

/// Play `tween`, feeding a sample to `apply` every `frame`.
///
/// The final call always receives exactly `tween.to`, and the future resolves
/// exactly `tween.duration` after it was first polled.
pub async fn play(tween: &Tween, frame: Duration, mut apply: impl FnMut(Transform)) -> Transform {
    let start = Instant::now();
    let end = start + tween.duration;
    loop {
        let now = Instant::now();
        if now >= end {
            apply(tween.to);
            return tween.to;
        }
        let progress = (now - start).as_secs_f32() / tween.duration.as_secs_f32();
        apply(tween.sample(progress));
        sleep_until((now + frame).min(end)).await;
    }
}
