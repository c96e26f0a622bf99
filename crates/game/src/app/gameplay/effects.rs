use serde::Serialize;
use tracing::{debug, info};

pub(crate) const EFFECT_MULTIPLIER: f32 = 2.0;
pub(crate) const EFFECT_DURATION_SECONDS: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub(crate) enum EffectKind {
    SpeedBoost,
    JumpBoost,
}

impl EffectKind {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            EffectKind::SpeedBoost => "SpeedBoost",
            EffectKind::JumpBoost => "JumpBoost",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct EffectParameters {
    pub(crate) multiplier: f32,
    pub(crate) duration_seconds: f32,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            multiplier: EFFECT_MULTIPLIER,
            duration_seconds: EFFECT_DURATION_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveEffect {
    kind: EffectKind,
    multiplier: f32,
    remaining_seconds: f32,
}

/// Timed player multipliers from injectables. At most one entry per kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ActiveEffects {
    active: Vec<ActiveEffect>,
}

impl ActiveEffects {
    /// Re-applying a running kind restarts its timer instead of stacking.
    pub(crate) fn apply(&mut self, kind: EffectKind, parameters: EffectParameters) {
        let entry = ActiveEffect {
            kind,
            multiplier: parameters.multiplier.max(0.0),
            remaining_seconds: parameters.duration_seconds.max(0.0),
        };
        if let Some(existing) = self.active.iter_mut().find(|effect| effect.kind == kind) {
            *existing = entry;
            debug!(effect = kind.label(), "effect_restarted");
        } else {
            self.active.push(entry);
            info!(
                effect = kind.label(),
                multiplier = entry.multiplier,
                duration_seconds = entry.remaining_seconds,
                "effect_applied"
            );
        }
    }

    pub(crate) fn tick(&mut self, fixed_dt_seconds: f32) {
        for effect in &mut self.active {
            effect.remaining_seconds -= fixed_dt_seconds;
        }
        self.active.retain(|effect| {
            let keep = effect.remaining_seconds > 0.0;
            if !keep {
                info!(effect = effect.kind.label(), "effect_expired");
            }
            keep
        });
    }

    pub(crate) fn is_active(&self, kind: EffectKind) -> bool {
        self.active.iter().any(|effect| effect.kind == kind)
    }

    pub(crate) fn remaining_seconds(&self, kind: EffectKind) -> Option<f32> {
        self.active
            .iter()
            .find(|effect| effect.kind == kind)
            .map(|effect| effect.remaining_seconds)
    }

    pub(crate) fn speed_multiplier(&self) -> f32 {
        self.multiplier_for(EffectKind::SpeedBoost)
    }

    pub(crate) fn jump_multiplier(&self) -> f32 {
        self.multiplier_for(EffectKind::JumpBoost)
    }

    pub(crate) fn clear(&mut self) {
        self.active.clear();
    }

    fn multiplier_for(&self, kind: EffectKind) -> f32 {
        self.active
            .iter()
            .find(|effect| effect.kind == kind)
            .map_or(1.0, |effect| effect.multiplier)
    }
}
