use super::{Family, Params};

/// Fraction of the remaining distance covered each frame.
pub const PARAM_LERP: f32 = 0.02;

/// Unperturbed coefficients for each family.
pub fn baseline(family: Family) -> Params {
    match family {
        Family::Aizawa => Params {
            a: 0.95,
            b: 0.7,
            c: 0.6,
            d: 3.5,
            e: 0.25,
            f: 0.1,
        },
        Family::Thomas => Params {
            b: 0.19,
            ..Params::default()
        },
        Family::Lorenz => Params {
            a: 10.0,
            b: 28.0,
            c: 2.66,
            ..Params::default()
        },
        Family::Halvorsen => Params {
            a: 1.4,
            ..Params::default()
        },
        Family::Chen => Params {
            a: 40.0,
            b: 3.0,
            c: 28.0,
            ..Params::default()
        },
    }
}

/// Baseline with the family's single free coefficient jittered.
pub fn draw_target(family: Family, rng: &mut fastrand::Rng) -> Params {
    let mut p = baseline(family);
    match family {
        Family::Aizawa => p.d += jitter(rng, 0.5),
        Family::Thomas => p.b += jitter(rng, 0.02),
        Family::Lorenz => p.b += jitter(rng, 5.0),
        Family::Halvorsen => p.a += jitter(rng, 0.2),
        Family::Chen => {}
    }
    p
}

fn jitter(rng: &mut fastrand::Rng, span: f32) -> f32 {
    -span + rng.f32() * (2.0 * span)
}

#[derive(Clone, Debug)]
pub struct ParamMorph {
    current: Params,
    target: Params,
}

impl ParamMorph {
    /// Starts settled on a fresh draw for `family`.
    pub fn new(family: Family, rng: &mut fastrand::Rng) -> Self {
        let p = draw_target(family, rng);
        Self {
            current: p,
            target: p,
        }
    }

    pub fn settled(params: Params) -> Self {
        Self {
            current: params,
            target: params,
        }
    }

    /// Draws a new target for `family`. `current` keeps its value and
    /// drifts toward the new target through [`ParamMorph::step`].
    pub fn retarget(&mut self, family: Family, rng: &mut fastrand::Rng) -> Params {
        self.target = draw_target(family, rng);
        self.target
    }

    pub fn step(&mut self) {
        let target = self.target;
        self.current.relax_toward(&target, PARAM_LERP);
    }

    pub fn current(&self) -> Params {
        self.current
    }

    pub fn target(&self) -> Params {
        self.target
    }
}
