mod morph;

pub use morph::{baseline, draw_target, ParamMorph, PARAM_LERP};

/// Position or velocity in simulation space.
pub type Vec3 = [f32; 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Family {
    Aizawa = 0,
    Thomas = 1,
    Lorenz = 2,
    Halvorsen = 3,
    Chen = 4,
}

impl Family {
    pub const COUNT: usize = 5;

    pub const fn all() -> [Self; Self::COUNT] {
        [
            Self::Aizawa,
            Self::Thomas,
            Self::Lorenz,
            Self::Halvorsen,
            Self::Chen,
        ]
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Wraps out-of-range indices, so `-s 7` picks Lorenz.
    pub const fn from_index(idx: usize) -> Self {
        Self::all()[idx % Self::COUNT]
    }

    pub const fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Aizawa => "Aizawa",
            Self::Thomas => "Thomas",
            Self::Lorenz => "Lorenz",
            Self::Halvorsen => "Halvorsen",
            Self::Chen => "Chen",
        }
    }

    /// Accepts an index or a case-insensitive family name.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if let Ok(idx) = s.parse::<usize>() {
            return Some(Self::from_index(idx));
        }
        let needle = s.to_ascii_lowercase();
        Self::all()
            .into_iter()
            .find(|f| f.name().to_ascii_lowercase() == needle)
    }

    /// Closed-form velocity field of this family at `p`.
    ///
    /// Pure and total: non-finite or huge inputs produce non-finite output
    /// rather than panicking, and the integrator recovers those particles.
    #[inline]
    pub fn velocity(self, p: Vec3, k: &Params) -> Vec3 {
        let [x, y, z] = p;
        match self {
            Self::Aizawa => [
                (z - k.b) * x - k.d * y,
                k.d * x + (z - k.b) * y,
                k.c + k.a * z - (z * z * z) / 3.0 - (x * x + y * y) * (1.0 + k.e * z)
                    + k.f * z * x * x * x,
            ],
            Self::Thomas => [y.sin() - k.b * x, z.sin() - k.b * y, x.sin() - k.b * z],
            Self::Lorenz => [k.a * (y - x), x * (k.b - z) - y, x * y - k.c * z],
            Self::Halvorsen => [
                -k.a * x - 4.0 * y - 4.0 * z - y * y,
                -k.a * y - 4.0 * z - 4.0 * x - z * z,
                -k.a * z - 4.0 * x - 4.0 * y - x * x,
            ],
            Self::Chen => [
                k.a * (y - x),
                (k.c - k.a) * x - x * z + k.c * y,
                x * y - k.b * z,
            ],
        }
    }
}

/// Coefficients shared by every family. Each family reads only the
/// subset its equations name.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Params {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Params {
    /// First-order low-pass step toward `target`.
    pub fn relax_toward(&mut self, target: &Params, rate: f32) {
        self.a += (target.a - self.a) * rate;
        self.b += (target.b - self.b) * rate;
        self.c += (target.c - self.c) * rate;
        self.d += (target.d - self.d) * rate;
        self.e += (target.e - self.e) * rate;
        self.f += (target.f - self.f) * rate;
    }

    /// Human-readable coefficient list for the chapter log.
    pub fn describe(&self, family: Family) -> String {
        match family {
            Family::Aizawa => format!(
                "a={:.3} b={:.3} c={:.3} d={:.3} e={:.3} f={:.3}",
                self.a, self.b, self.c, self.d, self.e, self.f
            ),
            Family::Thomas => format!("b={:.4}", self.b),
            Family::Lorenz => format!("sigma={:.2} rho={:.2} beta={:.3}", self.a, self.b, self.c),
            Family::Halvorsen => format!("a={:.3}", self.a),
            Family::Chen => format!("a={:.2} b={:.2} c={:.2}", self.a, self.b, self.c),
        }
    }
}
