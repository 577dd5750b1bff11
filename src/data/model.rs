use std::fmt;
use std::ops::Add;

// ---------------------------------------------------------------------------
// FourVector – (E, px, py, pz)
// ---------------------------------------------------------------------------

/// Relativistic energy-momentum vector in GeV.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FourVector {
    pub e: f64,
    pub px: f64,
    pub py: f64,
    pub pz: f64,
}

impl FourVector {
    pub fn new(e: f64, px: f64, py: f64, pz: f64) -> Self {
        Self { e, px, py, pz }
    }

    /// Transverse momentum, sqrt(px² + py²).
    pub fn pt(&self) -> f64 {
        self.px.hypot(self.py)
    }

    /// Minkowski norm squared, E² - |p|².
    pub fn mass2(&self) -> f64 {
        self.e * self.e - (self.px * self.px + self.py * self.py + self.pz * self.pz)
    }

    /// Invariant mass. Space-like vectors (negative norm from rounding or
    /// bad input) return `-sqrt(-m²)`, so they fall into underflow.
    pub fn mass(&self) -> f64 {
        let m2 = self.mass2();
        if m2 < 0.0 {
            -(-m2).sqrt()
        } else {
            m2.sqrt()
        }
    }
}

impl Add for FourVector {
    type Output = FourVector;

    fn add(self, rhs: FourVector) -> FourVector {
        FourVector {
            e: self.e + rhs.e,
            px: self.px + rhs.px,
            py: self.py + rhs.py,
            pz: self.pz + rhs.pz,
        }
    }
}

// ---------------------------------------------------------------------------
// Charge
// ---------------------------------------------------------------------------

/// Electric charge of a single muon candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charge {
    Positive,
    Negative,
}

impl Charge {
    /// Accepts exactly +1 or -1.
    pub fn from_int(q: i64) -> Option<Self> {
        match q {
            1 => Some(Charge::Positive),
            -1 => Some(Charge::Negative),
            _ => None,
        }
    }

    pub fn as_int(self) -> i32 {
        match self {
            Charge::Positive => 1,
            Charge::Negative => -1,
        }
    }
}

impl fmt::Display for Charge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Charge::Positive => write!(f, "+"),
            Charge::Negative => write!(f, "-"),
        }
    }
}

// ---------------------------------------------------------------------------
// Muon / Dimuon observations
// ---------------------------------------------------------------------------

/// One muon candidate from an input row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Muon {
    pub p4: FourVector,
    pub charge: Charge,
}

impl Muon {
    pub fn new(p4: FourVector, charge: Charge) -> Self {
        Self { p4, charge }
    }
}

/// A reconstructed muon pair. Owns both daughters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimuon {
    pub mu1: Muon,
    pub mu2: Muon,
    pub p4: FourVector,
    /// Sum of the daughter charges: -2, 0 or +2.
    pub charge: i32,
}

impl Dimuon {
    /// Combine two muons into a pair candidate.
    pub fn reconstruct(mu1: Muon, mu2: Muon) -> Self {
        Dimuon {
            mu1,
            mu2,
            p4: mu1.p4 + mu2.p4,
            charge: mu1.charge.as_int() + mu2.charge.as_int(),
        }
    }

    /// Opposite-sign pair (charges sum to zero).
    pub fn is_opposite_sign(&self) -> bool {
        self.charge == 0
    }

    pub fn mass(&self) -> f64 {
        self.p4.mass()
    }

    pub fn daughters(&self) -> [&Muon; 2] {
        [&self.mu1, &self.mu2]
    }
}
