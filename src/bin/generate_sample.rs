//! Writes a synthetic dimuon CSV in the CMS open-data layout.
//!
//! Usage: `generate_sample [EVENTS] [OUTPUT]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

/// Synthetic dimuon events with resonance peaks over a falling continuum.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Number of events to write
    #[arg(default_value_t = 20_000)]
    events: u64,

    /// Output CSV path
    #[arg(default_value = "MuRun2010B.csv")]
    output: PathBuf,

    /// Seed for the event generator
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const MUON_MASS: f64 = 0.105_658;

const HEADER: [&str; 21] = [
    "Run", "Event", "type1", "E1", "px1", "py1", "pz1", "pt1", "eta1", "phi1", "Q1", "type2", "E2", "px2", "py2",
    "pz2", "pt2", "eta2", "phi2", "Q2", "M",
];

/// (mass, width, relative rate)
const PEAKS: [(f64, f64, f64); 6] = [
    (3.097, 0.035, 0.30),
    (3.686, 0.045, 0.02),
    (9.46, 0.09, 0.05),
    (10.02, 0.10, 0.015),
    (10.36, 0.11, 0.01),
    (91.2, 2.5, 0.02),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn exponential(&mut self, scale: f64) -> f64 {
        -scale * self.next_f64().max(1e-15).ln()
    }

    /// Uniform direction on the unit sphere.
    fn direction(&mut self) -> [f64; 3] {
        let cos_theta = 2.0 * self.next_f64() - 1.0;
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
        let phi = 2.0 * std::f64::consts::PI * self.next_f64();
        [sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta]
    }
}

/// Four-momentum as [E, px, py, pz].
type P4 = [f64; 4];

/// Boost `p` from the rest frame of a system with velocity `beta`.
fn boost(p: P4, beta: [f64; 3]) -> P4 {
    let b2 = beta.iter().map(|b| b * b).sum::<f64>();
    if b2 <= 0.0 {
        return p;
    }
    let gamma = 1.0 / (1.0 - b2).sqrt();
    let bp = beta[0] * p[1] + beta[1] * p[2] + beta[2] * p[3];
    let g2 = (gamma - 1.0) / b2;
    let k = g2 * bp + gamma * p[0];
    [
        gamma * (p[0] + bp),
        p[1] + k * beta[0],
        p[2] + k * beta[1],
        p[3] + k * beta[2],
    ]
}

/// Pair mass and whether it came from a resonance.
fn sample_mass(rng: &mut SimpleRng) -> (f64, bool) {
    let mut u = rng.next_f64();
    for &(mass, width, rate) in &PEAKS {
        if u < rate {
            return (rng.gauss(mass, width), true);
        }
        u -= rate;
    }
    // Falling continuum above threshold.
    (2.0 * MUON_MASS + 0.5 + rng.exponential(6.0), false)
}

/// Decay a pair of mass `m` isotropically and boost it into the lab.
fn decay(rng: &mut SimpleRng, m: f64) -> (P4, P4) {
    let m = m.max(2.0 * MUON_MASS + 1e-3);
    let p_star = (m * m / 4.0 - MUON_MASS * MUON_MASS).sqrt();
    let e_star = m / 2.0;
    let d = rng.direction();
    let mu_a = [e_star, p_star * d[0], p_star * d[1], p_star * d[2]];
    let mu_b = [e_star, -p_star * d[0], -p_star * d[1], -p_star * d[2]];

    let pt = rng.exponential(8.0);
    let pz = rng.gauss(0.0, 20.0);
    let phi = 2.0 * std::f64::consts::PI * rng.next_f64();
    let (px, py) = (pt * phi.cos(), pt * phi.sin());
    let e = (m * m + px * px + py * py + pz * pz).sqrt();
    let beta = [px / e, py / e, pz / e];

    (boost(mu_a, beta), boost(mu_b, beta))
}

fn muon_fields(p: P4, kind: &str, charge: i32) -> Vec<String> {
    let pt = p[1].hypot(p[2]);
    // Undefined along the beam axis; keep the field finite.
    let eta = if pt > 0.0 { (p[3] / pt).asinh() } else { 0.0 };
    let phi = p[2].atan2(p[1]);
    vec![
        kind.to_string(),
        format!("{:.5}", p[0]),
        format!("{:.5}", p[1]),
        format!("{:.5}", p[2]),
        format!("{:.5}", p[3]),
        format!("{pt:.5}"),
        format!("{eta:.5}"),
        format!("{phi:.5}"),
        charge.to_string(),
    ]
}

/// One CSV row and whether the pair is same-sign.
fn event_record(rng: &mut SimpleRng, event: u64) -> (Vec<String>, bool) {
    let (m, resonant) = sample_mass(rng);
    let (p1, p2) = decay(rng, m);

    // Resonances decay to opposite-sign pairs; a fraction of the
    // continuum is combinatorial background of either sign.
    let q1 = if rng.next_f64() < 0.5 { 1 } else { -1 };
    let same_sign = !resonant && rng.next_f64() < 0.12;
    let q2 = if same_sign { q1 } else { -q1 };
    let kind = |r: f64| if r < 0.8 { "G" } else { "T" };

    let mut record = vec!["146436".to_string(), (90_000_000 + event).to_string()];
    record.extend(muon_fields(p1, kind(rng.next_f64()), q1));
    record.extend(muon_fields(p2, kind(rng.next_f64()), q2));
    record.push(format!("{m:.5}"));
    (record, same_sign)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let output = args.output.display();

    let mut rng = SimpleRng::new(args.seed);
    let mut writer = csv::Writer::from_path(&args.output).with_context(|| format!("creating {output}"))?;
    writer.write_record(HEADER)?;

    let mut same_sign = 0u64;
    for event in 0..args.events {
        let (record, is_same_sign) = event_record(&mut rng, event);
        if is_same_sign {
            same_sign += 1;
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;

    println!("Wrote {} dimuon events ({same_sign} same-sign) to {output}", args.events);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cms_dimuon::data::loader::{parse_record, MIN_FIELDS};
    use csv::StringRecord;

    #[test]
    fn generated_rows_parse_back() {
        let mut rng = SimpleRng::new(7);
        let mut same_sign = 0;
        for event in 0..2_000 {
            let (fields, is_same_sign) = event_record(&mut rng, event);
            assert_eq!(fields.len(), HEADER.len());
            assert!(fields.len() > MIN_FIELDS);

            let record = StringRecord::from(fields);
            let (mu1, mu2) = parse_record(&record, event + 2).unwrap();
            let pair_charge = mu1.charge.as_int() + mu2.charge.as_int();
            assert_eq!(pair_charge != 0, is_same_sign);
            if is_same_sign {
                same_sign += 1;
            }
            assert!(mu1.p4.e.is_finite() && mu2.p4.e.is_finite());
        }
        assert!(same_sign > 0);
    }

    #[test]
    fn every_field_is_finite() {
        let mut rng = SimpleRng::new(11);
        for event in 0..2_000 {
            let (fields, _) = event_record(&mut rng, event);
            for value in &fields[3..] {
                if let Ok(x) = value.parse::<f64>() {
                    assert!(x.is_finite(), "event {event}: {value}");
                }
            }
        }
    }

    #[test]
    fn muon_along_beam_axis_has_finite_eta() {
        let fields = muon_fields([5.0, 0.0, 0.0, 5.0], "G", 1);
        assert_eq!(fields[5], "0.00000");
        assert_eq!(fields[6], "0.00000");
    }

    #[test]
    fn arguments_default_and_override() {
        let args = Args::parse_from(["generate_sample"]);
        assert_eq!(args.events, 20_000);
        assert_eq!(args.output, PathBuf::from("MuRun2010B.csv"));

        let args = Args::parse_from(["generate_sample", "500", "out.csv", "--seed", "3"]);
        assert_eq!((args.events, args.seed), (500, 3));
        assert_eq!(args.output, PathBuf::from("out.csv"));
        assert!(Args::try_parse_from(["generate_sample", "many"]).is_err());
    }
}
