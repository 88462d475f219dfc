//! Writes a synthetic fixed-width natality extract for trying out the
//! report and viewer without the real public-use file.
//!
//! Usage: generate_sample [RECORDS] [OUTPUT]

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};

use natality_weeks::data::layout::Layout;
use natality_weeks::data::model::{BMI_CODES, BirthRecord, DeliveryRoute, Induction};

const DEFAULT_RECORDS: usize = 50_000;
const DEFAULT_OUTPUT: &str = "sample_natality.txt";

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
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
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

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick an index from relative weights.
    fn weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut roll = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if roll < *w {
                return i;
            }
            roll -= w;
        }
        weights.len() - 1
    }

    fn clamped(&mut self, mean: f64, std_dev: f64, min: f64, max: f64) -> u8 {
        self.gauss(mean, std_dev).round().clamp(min, max) as u8
    }
}

// Code frequencies, loosely shaped like a national birth year.
const BMI_WEIGHTS: [f64; 7] = [3.0, 42.0, 26.0, 15.0, 7.0, 5.0, 2.0];
const EDUCATION_WEIGHTS: [f64; 9] = [3.0, 8.0, 25.0, 20.0, 9.0, 21.0, 10.0, 3.0, 1.0];
const BIRTH_ORDER_WEIGHTS: [f64; 6] = [40.0, 32.0, 16.0, 7.0, 3.0, 2.0];
const CARE_MONTH_WEIGHTS: [f64; 9] = [40.0, 35.0, 12.0, 5.0, 3.0, 2.0, 1.0, 1.0, 1.0];

fn synth_birth(rng: &mut SimpleRng) -> BirthRecord {
    let age = rng.clamped(29.5, 5.8, 12.0, 54.0);
    let bmi = BMI_CODES[rng.weighted(&BMI_WEIGHTS)];
    let education = rng.weighted(&EDUCATION_WEIGHTS) as u8 + 1;

    // Older and heavier mothers deliver slightly earlier and by cesarean more often
    let shift = if age >= 35 { -0.4 } else { 0.0 };
    let weeks = rng.clamped(38.8 + shift, 1.9, 20.0, 47.0);

    let induced = rng.chance(if weeks >= 39 { 0.38 } else { 0.22 });
    let cesarean_p =
        0.26 + f64::from(age.saturating_sub(30)) * 0.012 + f64::from(bmi.min(6)) * 0.02;
    let route = match rng.weighted(&[1.0 - cesarean_p - 0.03, 0.01, 0.02, cesarean_p, 0.004]) {
        0 => DeliveryRoute::Spontaneous,
        1 => DeliveryRoute::Forceps,
        2 => DeliveryRoute::Vacuum,
        3 => DeliveryRoute::Cesarean,
        _ => DeliveryRoute::Unknown,
    };
    let induction = if rng.chance(0.003) {
        Induction::Unknown
    } else if induced {
        Induction::Induced
    } else {
        Induction::NotInduced
    };

    let birthweight = rng
        .gauss(3300.0 + (f64::from(weeks) - 39.0) * 180.0, 450.0)
        .clamp(300.0, 6000.0) as u16;

    BirthRecord {
        mother_age: Some(age),
        education: Some(education),
        bmi_category: Some(bmi),
        gestation_weeks: Some(weeks),
        delivery_route: Some(route),
        induction: Some(induction),
        birth_order: Some(rng.weighted(&BIRTH_ORDER_WEIGHTS) as u8 + 1),
        prenatal_care_month: Some(rng.weighted(&CARE_MONTH_WEIGHTS) as u8 + 1),
        birthweight: Some(birthweight),
    }
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let records = match args.next() {
        Some(n) => n.parse().with_context(|| format!("invalid record count: {n}"))?,
        None => DEFAULT_RECORDS,
    };
    let output = args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let layout = Layout::natality_2023();
    let mut rng = SimpleRng::new(42);

    let file = File::create(&output).with_context(|| format!("creating {output}"))?;
    let mut writer = BufWriter::new(file);
    for _ in 0..records {
        let line = layout.encode(&synth_birth(&mut rng));
        writeln!(writer, "{line}").with_context(|| format!("writing {output}"))?;
    }
    writer.flush().with_context(|| format!("writing {output}"))?;

    println!(
        "Wrote {records} synthetic births ({} columns each) to {output}",
        layout.record_width()
    );
    Ok(())
}
