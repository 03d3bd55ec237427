//! Writes a small set of demo traces: a Rigol CSV capture, a stepped text
//! export and a stepped binary SPICE raw file.
//!
//! Usage: `generate_sample [output-dir]`

use std::f64::consts::PI;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use byteorder::{LittleEndian, WriteBytesExt};

const RESISTORS: [(f64, &str); 3] = [(1e3, "1k"), (2.2e3, "2.2k"), (4.7e3, "4.7k")];
const CAPACITANCE: f64 = 1e-6;

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

    /// Uniform in `[-amplitude, amplitude)`.
    fn noise(&mut self, amplitude: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        amplitude * (2.0 * unit - 1.0)
    }
}

fn rc_charge(t: f64, r: f64) -> f64 {
    1.0 - (-t / (r * CAPACITANCE)).exp()
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// 1 kHz sine on CH1 and its noisy copy on CH2, 2 µs per sample.
fn write_rigol_csv(path: &Path, rng: &mut SimpleRng) -> Result<()> {
    let increment = 2e-6;
    let n = 1000;
    let mut out = create(path)?;
    writeln!(out, "X,CH1,CH2,Start,Increment,")?;
    writeln!(out, "Sequence,Volt,Volt,{:e},{:e}", -(n as f64) / 2.0 * increment, increment)?;
    for i in 0..n {
        let v = (2.0 * PI * 1e3 * i as f64 * increment).sin();
        writeln!(out, "{i},{v:.6},{:.6},", v + rng.noise(0.05))?;
    }
    out.flush()?;
    Ok(())
}

/// RC charging curves, one `Step Information:` run per resistor.
fn write_step_text(path: &Path) -> Result<()> {
    let mut out = create(path)?;
    writeln!(out, "time\tV(out)")?;
    for (run, (r, label)) in RESISTORS.iter().enumerate() {
        writeln!(
            out,
            "Step Information: R={label}  (Run: {}/{})",
            run + 1,
            RESISTORS.len()
        )?;
        for i in 0..=200 {
            let t = i as f64 * 5e-5;
            writeln!(out, "{t:e}\t{:e}", rc_charge(t, *r))?;
        }
    }
    out.flush()?;
    Ok(())
}

/// The same sweep as a stepped binary raw file (f64 time, f32 values).
fn write_spice_raw(path: &Path) -> Result<()> {
    let per_run = 201;
    let header = format!(
        "Title: * rc sweep\nDate: generated\nPlotname: Transient Analysis\n\
         Flags: real forward stepped\nNo. Variables: 2\nNo. Points: {}\nOffset: 0\n\
         Variables:\n\t0\ttime\ttime\n\t1\tV(out)\tvoltage\nBinary:\n",
        per_run * RESISTORS.len()
    );
    let mut out = create(path)?;
    for unit in header.encode_utf16() {
        out.write_u16::<LittleEndian>(unit)?;
    }
    for (r, _) in RESISTORS {
        for i in 0..per_run {
            let t = i as f64 * 5e-5;
            out.write_f64::<LittleEndian>(t)?;
            out.write_f32::<LittleEndian>(rc_charge(t, r) as f32)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let dir = std::env::args_os().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let mut rng = SimpleRng::new(42);
    write_rigol_csv(&dir.join("rigol_sine.csv"), &mut rng)?;
    write_step_text(&dir.join("rc_sweep.txt"))?;
    write_spice_raw(&dir.join("rc_sweep.raw"))?;

    println!("Wrote rigol_sine.csv, rc_sweep.txt and rc_sweep.raw to {}", dir.display());
    Ok(())
}
