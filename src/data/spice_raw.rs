//! SPICE `.raw` waveform dumps (LTspice and SPICE3 flavours).
//!
//! Real binary data is LTspice's mixed layout (f64 first variable, f32 for
//! the rest) unless the `double` flag is set or the payload is exactly
//! `points × vars × 8` bytes, which is how ngspice writes it.
//!
//! ```text
//!  Title: * C:\sim\rc.asc          ┐
//!  Plotname: Transient Analysis    │ header, UTF-16LE (LTspice)
//!  Flags: real forward stepped     │ or ASCII (SPICE3 / ngspice)
//!  No. Variables: 3                │
//!  No. Points: 1024                │
//!  Variables:                      │
//!  	0	time	time             │
//!  	1	V(out)	voltage          │
//!  Binary:                         ┘
//!  <points × vars, little endian>     or "Values:" followed by text
//! ```

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use num_complex::Complex64;

use super::cell::parse_pair;
use super::model::{Case, FieldIndex, Samples, TraceSet};
use crate::error::ImportError;

const FORMAT: &str = "SPICE raw";

fn malformed(reason: impl Into<String>) -> ImportError {
    ImportError::Malformed {
        format: FORMAT,
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Ascii,
    Utf16,
}

impl Encoding {
    fn unit(self) -> usize {
        match self {
            Encoding::Ascii => 1,
            Encoding::Utf16 => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Binary,
    Values,
}

#[derive(Debug, Default)]
struct Header {
    plotname: String,
    complex: bool,
    double: bool,
    stepped: bool,
    fastaccess: bool,
    n_points: usize,
    variables: Vec<String>,
}

impl Header {
    fn mode(&self) -> &str {
        let plot = self.plotname.to_ascii_lowercase();
        if plot.contains("transient") {
            "Transient"
        } else if plot.contains("ac analysis") {
            "AC"
        } else if plot.contains("dc transfer") {
            "DC"
        } else if plot.contains("noise") {
            "Noise"
        } else if plot.contains("fft") {
            "FFT"
        } else if plot.contains("operating point") {
            "Operating Point"
        } else {
            self.plotname.trim()
        }
    }
}

/// Decode header text up to the data marker. Returns the text, the section
/// kind and the byte offset of the first data byte.
fn split_header(bytes: &[u8], encoding: Encoding) -> Result<(String, Section, usize), ImportError> {
    let unit = encoding.unit();
    let mut text = String::new();
    let mut line_start = 0;
    let mut pos = 0;
    while pos + unit <= bytes.len() {
        let code = match encoding {
            Encoding::Ascii => u32::from(bytes[pos]),
            Encoding::Utf16 => u32::from(u16::from_le_bytes([bytes[pos], bytes[pos + 1]])),
        };
        pos += unit;
        let ch = char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
        text.push(ch);
        if ch == '\n' {
            let line = text[line_start..].trim();
            let section = match line {
                "Binary:" => Some(Section::Binary),
                "Values:" => Some(Section::Values),
                _ => None,
            };
            if let Some(section) = section {
                text.truncate(line_start);
                return Ok((text, section, pos));
            }
            line_start = text.len();
        }
    }
    Err(malformed("no Binary: or Values: section"))
}

fn parse_header(text: &str) -> Result<Header, ImportError> {
    let mut header = Header::default();
    let mut n_vars = 0usize;
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Plotname" => header.plotname = value.to_string(),
            "Flags" => {
                for flag in value.split_whitespace() {
                    match flag.to_ascii_lowercase().as_str() {
                        "complex" => header.complex = true,
                        "double" => header.double = true,
                        "stepped" => header.stepped = true,
                        "fastaccess" => header.fastaccess = true,
                        _ => {}
                    }
                }
            }
            "No. Variables" => {
                n_vars = value
                    .parse()
                    .map_err(|_| malformed(format!("bad variable count '{value}'")))?
            }
            "No. Points" => {
                header.n_points = value
                    .parse()
                    .map_err(|_| malformed(format!("bad point count '{value}'")))?
            }
            "Variables" => {
                for _ in 0..n_vars {
                    let var_line = lines
                        .next()
                        .ok_or_else(|| malformed("variable list ends early"))?;
                    let name = var_line
                        .split_whitespace()
                        .nth(1)
                        .ok_or_else(|| malformed(format!("bad variable line '{var_line}'")))?;
                    header.variables.push(name.to_string());
                }
            }
            _ => {}
        }
    }
    if header.variables.is_empty() {
        return Err(malformed("no variables declared"));
    }
    Ok(header)
}

// ---------------------------------------------------------------------------
// Data sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Encoded {
    F32,
    F64,
    ComplexF64,
}

impl Encoded {
    fn size(self) -> usize {
        match self {
            Encoded::F32 => 4,
            Encoded::F64 => 8,
            Encoded::ComplexF64 => 16,
        }
    }
}

fn read_value(cursor: &mut Cursor<&[u8]>, kind: Encoded, column: &mut Samples) -> std::io::Result<()> {
    match kind {
        Encoded::F32 => column.push_real(f64::from(cursor.read_f32::<LittleEndian>()?)),
        Encoded::F64 => column.push_real(cursor.read_f64::<LittleEndian>()?),
        Encoded::ComplexF64 => {
            let re = cursor.read_f64::<LittleEndian>()?;
            let im = cursor.read_f64::<LittleEndian>()?;
            column.push_complex(Complex64::new(re, im));
        }
    }
    Ok(())
}

fn read_binary(header: &Header, data: &[u8]) -> Result<Vec<Samples>, ImportError> {
    let n_vars = header.variables.len();
    let too_large = || malformed(format!("point count {} is too large", header.n_points));
    // ngspice writes every real value as f64 without setting the flag
    let all_double = match header.n_points.checked_mul(n_vars).and_then(|n| n.checked_mul(8)) {
        Some(len) => header.double || (!header.complex && n_vars > 1 && data.len() == len),
        None => header.double,
    };
    let kinds: Vec<Encoded> = (0..n_vars)
        .map(|i| match (header.complex, all_double, i) {
            (true, _, _) => Encoded::ComplexF64,
            (false, true, _) | (false, false, 0) => Encoded::F64,
            (false, false, _) => Encoded::F32,
        })
        .collect();
    let row: usize = kinds.iter().map(|k| k.size()).sum();
    let needed = row.checked_mul(header.n_points).ok_or_else(too_large)?;
    if data.len() < needed {
        return Err(malformed(format!(
            "expected {needed} data bytes for {} points, found {}",
            header.n_points,
            data.len()
        )));
    }

    let mut columns = vec![Samples::default(); n_vars];
    let mut cursor = Cursor::new(data);
    let eof = |e: std::io::Error| malformed(format!("truncated data: {e}"));
    if header.fastaccess {
        for (column, &kind) in columns.iter_mut().zip(&kinds) {
            for _ in 0..header.n_points {
                read_value(&mut cursor, kind, column).map_err(eof)?;
            }
        }
    } else {
        for _ in 0..header.n_points {
            for (column, &kind) in columns.iter_mut().zip(&kinds) {
                read_value(&mut cursor, kind, column).map_err(eof)?;
            }
        }
    }
    Ok(columns)
}

fn read_values(header: &Header, data: &[u8], encoding: Encoding) -> Result<Vec<Samples>, ImportError> {
    let text = match encoding {
        Encoding::Ascii => String::from_utf8_lossy(data).into_owned(),
        Encoding::Utf16 => {
            let units: Vec<u16> = data
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
    };

    let n_vars = header.variables.len();
    let mut columns = vec![Samples::default(); n_vars];
    let mut tokens = text.split_whitespace();
    for point in 0..header.n_points {
        // point index
        tokens
            .next()
            .ok_or_else(|| malformed(format!("missing point {point}")))?;
        for column in columns.iter_mut() {
            let token = tokens
                .next()
                .ok_or_else(|| malformed(format!("point {point} is incomplete")))?;
            if token.contains(',') {
                let z = parse_pair(token).ok_or_else(|| malformed(format!("bad value '{token}'")))?;
                column.push_complex(z);
            } else {
                let v = token
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("bad value '{token}'")))?;
                column.push_real(v);
            }
        }
    }
    Ok(columns)
}

/// Start index of every run: positions where the independent variable
/// returns to its first value.
fn run_starts(x: &Samples) -> Vec<usize> {
    let values = x.to_complex();
    let Some(first) = values.first().copied() else {
        return vec![0];
    };
    std::iter::once(0)
        .chain((1..values.len()).filter(|&i| values[i] == first))
        .collect()
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn parse(bytes: &[u8]) -> Result<TraceSet, ImportError> {
    let encoding = if bytes.len() >= 2 && bytes[0] != 0 && bytes[1] == 0 {
        Encoding::Utf16
    } else {
        Encoding::Ascii
    };
    let (text, section, offset) = split_header(bytes, encoding)?;
    let header = parse_header(&text)?;
    let data = &bytes[offset..];

    let mut columns = match section {
        Section::Binary => read_binary(&header, data)?,
        Section::Values => read_values(&header, data, encoding)?,
    };

    // LTspice flags compressed transient points with a negative time
    if header.variables[0].eq_ignore_ascii_case("time") {
        if let Samples::Real(t) = &mut columns[0] {
            t.iter_mut().for_each(|v| *v = v.abs());
        }
    }

    let starts = if header.stepped {
        run_starts(&columns[0])
    } else {
        vec![0]
    };
    let mut set = TraceSet::new(FieldIndex::new(header.variables.iter().cloned()));
    set.misc_info = format!("Spice simulation, MODE: {}", header.mode());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(header.n_points);
        let case = columns.iter().map(|c| c.slice(start, end)).collect();
        set.push_case(Case::from_columns(case), None);
    }

    log::info!(
        "SPICE raw: {} mode, {} variables, {} points, {} case(s)",
        header.mode(),
        header.variables.len(),
        header.n_points,
        set.case_count()
    );
    Ok(set)
}
