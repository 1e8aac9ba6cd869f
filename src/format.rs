//! Reader for the text output of the flocking simulator.
//!
//! The first line holds four whitespace-separated parameters. Every following
//! line is either a progress message starting with `Time` or one timestep,
//! written as `[x,y,vx,vy],` once per bird.

use crate::error::FormatError;
use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    ops::Range,
    path::Path,
};

const PROGRESS_PREFIX: &str = "Time";

/// Simulation parameters from the first line of an output file.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationHeader {
    /// Number of recorded timesteps.
    pub timestep_count: usize,
    /// Number of birds.
    pub bird_count: usize,
    /// Side length of the square domain.
    pub domain_size: f64,
    /// Simulated seconds per timestep.
    pub timestep_duration: f64,

    tokens: Vec<String>,
}

impl SimulationHeader {
    /// Parse a header line.
    ///
    /// # Errors
    /// Returns a [`FormatError`] unless the line holds exactly four tokens,
    /// two positive integers followed by two positive reals.
    pub fn parse(line: &str) -> Result<Self, FormatError> {
        let tokens: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
        if tokens.len() != 4 {
            return Err(FormatError::HeaderLength(tokens.len()));
        }

        Ok(Self {
            timestep_count: parse_count("timestep_count", &tokens[0])?,
            bird_count: parse_count("bird_count", &tokens[1])?,
            domain_size: parse_real("domain_size", &tokens[2])?,
            timestep_duration: parse_real("timestep_duration", &tokens[3])?,
            tokens,
        })
    }

    /// Whether `n` equals one of the two counts.
    ///
    /// The simulator writes the bird count first, so either field may hold it.
    pub fn is_count(&self, n: usize) -> bool {
        n == self.timestep_count || n == self.bird_count
    }

    /// Raw header tokens, as written by the simulator.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

fn parse_count(name: &'static str, token: &str) -> Result<usize, FormatError> {
    let count: i64 = token.parse().map_err(|_| FormatError::HeaderField {
        name,
        token: token.to_owned(),
    })?;
    if count <= 0 {
        return Err(FormatError::NonPositive {
            name,
            token: token.to_owned(),
        });
    }
    usize::try_from(count).map_err(|_| FormatError::HeaderField {
        name,
        token: token.to_owned(),
    })
}

fn parse_real(name: &'static str, token: &str) -> Result<f64, FormatError> {
    let val: f64 = token
        .parse()
        .ok()
        .filter(|val: &f64| val.is_finite())
        .ok_or_else(|| FormatError::HeaderField {
            name,
            token: token.to_owned(),
        })?;
    if val <= 0.0 {
        return Err(FormatError::NonPositive {
            name,
            token: token.to_owned(),
        });
    }
    Ok(val)
}

/// Position and heading of one bird at one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BirdState {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl BirdState {
    pub fn new(x: f64, y: f64, vx: f64, vy: f64) -> Self {
        Self { x, y, vx, vy }
    }

    /// Fields in file order.
    pub fn fields(&self) -> [f64; 4] {
        [self.x, self.y, self.vx, self.vy]
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    /// Compare all four fields.
    ///
    /// A `tolerance` of zero means exact floating-point equality, so `NaN`
    /// never matches anything.
    pub fn matches(&self, other: &Self, tolerance: f64) -> bool {
        self.fields()
            .iter()
            .zip(other.fields())
            .all(|(&a, b)| {
                if tolerance == 0.0 {
                    a == b
                } else {
                    (a - b).abs() <= tolerance
                }
            })
    }
}

/// One line after the header.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// Diagnostic message, carries no bird state.
    Progress(String),
    /// All birds of one timestep, in file order.
    Timestep(Vec<BirdState>),
}

impl Line {
    /// Classify and parse a line.
    ///
    /// Anything starting with `Time` is a progress line, whatever follows.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        if text.starts_with(PROGRESS_PREFIX) {
            return Ok(Self::Progress(text.trim_end().to_owned()));
        }

        let groups = tokenize(text)?;
        if groups.is_empty() {
            return Err(FormatError::Empty);
        }

        let birds = groups
            .iter()
            .enumerate()
            .map(|(index, vals)| match vals[..] {
                [x, y, vx, vy] => Ok(BirdState::new(x, y, vx, vy)),
                _ => Err(FormatError::GroupSize {
                    index,
                    len: vals.len(),
                }),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self::Timestep(birds))
    }
}

/// Split a data line into its bracketed groups of numbers.
///
/// Commas and whitespace separate tokens. Every number must sit inside a
/// `[...]` group, and groups may not nest.
fn tokenize(text: &str) -> Result<Vec<Vec<f64>>, FormatError> {
    let mut groups = Vec::new();
    let mut group: Option<Vec<f64>> = None;
    let mut n_vals = 0;
    let mut start = None;

    for (col, ch) in text.char_indices() {
        let delim = matches!(ch, '[' | ']' | ',') || ch.is_whitespace();
        if !delim {
            if start.is_none() {
                start = Some(col);
            }
            continue;
        }

        if let Some(start) = start.take() {
            push_token(&mut group, &mut n_vals, text, start..col)?;
        }

        match ch {
            '[' if group.is_some() => return Err(FormatError::Bracket(col)),
            '[' => group = Some(Vec::with_capacity(4)),
            ']' => groups.push(group.take().ok_or(FormatError::Bracket(col))?),
            _ => {}
        }
    }

    if let Some(start) = start {
        push_token(&mut group, &mut n_vals, text, start..text.len())?;
    }
    if group.is_some() {
        return Err(FormatError::Bracket(text.len()));
    }

    Ok(groups)
}

fn push_token(
    group: &mut Option<Vec<f64>>,
    n_vals: &mut usize,
    text: &str,
    span: Range<usize>,
) -> Result<(), FormatError> {
    let vals = group
        .as_mut()
        .ok_or(FormatError::Ungrouped(span.start))?;
    let token = &text[span];
    let val = token.parse().map_err(|_| FormatError::Number {
        index: *n_vals,
        token: token.to_owned(),
    })?;
    vals.push(val);
    *n_vals += 1;
    Ok(())
}

/// Streaming reader over one output file.
pub struct SimReader<R> {
    reader: R,
    label: String,
    header: SimulationHeader,
    buf: String,
    line_num: usize,
    progress_count: usize,
    count_warned: bool,
}

impl SimReader<BufReader<File>> {
    /// Open a file and parse its header.
    pub fn open<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let label = file.display().to_string();
        let reader = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        Self::new(BufReader::new(reader), label)
    }
}

impl<R: BufRead> SimReader<R> {
    /// Wrap a reader, consuming and parsing the header line.
    pub fn new(mut reader: R, label: impl Into<String>) -> Result<Self> {
        let label = label.into();

        let mut buf = String::new();
        let n_bytes = reader
            .read_line(&mut buf)
            .with_context(|| format!("failed to read header of {label}"))?;
        let header = if n_bytes == 0 {
            Err(FormatError::MissingHeader)
        } else {
            SimulationHeader::parse(&buf)
        }
        .with_context(|| format!("invalid header in {label}"))?;

        Ok(Self {
            reader,
            label,
            header,
            buf,
            line_num: 1,
            progress_count: 0,
            count_warned: false,
        })
    }

    pub fn header(&self) -> &SimulationHeader {
        &self.header
    }

    /// Name used in messages, usually the file path.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of progress lines seen so far.
    pub fn progress_count(&self) -> usize {
        self.progress_count
    }

    /// Read and parse the next line, or `None` at end of file.
    pub fn next_line(&mut self) -> Result<Option<Line>> {
        self.buf.clear();
        let n_bytes = self
            .reader
            .read_line(&mut self.buf)
            .with_context(|| format!("failed to read {}", self.label))?;
        if n_bytes == 0 {
            return Ok(None);
        }
        self.line_num += 1;

        let line = Line::parse(&self.buf)
            .with_context(|| format!("invalid line {} of {}", self.line_num, self.label))?;

        match &line {
            Line::Progress(_) => self.progress_count += 1,
            Line::Timestep(birds) => self.check_bird_count(birds.len()),
        }

        Ok(Some(line))
    }

    /// Read the next timestep, echoing and skipping progress lines.
    pub fn next_timestep(&mut self) -> Result<Option<Vec<BirdState>>> {
        while let Some(line) = self.next_line()? {
            match line {
                Line::Progress(text) => log::info!("{text}"),
                Line::Timestep(birds) => return Ok(Some(birds)),
            }
        }
        Ok(None)
    }

    fn check_bird_count(&mut self, n_birds: usize) {
        if self.count_warned || self.header.is_count(n_birds) {
            return;
        }
        log::warn!(
            "line {} of {} has {n_birds} birds, but the header counts are {} and {}",
            self.line_num,
            self.label,
            self.header.timestep_count,
            self.header.bird_count
        );
        self.count_warned = true;
    }
}
