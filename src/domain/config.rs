//! Port configuration
//!
//! A `PortConfig` describes everything needed to open a serial port: the
//! device name plus the line settings (baud, data bits, parity, stop bits).
//! Parity and stop bits usually arrive as strings picked from a UI list, so
//! both enums parse from their lowercase names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{SerialError, SerialResult};

/// Parity scheme appended to each data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
    Mark,
    Space,
}

impl Parity {
    /// Every parity scheme, in catalog order
    pub const ALL: [Parity; 5] = [
        Parity::None,
        Parity::Odd,
        Parity::Even,
        Parity::Mark,
        Parity::Space,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Parity::None => "none",
            Parity::Even => "even",
            Parity::Odd => "odd",
            Parity::Mark => "mark",
            Parity::Space => "space",
        }
    }

    /// Single-letter code used in "8-N-1" style summaries
    pub fn code(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
            Parity::Mark => 'M',
            Parity::Space => 'S',
        }
    }

    /// Case-insensitive match; anything unrecognized becomes `Parity::None`.
    pub fn from_name_lenient(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::warn!("Unrecognized parity '{name}', falling back to none");
            Parity::None
        })
    }
}

impl FromStr for Parity {
    type Err = SerialError;

    fn from_str(s: &str) -> SerialResult<Self> {
        Parity::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SerialError::Configuration(format!("Unknown parity '{s}'")))
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Framing bits marking the end of each data unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    None,
    #[default]
    One,
    OnePointFive,
    Two,
}

impl StopBits {
    /// Every stop-bit setting, in catalog order
    pub const ALL: [StopBits; 4] = [
        StopBits::None,
        StopBits::One,
        StopBits::OnePointFive,
        StopBits::Two,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StopBits::None => "none",
            StopBits::One => "one",
            StopBits::OnePointFive => "onepointfive",
            StopBits::Two => "two",
        }
    }

    /// Short form used in "8-N-1" style summaries
    pub fn short(self) -> &'static str {
        match self {
            StopBits::None => "0",
            StopBits::One => "1",
            StopBits::OnePointFive => "1.5",
            StopBits::Two => "2",
        }
    }

    /// Case-insensitive match; anything unrecognized becomes `StopBits::One`.
    pub fn from_name_lenient(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::warn!("Unrecognized stop bits '{name}', falling back to one");
            StopBits::One
        })
    }
}

impl FromStr for StopBits {
    type Err = SerialError;

    fn from_str(s: &str) -> SerialResult<Self> {
        StopBits::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SerialError::Configuration(format!("Unknown stop bits '{s}'")))
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything needed to open one serial port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Platform device identifier, e.g. "COM5" or "/dev/ttyUSB0"
    pub port_name: String,
    /// Symbol rate in bits per second
    pub baud_rate: u32,
    pub parity: Parity,
    /// Bits per character, 5 through 8
    pub data_bits: u8,
    pub stop_bits: StopBits,
}

impl PortConfig {
    pub fn new(
        port_name: impl Into<String>,
        baud_rate: u32,
        parity: Parity,
        data_bits: u8,
        stop_bits: StopBits,
    ) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            parity,
            data_bits,
            stop_bits,
        }
    }

    /// Build a config from UI-style strings.
    ///
    /// Parity and stop bits are matched case-insensitively. An unrecognized
    /// parity silently becomes `None` and unrecognized stop bits become
    /// `One` (a warning is logged). Use [`PortConfig::parse_strict`] to get
    /// a `Configuration` error instead.
    pub fn from_names(
        port_name: impl Into<String>,
        baud_rate: u32,
        parity: &str,
        data_bits: u8,
        stop_bits: &str,
    ) -> Self {
        Self::new(
            port_name,
            baud_rate,
            Parity::from_name_lenient(parity),
            data_bits,
            StopBits::from_name_lenient(stop_bits),
        )
    }

    /// Like [`PortConfig::from_names`] but rejects unknown names and
    /// validates the result.
    pub fn parse_strict(
        port_name: impl Into<String>,
        baud_rate: u32,
        parity: &str,
        data_bits: u8,
        stop_bits: &str,
    ) -> SerialResult<Self> {
        let config = Self::new(
            port_name,
            baud_rate,
            parity.parse()?,
            data_bits,
            stop_bits.parse()?,
        );
        config.validate()?;
        Ok(config)
    }

    /// Check the settings every backend needs.
    pub fn validate(&self) -> SerialResult<()> {
        if self.port_name.trim().is_empty() {
            return Err(SerialError::Configuration(
                "Port name cannot be empty".to_string(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(SerialError::Configuration(
                "Baud rate must be positive".to_string(),
            ));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(SerialError::Configuration(format!(
                "Data bits must be between 5 and 8, got {}",
                self.data_bits
            )));
        }
        Ok(())
    }
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: 9600,
            parity: Parity::None,
            data_bits: 8,
            stop_bits: StopBits::One,
        }
    }
}

impl fmt::Display for PortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}-{}-{}",
            self.port_name,
            self.baud_rate,
            self.data_bits,
            self.parity.code(),
            self.stop_bits.short()
        )
    }
}
