//! Conventional port parameter values for populating selection lists.
//!
//! Every list is static. Parity and stop-bit names are the lowercase names
//! `Parity` and `StopBits` parse from.

/// Commonly used baud rates. Most are divisions of a 1.8432 MHz UART clock.
pub const BAUD_RATES: &[&str] = &[
    "110", "300", "600", "1200", "2400", "4800", "9600", "14400", "19200", "28800", "38400",
    "56000", "57600", "115200", "128000", "153600", "230400", "256000", "460800", "921600",
    "1843200",
];

pub const STOP_BITS: &[&str] = &["none", "one", "onepointfive", "two"];

pub const PARITY_BITS: &[&str] = &["none", "odd", "even", "mark", "space"];

/// 7 for ASCII, 8 for everything else
pub const DATA_BITS: &[&str] = &["7", "8"];

/// Read-only access to the parameter lists.
pub struct ParameterCatalog;

impl ParameterCatalog {
    pub fn baud_rates() -> &'static [&'static str] {
        BAUD_RATES
    }

    pub fn stop_bits() -> &'static [&'static str] {
        STOP_BITS
    }

    pub fn parity_bits() -> &'static [&'static str] {
        PARITY_BITS
    }

    pub fn data_bits() -> &'static [&'static str] {
        DATA_BITS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Parity, StopBits};

    #[test]
    fn baud_rates_are_ascending_integers() {
        let rates: Vec<u32> = ParameterCatalog::baud_rates()
            .iter()
            .map(|r| r.parse().unwrap())
            .collect();
        assert_eq!(rates.len(), 21);
        assert_eq!(rates.first(), Some(&110));
        assert_eq!(rates.last(), Some(&1_843_200));
        assert!(rates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn parity_names_parse_strictly() {
        let parsed: Vec<Parity> = ParameterCatalog::parity_bits()
            .iter()
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(parsed, Parity::ALL.to_vec());
    }

    #[test]
    fn stop_bit_names_parse_strictly() {
        let parsed: Vec<StopBits> = ParameterCatalog::stop_bits()
            .iter()
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(parsed, StopBits::ALL.to_vec());
    }

    #[test]
    fn data_bits_are_seven_and_eight() {
        assert_eq!(ParameterCatalog::data_bits(), &["7", "8"]);
    }
}
