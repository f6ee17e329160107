// src/types.rs
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported CryptoNight protocol variants
///
/// Each variant fixes the scratchpad size and the number of mixing
/// iterations; everything else about the hash is shared.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum Variant {
    /// Original CryptoNight (2 MiB scratchpad, 2^19 mixing iterations)
    #[value(name = "cryptonight")]
    #[serde(rename = "cryptonight")]
    CryptoNight,

    /// CryptoNight-Light (1 MiB scratchpad, 2^18 mixing iterations)
    ///
    /// Half the memory and work of the original, used by lighter chains.
    #[value(name = "cryptonight-light")]
    #[serde(rename = "cryptonight-light")]
    CryptoNightLight,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::CryptoNight => write!(f, "cryptonight"),
            Variant::CryptoNightLight => write!(f, "cryptonight-light"),
        }
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cn" | "cryptonight" => Ok(Variant::CryptoNight),
            "cn-lite" | "cn-light" | "cryptonight-lite" | "cryptonight-light" => {
                Ok(Variant::CryptoNightLight)
            }
            _ => Err(format!("Unknown variant: {}", s)),
        }
    }
}

/// Requested AES round implementation
///
/// `Auto` probes the CPU once at startup. Every choice yields identical
/// digests; only throughput differs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AesBackend {
    /// Use AES instructions when the CPU has them
    #[default]
    Auto,
    /// Prefer AES instructions, falling back with a warning
    Hardware,
    /// Always use the software round
    Portable,
}

impl fmt::Display for AesBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AesBackend::Auto => write!(f, "auto"),
            AesBackend::Hardware => write!(f, "hardware"),
            AesBackend::Portable => write!(f, "portable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_aliases_parse() {
        assert_eq!("cn".parse::<Variant>(), Ok(Variant::CryptoNight));
        assert_eq!("CryptoNight-Lite".parse::<Variant>(), Ok(Variant::CryptoNightLight));
        assert!("randomx".parse::<Variant>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for variant in [Variant::CryptoNight, Variant::CryptoNightLight] {
            assert_eq!(variant.to_string().parse::<Variant>(), Ok(variant));
        }
    }
}
