//! TON account address codec.
//!
//! Handles the raw `<workchain>:<hex>` form and the 48-character
//! user-friendly form: `flags | workchain | 32-byte account | crc16`,
//! base64 encoded (standard or URL-safe alphabet).

use base64::Engine;
use crc::Crc;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const CRC16: Crc<u16> = Crc::<u16>::new(&crc::CRC_16_XMODEM);

const BOUNCEABLE: u8 = 0x11;
const NON_BOUNCEABLE: u8 = 0x51;
const TEST_ONLY: u8 = 0x80;

/// Decoded length of a user-friendly address.
const FRIENDLY_LEN: usize = 36;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid raw address '{0}'")]
    InvalidRaw(String),
    #[error("invalid base64 in address '{0}'")]
    InvalidBase64(String),
    #[error("invalid address length, expected {FRIENDLY_LEN} bytes got {0}")]
    InvalidLength(usize),
    #[error("unknown address flags 0x{0:02x}")]
    UnknownFlags(u8),
    #[error("address checksum mismatch (expected {expected:04x}, got {actual:04x})")]
    ChecksumMismatch { expected: u16, actual: u16 },
}

/// A TON account address independent of its textual spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TonAddress {
    pub workchain: i32,
    pub account: [u8; 32],
    /// Flags as parsed, when the input was user-friendly.
    bounceable: Option<bool>,
    test_only: Option<bool>,
}

impl TonAddress {
    pub fn new(workchain: i32, account: [u8; 32]) -> Self {
        Self {
            workchain,
            account,
            bounceable: None,
            test_only: None,
        }
    }

    /// Whether the parsed input was bounceable. Raw addresses report `None`.
    pub fn is_bounceable(&self) -> Option<bool> {
        self.bounceable
    }

    pub fn is_test_only(&self) -> Option<bool> {
        self.test_only
    }

    pub fn to_raw_string(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.account))
    }

    pub fn to_user_friendly(&self, bounceable: bool, url_safe: bool, test_only: bool) -> String {
        let mut flags = if bounceable { BOUNCEABLE } else { NON_BOUNCEABLE };
        if test_only {
            flags |= TEST_ONLY;
        }

        let mut buf = Vec::with_capacity(FRIENDLY_LEN);
        buf.push(flags);
        // Workchain is serialized as a signed byte.
        buf.push(self.workchain as i8 as u8);
        buf.extend_from_slice(&self.account);
        buf.extend_from_slice(&CRC16.checksum(&buf).to_be_bytes());

        if url_safe {
            base64::engine::general_purpose::URL_SAFE.encode(buf)
        } else {
            base64::engine::general_purpose::STANDARD.encode(buf)
        }
    }

    /// Bounceable, URL-safe, mainnet: the form TON Whales links expect.
    pub fn basic_workchain_address(&self) -> String {
        self.to_user_friendly(true, true, false)
    }

    /// The labelled spellings shown by the `address` command.
    pub fn variations(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "User-friendly, Bounceable, URL-safe, Not test-only",
                self.to_user_friendly(true, true, false),
            ),
            (
                "User-friendly, Bounceable, Not URL-safe, Not test-only",
                self.to_user_friendly(true, false, false),
            ),
            (
                "User-friendly, Not Bounceable, URL-safe, Not test-only",
                self.to_user_friendly(false, true, false),
            ),
            (
                "User-friendly, Bounceable, URL-safe, Test-only",
                self.to_user_friendly(true, true, true),
            ),
            (
                "User-friendly, Not Bounceable, URL-safe, Test-only",
                self.to_user_friendly(false, true, true),
            ),
        ]
    }

    fn parse_raw(s: &str) -> Result<Self, AddressError> {
        let invalid = || AddressError::InvalidRaw(s.to_string());
        let (wc, hex_part) = s.split_once(':').ok_or_else(invalid)?;
        // The user-friendly form stores the workchain in one signed byte.
        let workchain: i8 = wc.parse().map_err(|_| invalid())?;
        let mut account = [0u8; 32];
        hex::decode_to_slice(hex_part, &mut account).map_err(|_| invalid())?;
        Ok(Self::new(i32::from(workchain), account))
    }

    fn parse_friendly(s: &str) -> Result<Self, AddressError> {
        let standard = s.replace('-', "+").replace('_', "/");
        let data = base64::engine::general_purpose::STANDARD
            .decode(&standard)
            .map_err(|_| AddressError::InvalidBase64(s.to_string()))?;

        if data.len() != FRIENDLY_LEN {
            return Err(AddressError::InvalidLength(data.len()));
        }

        let expected = CRC16.checksum(&data[..34]);
        let actual = u16::from_be_bytes([data[34], data[35]]);
        if expected != actual {
            return Err(AddressError::ChecksumMismatch { expected, actual });
        }

        let flags = data[0];
        let test_only = flags & TEST_ONLY != 0;
        let bounceable = match flags & !TEST_ONLY {
            BOUNCEABLE => true,
            NON_BOUNCEABLE => false,
            _ => return Err(AddressError::UnknownFlags(flags)),
        };

        let mut account = [0u8; 32];
        account.copy_from_slice(&data[2..34]);

        Ok(Self {
            workchain: data[1] as i8 as i32,
            account,
            bounceable: Some(bounceable),
            test_only: Some(test_only),
        })
    }
}

impl FromStr for TonAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(':') {
            Self::parse_raw(s)
        } else {
            Self::parse_friendly(s)
        }
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.bounceable, self.test_only) {
            (Some(b), Some(t)) => f.write_str(&self.to_user_friendly(b, true, t)),
            _ => f.write_str(&self.to_raw_string()),
        }
    }
}

impl Serialize for TonAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TonAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
