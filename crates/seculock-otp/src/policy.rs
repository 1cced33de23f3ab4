//! OTP code space.

use rand::Rng;
use seculock_core::constants::{OTP_CODE_SPACE, OTP_NO_LEADING_ZERO_MIN};
use seculock_core::{OtpCode, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Which six-digit codes may be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePolicy {
    /// 000000 to 999999.
    #[default]
    FullRange,
    /// 100000 to 999999.
    NoLeadingZero,
}

impl CodePolicy {
    /// Numeric range codes are drawn from.
    pub fn range(&self) -> Range<u32> {
        match self {
            Self::FullRange => 0..OTP_CODE_SPACE,
            Self::NoLeadingZero => OTP_NO_LEADING_ZERO_MIN..OTP_CODE_SPACE,
        }
    }

    /// Draw a uniformly random code.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<OtpCode> {
        OtpCode::from_value(rng.gen_range(self.range()))
    }
}
