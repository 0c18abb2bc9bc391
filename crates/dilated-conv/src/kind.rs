//! Dilated convolution variants.

use core::str::FromStr;

use burn::prelude::*;

use crate::error::DilatedConvError;

/// How the dilation of a [`DilatedConv2d`](crate::DilatedConv2d) is realised.
///
/// The decomposed and smoothed variants compute the same receptive field as
/// the regular atrous convolution, but operate on the `d * d` interleaved
/// sub-grids of the input explicitly so that information can flow between
/// them.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum DilatedConvType {
    /// Atrous convolution with holes between kernel taps.
    Regular,
    /// Space-to-batch, ordinary convolution, batch-to-space.
    Decomposed,
    /// Decomposed convolution followed by a learned mixing of the sub-grids
    /// (group interaction).
    SmoothedGi,
    /// Shared separable smoothing kernel applied before the atrous convolution.
    SmoothedSsc,
}

impl DilatedConvType {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Regular,
        Self::Decomposed,
        Self::SmoothedGi,
        Self::SmoothedSsc,
    ];

    /// Canonical short name of the variant.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Decomposed => "decompose",
            Self::SmoothedGi => "smooth_GI",
            Self::SmoothedSsc => "smooth_SSC",
        }
    }

    /// Whether the variant owns a smoothing parameter besides the kernel.
    pub const fn is_smoothed(&self) -> bool {
        matches!(self, Self::SmoothedGi | Self::SmoothedSsc)
    }

    const fn alias(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Decomposed => "decomposed",
            Self::SmoothedGi => "smoothed_gi",
            Self::SmoothedSsc => "smoothed_ssc",
        }
    }
}

impl FromStr for DilatedConvType {
    type Err = DilatedConvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.as_str().eq_ignore_ascii_case(name) || kind.alias().eq_ignore_ascii_case(name)
            })
            .ok_or_else(|| DilatedConvError::UnknownConvType {
                name: name.to_owned(),
                expected: Self::ALL
                    .iter()
                    .map(Self::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_names() {
        for kind in DilatedConvType::ALL {
            assert_eq!(kind.as_str().parse::<DilatedConvType>(), Ok(kind));
        }
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(
            "SMOOTH_ssc".parse::<DilatedConvType>(),
            Ok(DilatedConvType::SmoothedSsc)
        );
        assert_eq!(
            " decomposed ".parse::<DilatedConvType>(),
            Ok(DilatedConvType::Decomposed)
        );
        assert_eq!(
            "smoothed_gi".parse::<DilatedConvType>(),
            Ok(DilatedConvType::SmoothedGi)
        );
    }

    #[test]
    fn rejects_unknown_names() {
        match "atrous".parse::<DilatedConvType>() {
            Err(DilatedConvError::UnknownConvType { name, expected }) => {
                assert_eq!(name, "atrous");
                assert!(expected.contains("smooth_GI"));
            }
            other => panic!("Expected UnknownConvType error, got {other:?}"),
        }
    }

    #[test]
    fn only_smoothed_variants_report_smoothing() {
        assert!(!DilatedConvType::Regular.is_smoothed());
        assert!(!DilatedConvType::Decomposed.is_smoothed());
        assert!(DilatedConvType::SmoothedGi.is_smoothed());
        assert!(DilatedConvType::SmoothedSsc.is_smoothed());
    }
}
