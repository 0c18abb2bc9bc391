//! Named intermediate activations of the backbone.

use core::{fmt, str::FromStr};

use burn::prelude::*;

use crate::error::BackboneError;

/// An activation kept for downstream heads.
///
/// Names follow the VGG-16 layer naming (`conv3_3` is the third convolution of
/// block 3) and stay the same when a block is built with fewer layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EndPoint {
    Conv1_2,
    Pool1,
    Conv2_2,
    Pool2,
    Conv3_3,
    Pool3,
    Conv4_3,
    Pool4,
    Conv5_3,
    Pool5,
    Fc6,
    Fc7,
}

impl EndPoint {
    /// All end points in the order the forward pass produces them.
    pub const ALL: [Self; 12] = [
        Self::Conv1_2,
        Self::Pool1,
        Self::Conv2_2,
        Self::Pool2,
        Self::Conv3_3,
        Self::Pool3,
        Self::Conv4_3,
        Self::Pool4,
        Self::Conv5_3,
        Self::Pool5,
        Self::Fc6,
        Self::Fc7,
    ];

    /// The layer name, e.g. `conv4_3`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Conv1_2 => "conv1_2",
            Self::Pool1 => "pool1",
            Self::Conv2_2 => "conv2_2",
            Self::Pool2 => "pool2",
            Self::Conv3_3 => "conv3_3",
            Self::Pool3 => "pool3",
            Self::Conv4_3 => "conv4_3",
            Self::Pool4 => "pool4",
            Self::Conv5_3 => "conv5_3",
            Self::Pool5 => "pool5",
            Self::Fc6 => "fc6",
            Self::Fc7 => "fc7",
        }
    }

    /// Zero-based VGG block (0..5) for conv and pool end points, `None` for `fc6`/`fc7`.
    pub const fn block(self) -> Option<usize> {
        match self {
            Self::Conv1_2 | Self::Pool1 => Some(0),
            Self::Conv2_2 | Self::Pool2 => Some(1),
            Self::Conv3_3 | Self::Pool3 => Some(2),
            Self::Conv4_3 | Self::Pool4 => Some(3),
            Self::Conv5_3 | Self::Pool5 => Some(4),
            Self::Fc6 | Self::Fc7 => None,
        }
    }

    /// The conv end point recorded at the end of `block`.
    pub(crate) const fn block_conv(block: usize) -> Self {
        Self::ALL[block * 2]
    }

    /// The pool end point recorded after `block`.
    pub(crate) const fn block_pool(block: usize) -> Self {
        Self::ALL[block * 2 + 1]
    }
}

impl fmt::Display for EndPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EndPoint {
    type Err = BackboneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|end_point| end_point.name() == s)
            .ok_or_else(|| BackboneError::UnknownEndPoint { name: s.to_owned() })
    }
}

/// Activations collected during a forward pass, in insertion order.
#[derive(Debug, Clone)]
pub struct EndPoints<B: Backend> {
    entries: Vec<(EndPoint, Tensor<B, 4>)>,
}

impl<B: Backend> Default for EndPoints<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> EndPoints<B> {
    /// Creates an empty collection.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Records `tensor` under `end_point`, replacing any earlier entry.
    pub fn insert(&mut self, end_point: EndPoint, tensor: Tensor<B, 4>) {
        match self.entries.iter_mut().find(|(key, _)| *key == end_point) {
            Some(entry) => entry.1 = tensor,
            None => self.entries.push((end_point, tensor)),
        }
    }

    pub fn get(&self, end_point: EndPoint) -> Option<&Tensor<B, 4>> {
        self.entries
            .iter()
            .find(|(key, _)| *key == end_point)
            .map(|(_, tensor)| tensor)
    }

    /// Looks an end point up by its layer name.
    pub fn get_by_name(&self, name: &str) -> Option<&Tensor<B, 4>> {
        name.parse().ok().and_then(|end_point| self.get(end_point))
    }

    pub fn iter(&self) -> impl Iterator<Item = (EndPoint, &Tensor<B, 4>)> {
        self.entries.iter().map(|(key, tensor)| (*key, tensor))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(key, _)| key.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_inner(self) -> Vec<(EndPoint, Tensor<B, 4>)> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::TestBackend;

    #[test]
    fn names_round_trip_through_from_str() {
        for end_point in EndPoint::ALL {
            assert_eq!(end_point.name().parse::<EndPoint>(), Ok(end_point));
            assert_eq!(end_point.to_string(), end_point.name());
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(
            "conv3_2".parse::<EndPoint>(),
            Err(BackboneError::UnknownEndPoint {
                name: "conv3_2".to_owned()
            })
        );
    }

    #[test]
    fn block_helpers_follow_forward_order() {
        assert_eq!(EndPoint::block_conv(2), EndPoint::Conv3_3);
        assert_eq!(EndPoint::block_pool(4), EndPoint::Pool5);
        assert_eq!(EndPoint::Pool4.block(), Some(3));
        assert_eq!(EndPoint::Fc7.block(), None);
    }

    #[test]
    fn insert_keeps_order_and_replaces_duplicates() {
        let device = Default::default();
        let mut end_points = EndPoints::<TestBackend>::new();
        end_points.insert(EndPoint::Conv1_2, Tensor::zeros([1, 1, 4, 4], &device));
        end_points.insert(EndPoint::Pool1, Tensor::zeros([1, 1, 2, 2], &device));
        end_points.insert(EndPoint::Conv1_2, Tensor::zeros([1, 2, 4, 4], &device));

        assert_eq!(end_points.len(), 2);
        assert_eq!(end_points.names(), vec!["conv1_2", "pool1"]);
        assert_eq!(
            end_points.get(EndPoint::Conv1_2).map(Tensor::dims),
            Some([1, 2, 4, 4])
        );
        assert_eq!(
            end_points.get_by_name("pool1").map(Tensor::dims),
            Some([1, 1, 2, 2])
        );
        assert!(end_points.get_by_name("fc9").is_none());
        assert!(end_points.get(EndPoint::Fc6).is_none());
    }
}
