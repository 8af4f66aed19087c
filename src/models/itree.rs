use rand::rngs::StdRng;
use rand::Rng;

use crate::utils::window_stats::DEGENERATE_SPREAD;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average path length of an unsuccessful BST search among `n` points; the
/// normaliser for isolation depths.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A single isolation tree over scalar observations.
pub struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    /// Grow a tree on `sample`, stopping at `height_limit`.
    pub fn fit(sample: &[f64], height_limit: usize, rng: &mut StdRng) -> Self {
        IsolationTree {
            root: Self::build(sample.to_vec(), 0, height_limit, rng),
        }
    }

    fn build(data: Vec<f64>, height: usize, height_limit: usize, rng: &mut StdRng) -> Node {
        let size = data.len();
        if size <= 1 || height >= height_limit {
            return Node::Leaf { size };
        }

        let (min_val, max_val) = data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if max_val - min_val < DEGENERATE_SPREAD {
            return Node::Leaf { size };
        }

        let split_value = rng.gen::<f64>() * (max_val - min_val) + min_val;
        let (left, right): (Vec<f64>, Vec<f64>) =
            data.into_iter().partition(|&v| v < split_value);

        // A split exactly on the minimum isolates nothing.
        if left.is_empty() || right.is_empty() {
            return Node::Leaf { size };
        }

        Node::Split {
            value: split_value,
            left: Box::new(Self::build(left, height + 1, height_limit, rng)),
            right: Box::new(Self::build(right, height + 1, height_limit, rng)),
        }
    }

    /// Depth at which `x` lands, plus the expected remaining depth of the
    /// leaf it lands in.
    pub fn path_length(&self, x: f64) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                Node::Leaf { size } => return depth as f64 + average_path_length(*size),
                Node::Split { value, left, right } => {
                    node = if x < *value { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}
