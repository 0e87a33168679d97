//! Graph-convolutional embedding model for the allocation pipeline.
//!
//! Maps the weighted feature matrix plus the relationship edge set into a
//! fixed-width embedding per student. Two [`GcnConv`] layers with a ReLU
//! between them aggregate each node's features with its neighbors' under
//! self-loop-augmented symmetric normalization:
//!
//! ```text
//! h' = D^{-1/2} (A + I) D^{-1/2} h W^T + b
//! ```
//!
//! When any nonzero-weight edge exists, the encoder is trained to minimize
//! the affinity objective — the mean over weighted edges of
//! `weight × ‖z_src − z_tgt‖₂` — so positive (friend) weights pull linked
//! embeddings together and negative (conflict) weights push them apart.
//! Optimization is a fixed budget of Adam steps with no early stopping: the
//! model deliberately overfits the single batch, since embeddings are
//! consumed once and discarded.
//!
//! Signed edge weights enter only the loss; structural aggregation treats
//! every edge as an unweighted, undirected link.
//!
//! # References
//!
//! - Kipf, T. N., & Welling, M. (2017). Semi-Supervised Classification with
//!   Graph Convolutional Networks. ICLR.
//! - Kingma, D. P., & Ba, J. (2015). Adam: A method for stochastic
//!   optimization. ICLR.

use crate::graph::RelationshipEdge;
use crate::optim::Adam;
use crate::primitives::{Matrix, Vector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Whether the encoder trains on the affinity objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingMode {
    /// Train whenever at least one nonzero-weight edge exists (default).
    Affinity,
    /// Never train; embeddings come from the freshly initialized model.
    Frozen,
}

impl Default for TrainingMode {
    fn default() -> Self {
        TrainingMode::Affinity
    }
}

/// A single graph-convolution layer.
///
/// Holds a `[out, in]` weight matrix (Xavier-uniform initialized) and a
/// zero-initialized bias. The layer applies the affine transform to
/// already-aggregated node features.
#[derive(Debug, Clone)]
pub struct GcnConv {
    /// Weight matrix, row-major `[out_features, in_features]`
    weight: Vec<f32>,
    /// Bias vector, `[out_features]`
    bias: Vec<f32>,
    in_features: usize,
    out_features: usize,
}

impl GcnConv {
    /// Creates a layer with Xavier-uniform weights drawn from `rng`.
    fn new(in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        let bound = (6.0 / (in_features + out_features) as f32).sqrt();
        let weight = (0..out_features * in_features)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();

        Self {
            weight,
            bias: vec![0.0; out_features],
            in_features,
            out_features,
        }
    }

    /// Affine transform of aggregated features: `z = agg W^T + b`.
    fn affine(&self, aggregated: &[f32], num_nodes: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; num_nodes * self.out_features];
        for i in 0..num_nodes {
            for o in 0..self.out_features {
                let mut sum = self.bias[o];
                for k in 0..self.in_features {
                    sum += aggregated[i * self.in_features + k] * self.weight[o * self.in_features + k];
                }
                out[i * self.out_features + o] = sum;
            }
        }
        out
    }

    /// Get input feature dimension.
    #[must_use]
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Get output feature dimension.
    #[must_use]
    pub fn out_features(&self) -> usize {
        self.out_features
    }
}

/// Per-node `1/√degree` factors, with self-loops counted.
fn degree_norm(num_nodes: usize, edges: &[RelationshipEdge]) -> Vec<f32> {
    // Self-loop contributes 1 to every degree.
    let mut degrees = vec![1.0f32; num_nodes];
    for edge in edges {
        degrees[edge.source] += 1.0;
        degrees[edge.target] += 1.0;
    }
    degrees.iter().map(|&d| 1.0 / d.sqrt().max(1e-6)).collect()
}

/// Symmetric-normalized aggregation: `out = D^{-1/2} (A + I) D^{-1/2} x`.
///
/// Edges are treated as undirected; the operator is symmetric, so it is its
/// own transpose for the backward pass.
fn aggregate(
    features: &[f32],
    num_nodes: usize,
    dim: usize,
    edges: &[RelationshipEdge],
    norm: &[f32],
) -> Vec<f32> {
    let mut out = vec![0.0f32; num_nodes * dim];

    for i in 0..num_nodes {
        let norm_ii = norm[i] * norm[i];
        for f in 0..dim {
            out[i * dim + f] += norm_ii * features[i * dim + f];
        }
    }

    for edge in edges {
        let (src, tgt) = (edge.source, edge.target);
        let coeff = norm[src] * norm[tgt];
        for f in 0..dim {
            out[tgt * dim + f] += coeff * features[src * dim + f];
            out[src * dim + f] += coeff * features[tgt * dim + f];
        }
    }

    out
}

/// Cached intermediates of one forward pass, kept for the backward pass.
///
/// The ReLU output itself is not cached; the backward pass recovers the
/// gate from the layer-1 pre-activation.
struct ForwardPass {
    /// Aggregated input, `[n, in]`
    a1: Vec<f32>,
    /// Pre-activation of layer 1, `[n, hidden]`
    z1: Vec<f32>,
    /// Aggregated hidden features, `[n, hidden]`
    a2: Vec<f32>,
    /// Embeddings, `[n, out]`
    z2: Vec<f32>,
}

/// Two-layer GCN encoder (input → hidden → embedding).
///
/// One fresh instance per allocation run; there is no persistence and no
/// incremental training.
#[derive(Debug, Clone)]
pub struct GcnEncoder {
    conv1: GcnConv,
    conv2: GcnConv,
}

impl GcnEncoder {
    /// Creates an encoder with freshly initialized layers.
    ///
    /// With `seed: Some(_)` both layers draw their weights from the same
    /// seeded generator, making the whole run reproducible; `None` draws
    /// from entropy.
    #[must_use]
    pub fn new(
        in_features: usize,
        hidden_features: usize,
        out_features: usize,
        seed: Option<u64>,
    ) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self {
            conv1: GcnConv::new(in_features, hidden_features, &mut rng),
            conv2: GcnConv::new(hidden_features, out_features, &mut rng),
        }
    }

    /// Input feature dimension.
    #[must_use]
    pub fn in_features(&self) -> usize {
        self.conv1.in_features()
    }

    /// Embedding dimension.
    #[must_use]
    pub fn embed_dim(&self) -> usize {
        self.conv2.out_features()
    }

    fn forward(
        &self,
        x: &[f32],
        num_nodes: usize,
        edges: &[RelationshipEdge],
        norm: &[f32],
    ) -> ForwardPass {
        let a1 = aggregate(x, num_nodes, self.conv1.in_features(), edges, norm);
        let z1 = self.conv1.affine(&a1, num_nodes);
        let h1: Vec<f32> = z1.iter().map(|&v| v.max(0.0)).collect();
        let a2 = aggregate(&h1, num_nodes, self.conv2.in_features(), edges, norm);
        let z2 = self.conv2.affine(&a2, num_nodes);

        ForwardPass { a1, z1, a2, z2 }
    }

    /// Computes embeddings for the batch.
    ///
    /// # Panics
    ///
    /// Panics if the feature width doesn't match the encoder's input width.
    #[must_use]
    pub fn embed(&self, x: &Matrix<f32>, edges: &[RelationshipEdge]) -> Matrix<f32> {
        let (num_nodes, in_features) = x.shape();
        assert_eq!(
            in_features,
            self.conv1.in_features(),
            "Expected {} input features, got {}",
            self.conv1.in_features(),
            in_features
        );

        let norm = degree_norm(num_nodes, edges);
        let fwd = self.forward(x.as_slice(), num_nodes, edges, &norm);

        Matrix::from_vec(num_nodes, self.conv2.out_features(), fwd.z2)
            .expect("Internal error: embedding matrix creation failed")
    }

    /// Trains on the affinity objective for a fixed budget of Adam steps.
    ///
    /// Zero-weight edges still shape the aggregation but contribute no loss
    /// term. With no nonzero-weight edge at all there is nothing to
    /// optimize: the loop is skipped entirely (no parameter would ever
    /// change under a constant-zero loss) and 0.0 is returned. Otherwise
    /// returns the final loss.
    pub fn train(
        &mut self,
        x: &Matrix<f32>,
        edges: &[RelationshipEdge],
        learning_rate: f32,
        epochs: usize,
    ) -> f32 {
        let trainable: Vec<RelationshipEdge> = edges
            .iter()
            .copied()
            .filter(|e| e.weight != 0.0)
            .collect();
        if trainable.is_empty() {
            return 0.0;
        }

        let (num_nodes, _) = x.shape();
        let norm = degree_norm(num_nodes, edges);
        let mut optimizer = Adam::new(learning_rate);
        let mut last_loss = 0.0;

        for _ in 0..epochs {
            let fwd = self.forward(x.as_slice(), num_nodes, edges, &norm);
            let (loss, grad_z2) =
                affinity_loss(&fwd.z2, self.conv2.out_features(), &trainable);
            last_loss = loss;

            let gradients = self.backward(&fwd, num_nodes, edges, &norm, &grad_z2);
            let mut params = self.pack_params();
            optimizer.step(&mut params, &gradients);
            self.unpack_params(params.as_slice());
        }

        tracing::debug!(loss = last_loss, edges = trainable.len(), "embedding training finished");

        last_loss
    }

    /// Backpropagates the embedding gradient through both layers.
    ///
    /// Layout matches [`Self::pack_params`]: w1, b1, w2, b2.
    fn backward(
        &self,
        fwd: &ForwardPass,
        num_nodes: usize,
        edges: &[RelationshipEdge],
        norm: &[f32],
        grad_z2: &[f32],
    ) -> Vector<f32> {
        let in_f = self.conv1.in_features();
        let hidden = self.conv1.out_features();
        let out = self.conv2.out_features();

        // Layer 2: dW2[o][k] = Σ_i dZ2[i][o] · A2[i][k], db2[o] = Σ_i dZ2[i][o]
        let mut d_w2 = vec![0.0f32; out * hidden];
        let mut d_b2 = vec![0.0f32; out];
        for i in 0..num_nodes {
            for o in 0..out {
                let g = grad_z2[i * out + o];
                if g == 0.0 {
                    continue;
                }
                d_b2[o] += g;
                for k in 0..hidden {
                    d_w2[o * hidden + k] += g * fwd.a2[i * hidden + k];
                }
            }
        }

        // dA2[i][k] = Σ_o dZ2[i][o] · W2[o][k]
        let mut d_a2 = vec![0.0f32; num_nodes * hidden];
        for i in 0..num_nodes {
            for o in 0..out {
                let g = grad_z2[i * out + o];
                if g == 0.0 {
                    continue;
                }
                for k in 0..hidden {
                    d_a2[i * hidden + k] += g * self.conv2.weight[o * hidden + k];
                }
            }
        }

        // The aggregation operator is symmetric, so dH1 = Â · dA2.
        let d_h1 = aggregate(&d_a2, num_nodes, hidden, edges, norm);

        // ReLU gate
        let mut d_z1 = d_h1;
        for (dz, &z) in d_z1.iter_mut().zip(fwd.z1.iter()) {
            if z <= 0.0 {
                *dz = 0.0;
            }
        }

        // Layer 1
        let mut d_w1 = vec![0.0f32; hidden * in_f];
        let mut d_b1 = vec![0.0f32; hidden];
        for i in 0..num_nodes {
            for o in 0..hidden {
                let g = d_z1[i * hidden + o];
                if g == 0.0 {
                    continue;
                }
                d_b1[o] += g;
                for k in 0..in_f {
                    d_w1[o * in_f + k] += g * fwd.a1[i * in_f + k];
                }
            }
        }

        let mut flat =
            Vec::with_capacity(d_w1.len() + d_b1.len() + d_w2.len() + d_b2.len());
        flat.extend_from_slice(&d_w1);
        flat.extend_from_slice(&d_b1);
        flat.extend_from_slice(&d_w2);
        flat.extend_from_slice(&d_b2);

        Vector::from_vec(flat)
    }

    /// Flattens all parameters in the order w1, b1, w2, b2.
    fn pack_params(&self) -> Vector<f32> {
        let mut flat = Vec::with_capacity(
            self.conv1.weight.len()
                + self.conv1.bias.len()
                + self.conv2.weight.len()
                + self.conv2.bias.len(),
        );
        flat.extend_from_slice(&self.conv1.weight);
        flat.extend_from_slice(&self.conv1.bias);
        flat.extend_from_slice(&self.conv2.weight);
        flat.extend_from_slice(&self.conv2.bias);
        Vector::from_vec(flat)
    }

    /// Restores parameters from the flat layout of [`Self::pack_params`].
    fn unpack_params(&mut self, flat: &[f32]) {
        let mut offset = 0;
        for block in [
            &mut self.conv1.weight,
            &mut self.conv1.bias,
            &mut self.conv2.weight,
            &mut self.conv2.bias,
        ] {
            let len = block.len();
            block.copy_from_slice(&flat[offset..offset + len]);
            offset += len;
        }
    }

    /// Total number of trainable parameters.
    #[must_use]
    pub fn num_parameters(&self) -> usize {
        self.conv1.weight.len()
            + self.conv1.bias.len()
            + self.conv2.weight.len()
            + self.conv2.bias.len()
    }
}

/// Affinity loss and its gradient with respect to the embeddings.
///
/// `L = mean_e w_e · ‖z_src − z_tgt‖₂` over the given (nonzero-weight)
/// edges. Coincident endpoints contribute their (zero) loss term but no
/// gradient, since the distance is not differentiable at zero.
fn affinity_loss(z: &[f32], dim: usize, edges: &[RelationshipEdge]) -> (f32, Vec<f32>) {
    let count = edges.len() as f32;
    let mut grad = vec![0.0f32; z.len()];
    let mut total = 0.0f32;

    for edge in edges {
        let (src, tgt) = (edge.source, edge.target);

        let mut dist_sq = 0.0f32;
        for f in 0..dim {
            let d = z[src * dim + f] - z[tgt * dim + f];
            dist_sq += d * d;
        }
        let dist = dist_sq.sqrt();
        total += edge.weight * dist;

        if dist > 1e-8 {
            let scale = edge.weight / (count * dist);
            for f in 0..dim {
                let d = z[src * dim + f] - z[tgt * dim + f];
                grad[src * dim + f] += scale * d;
                grad[tgt * dim + f] -= scale * d;
            }
        }
    }

    (total / count, grad)
}
