// ============================================================
// Layer 5 — Doc2Vec Networks (Burn)
// ============================================================
// The two network topologies and the wrapper that exposes them
// through the EmbeddingModel contract.
//
// DM (distributed memory):
//   contexts [b, 2w] ─ word_embedding ─ mean ─┐
//                                             ├─ cat [b, 2d] ─ hidden (tanh) [b, d] ─ output [b, vocab]
//   doc_ids  [b, 1]  ─ doc_embedding ─────────┘
//
// DBOW (distributed bag of words):
//   doc_ids  [b, 1]  ─ doc_embedding [b, d] ─ output [b, vocab]
//
// Both are trained with cross-entropy against the target word
// id and the Adam optimiser.
//
// Freezing a layer clears `require_grad` on its parameters, so
// the optimiser never receives gradients for it.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    module::{AutodiffModule, Param},
    nn::{loss::CrossEntropyLossConfig, Embedding, EmbeddingConfig, Linear, LinearConfig},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder},
    tensor::{activation, backend::AutodiffBackend, ElementConversion},
};

use crate::data::batcher::{DbowBatch, DmBatch};
use crate::domain::traits::EmbeddingModel;
use crate::domain::variant::{LayerRole, ModelVariant};
use crate::infra::checkpoint;

pub const DEFAULT_WINDOW_SIZE: usize = 5;
pub const DEFAULT_EMBEDDING_SIZE: usize = 100;

/// Full-precision named MessagePack, gzip compressed.
type ModelRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct Doc2VecConfig {
    pub variant:     ModelVariant,
    /// Output width, including the unknown id
    pub vocab_size:  usize,
    /// Rows of the document-embedding table
    pub num_docs:    usize,
    pub window_size: usize,
    #[config(default = 100)]
    pub embedding_size: usize,
    #[config(default = 1e-3)]
    pub learning_rate: f64,
}

impl Doc2VecConfig {
    /// True when two configs describe the same topology.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.variant == other.variant
            && self.vocab_size == other.vocab_size
            && self.num_docs == other.num_docs
            && self.window_size == other.window_size
            && self.embedding_size == other.embedding_size
    }
}

/// A detached copy of one layer's parameters.
#[derive(Debug, Clone)]
pub struct LayerWeights<B: Backend> {
    pub weight: Tensor<B, 2>,
    pub bias:   Option<Tensor<B, 1>>,
}

impl<B: Backend> LayerWeights<B> {
    /// Flattened weight values, for comparisons and export.
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        tensor_values(self.weight.clone())
    }
}

/// What the wrapper needs from a concrete network.
pub trait Doc2VecNet<B: AutodiffBackend>: AutodiffModule<B> + 'static {
    const VARIANT: ModelVariant;

    type Batch;

    fn init(config: &Doc2VecConfig, device: &B::Device) -> Self;

    fn forward_loss(&self, batch: &Self::Batch, device: &B::Device) -> Tensor<B, 1>;

    fn layer(&self, role: LayerRole) -> Option<LayerWeights<B>>;

    fn with_layer(self, role: LayerRole, weights: LayerWeights<B>) -> Result<Self>;

    fn frozen(self, role: LayerRole) -> Self;

    /// The document-embedding table, `[num_docs, d]`
    fn doc_embeddings(&self) -> Tensor<B, 2>;
}

// ─── DM network ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DmNet<B: Backend> {
    pub word_embedding: Embedding<B>,
    pub doc_embedding:  Embedding<B>,
    pub hidden:         Linear<B>,
    pub output:         Linear<B>,
}

impl<B: Backend> DmNet<B> {
    /// contexts: [batch, 2w], doc_ids: [batch, 1] → logits: [batch, vocab]
    pub fn forward(&self, contexts: Tensor<B, 2, Int>, doc_ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch, _] = contexts.dims();

        let words = self.word_embedding.forward(contexts).mean_dim(1); // [b, 1, d]
        let docs  = self.doc_embedding.forward(doc_ids);               // [b, 1, d]

        let x = Tensor::cat(vec![docs, words], 2);
        let [_, _, width] = x.dims();
        let x = x.reshape([batch, width]);

        let x = activation::tanh(self.hidden.forward(x));
        self.output.forward(x)
    }
}

impl<B: AutodiffBackend> Doc2VecNet<B> for DmNet<B> {
    const VARIANT: ModelVariant = ModelVariant::Dm;

    type Batch = DmBatch;

    fn init(config: &Doc2VecConfig, device: &B::Device) -> Self {
        let d = config.embedding_size;
        Self {
            word_embedding: EmbeddingConfig::new(config.vocab_size, d).init(device),
            doc_embedding:  EmbeddingConfig::new(config.num_docs, d).init(device),
            hidden:         LinearConfig::new(2 * d, d).init(device),
            output:         LinearConfig::new(d, config.vocab_size).init(device),
        }
    }

    fn forward_loss(&self, batch: &DmBatch, device: &B::Device) -> Tensor<B, 1> {
        let n = batch.len();
        let contexts = int_tensor::<B, 2>(&batch.contexts, [n, batch.context_len], device);
        let doc_ids  = int_tensor::<B, 2>(&batch.doc_ids, [n, 1], device);
        let targets  = int_tensor::<B, 1>(&batch.targets, [n], device);

        let logits = self.forward(contexts, doc_ids);
        CrossEntropyLossConfig::new().init(device).forward(logits, targets)
    }

    fn layer(&self, role: LayerRole) -> Option<LayerWeights<B>> {
        match role {
            LayerRole::WordEmbedding => Some(embedding_weights(&self.word_embedding)),
            LayerRole::DocEmbedding  => Some(embedding_weights(&self.doc_embedding)),
            LayerRole::HiddenLayer   => Some(linear_weights(&self.hidden)),
            LayerRole::OutputLayer   => Some(linear_weights(&self.output)),
        }
    }

    fn with_layer(mut self, role: LayerRole, weights: LayerWeights<B>) -> Result<Self> {
        match role {
            LayerRole::WordEmbedding => self.word_embedding = set_embedding(self.word_embedding, weights)?,
            LayerRole::DocEmbedding  => self.doc_embedding  = set_embedding(self.doc_embedding, weights)?,
            LayerRole::HiddenLayer   => self.hidden = set_linear(self.hidden, weights)?,
            LayerRole::OutputLayer   => self.output = set_linear(self.output, weights)?,
        }
        Ok(self)
    }

    fn frozen(mut self, role: LayerRole) -> Self {
        match role {
            LayerRole::WordEmbedding => self.word_embedding = self.word_embedding.no_grad(),
            LayerRole::DocEmbedding  => self.doc_embedding  = self.doc_embedding.no_grad(),
            LayerRole::HiddenLayer   => self.hidden = self.hidden.no_grad(),
            LayerRole::OutputLayer   => self.output = self.output.no_grad(),
        }
        self
    }

    fn doc_embeddings(&self) -> Tensor<B, 2> {
        self.doc_embedding.weight.val()
    }
}

// ─── DBOW network ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DbowNet<B: Backend> {
    pub doc_embedding: Embedding<B>,
    pub output:        Linear<B>,
}

impl<B: Backend> DbowNet<B> {
    /// doc_ids: [batch, 1] → logits: [batch, vocab]
    pub fn forward(&self, doc_ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch, _] = doc_ids.dims();
        let docs = self.doc_embedding.forward(doc_ids);
        let [_, _, d] = docs.dims();
        self.output.forward(docs.reshape([batch, d]))
    }
}

impl<B: AutodiffBackend> Doc2VecNet<B> for DbowNet<B> {
    const VARIANT: ModelVariant = ModelVariant::Dbow;

    type Batch = DbowBatch;

    fn init(config: &Doc2VecConfig, device: &B::Device) -> Self {
        let d = config.embedding_size;
        Self {
            doc_embedding: EmbeddingConfig::new(config.num_docs, d).init(device),
            output:        LinearConfig::new(d, config.vocab_size).init(device),
        }
    }

    fn forward_loss(&self, batch: &DbowBatch, device: &B::Device) -> Tensor<B, 1> {
        let n = batch.len();
        let doc_ids = int_tensor::<B, 2>(&batch.doc_ids, [n, 1], device);
        let targets = int_tensor::<B, 1>(&batch.targets, [n], device);

        let logits = self.forward(doc_ids);
        CrossEntropyLossConfig::new().init(device).forward(logits, targets)
    }

    fn layer(&self, role: LayerRole) -> Option<LayerWeights<B>> {
        match role {
            LayerRole::DocEmbedding => Some(embedding_weights(&self.doc_embedding)),
            LayerRole::OutputLayer  => Some(linear_weights(&self.output)),
            _ => None,
        }
    }

    fn with_layer(mut self, role: LayerRole, weights: LayerWeights<B>) -> Result<Self> {
        match role {
            LayerRole::DocEmbedding => self.doc_embedding = set_embedding(self.doc_embedding, weights)?,
            LayerRole::OutputLayer  => self.output = set_linear(self.output, weights)?,
            other => bail!("dbow model has no {other} layer"),
        }
        Ok(self)
    }

    fn frozen(mut self, role: LayerRole) -> Self {
        match role {
            LayerRole::DocEmbedding => self.doc_embedding = self.doc_embedding.no_grad(),
            LayerRole::OutputLayer  => self.output = self.output.no_grad(),
            _ => {}
        }
        self
    }

    fn doc_embeddings(&self) -> Tensor<B, 2> {
        self.doc_embedding.weight.val()
    }
}

// ─── Doc2VecModel ─────────────────────────────────────────────────────────────
type StepFn<N> = Box<dyn FnMut(f64, N, GradientsParams) -> N>;

/// A network plus its optimiser, device and freeze state.
pub struct Doc2VecModel<B: AutodiffBackend, N> {
    config: Doc2VecConfig,
    net:    N,
    device: B::Device,
    /// Set by `compile`
    step:   Option<StepFn<N>>,
    frozen: Vec<LayerRole>,
}

pub type DmModel<B>   = Doc2VecModel<B, DmNet<B>>;
pub type DbowModel<B> = Doc2VecModel<B, DbowNet<B>>;

impl<B: AutodiffBackend, N: Doc2VecNet<B>> Doc2VecModel<B, N> {
    /// Build a freshly initialised model.
    pub fn new(config: Doc2VecConfig, device: &B::Device) -> Result<Self> {
        if config.variant != N::VARIANT {
            bail!(
                "config describes a {} model but a {} network was requested",
                config.variant,
                N::VARIANT
            );
        }
        if config.num_docs == 0 {
            bail!("cannot build a model for zero documents");
        }
        if config.embedding_size == 0 {
            bail!("embedding size must be at least 1");
        }
        if N::VARIANT == ModelVariant::Dm && config.window_size == 0 {
            bail!("dm needs a window size of at least 1 to have context words");
        }

        let net = N::init(&config, device);
        tracing::info!(
            "Built {} model: vocab={} docs={} dim={}",
            config.variant,
            config.vocab_size,
            config.num_docs,
            config.embedding_size
        );

        Ok(Self {
            config,
            net,
            device: device.clone(),
            step: None,
            frozen: Vec::new(),
        })
    }

    /// Rebuild a saved model from its config sidecar and weights.
    pub fn open(path: &Path, device: &B::Device) -> Result<Self> {
        let config = checkpoint::load_model_config(path)?;
        let mut model = Self::new(config, device)?;
        model.load(path)?;
        Ok(model)
    }

    pub fn config(&self) -> &Doc2VecConfig {
        &self.config
    }

    /// Used when resuming a saved model with a different rate.
    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.config.learning_rate = learning_rate;
    }

    pub fn is_frozen(&self, role: LayerRole) -> bool {
        self.frozen.contains(&role)
    }

    /// One row of `embedding_size` values per document.
    pub fn doc_embeddings(&self) -> Result<Vec<Vec<f32>>> {
        let values = tensor_values(self.net.doc_embeddings())?;
        Ok(values
            .chunks(self.config.embedding_size)
            .map(<[f32]>::to_vec)
            .collect())
    }

    fn check_role(&self, role: LayerRole) -> Result<()> {
        if !N::VARIANT.has_layer(role) {
            bail!("{} model has no {} layer", N::VARIANT, role);
        }
        Ok(())
    }
}

impl<B: AutodiffBackend, N: Doc2VecNet<B>> EmbeddingModel for Doc2VecModel<B, N> {
    type Batch   = N::Batch;
    type Weights = LayerWeights<B>;

    fn variant(&self) -> ModelVariant {
        N::VARIANT
    }

    fn compile(&mut self) {
        let mut optim = AdamConfig::new().with_epsilon(1e-8).init();
        let step: StepFn<N> = Box::new(move |lr: f64, net: N, grads: GradientsParams| {
            optim.step(lr, net, grads)
        });
        self.step = Some(step);
        tracing::debug!("Compiled {} model, frozen layers: {:?}", N::VARIANT, self.frozen);
    }

    fn train_step(&mut self, batch: N::Batch) -> Result<f64> {
        let step = self
            .step
            .as_mut()
            .ok_or_else(|| anyhow!("model must be compiled before training"))?;

        let loss  = self.net.forward_loss(&batch, &self.device);
        let value = loss.clone().into_scalar().elem::<f64>();

        let grads = GradientsParams::from_grads(loss.backward(), &self.net);
        self.net  = step(self.config.learning_rate, self.net.clone(), grads);

        Ok(value)
    }

    fn save(&self, path: &Path) -> Result<()> {
        checkpoint::ensure_parent_dir(path)?;
        checkpoint::save_model_config(&self.config, path)?;
        self.net
            .clone()
            .save_file(checkpoint::recorder_path(path), &ModelRecorder::new())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;
        tracing::debug!("Saved {} model to '{}'", N::VARIANT, path.display());
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let saved = checkpoint::load_model_config(path)?;
        if !saved.same_shape(&self.config) {
            bail!(
                "model at '{}' does not match this model's shape (saved: {}, expected: {})",
                path.display(),
                saved,
                self.config
            );
        }
        self.net = self
            .net
            .clone()
            .load_file(checkpoint::recorder_path(path), &ModelRecorder::new(), &self.device)
            .with_context(|| format!("Cannot load model from '{}'", path.display()))?;
        tracing::info!("Loaded {} model from '{}'", N::VARIANT, path.display());
        Ok(())
    }

    fn save_doc_embeddings(&self, path: &Path) -> Result<()> {
        checkpoint::write_embeddings(path, &self.doc_embeddings()?)
    }

    fn get_weights(&self, layer: LayerRole) -> Result<LayerWeights<B>> {
        self.check_role(layer)?;
        self.net
            .layer(layer)
            .ok_or_else(|| anyhow!("{} model has no {} layer", N::VARIANT, layer))
    }

    fn replace_weights(&mut self, layer: LayerRole, weights: LayerWeights<B>) -> Result<()> {
        self.check_role(layer)?;
        self.net = self
            .net
            .clone()
            .with_layer(layer, weights)
            .with_context(|| format!("Cannot replace {} weights", layer))?;
        Ok(())
    }

    fn freeze_layer(&mut self, layer: LayerRole) -> Result<()> {
        self.check_role(layer)?;
        if self.step.is_some() {
            tracing::warn!("Freezing {} after compile; re-run compile to reset the optimiser", layer);
        }
        self.net = self.net.clone().frozen(layer);
        if !self.frozen.contains(&layer) {
            self.frozen.push(layer);
        }
        Ok(())
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────
fn int_tensor<B: Backend, const D: usize>(
    values: &[u32],
    shape:  [usize; D],
    device: &B::Device,
) -> Tensor<B, D, Int> {
    let flat: Vec<i32> = values.iter().map(|&v| v as i32).collect();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape(shape)
}

fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read tensor values: {e:?}"))
}

fn embedding_weights<B: Backend>(layer: &Embedding<B>) -> LayerWeights<B> {
    LayerWeights {
        weight: layer.weight.val().detach(),
        bias:   None,
    }
}

fn linear_weights<B: Backend>(layer: &Linear<B>) -> LayerWeights<B> {
    LayerWeights {
        weight: layer.weight.val().detach(),
        bias:   layer.bias.as_ref().map(|b| b.val().detach()),
    }
}

fn set_embedding<B: Backend>(mut layer: Embedding<B>, weights: LayerWeights<B>) -> Result<Embedding<B>> {
    check_dims(layer.weight.val().dims(), weights.weight.dims())?;
    layer.weight = Param::from_tensor(weights.weight);
    Ok(layer)
}

fn set_linear<B: Backend>(mut layer: Linear<B>, weights: LayerWeights<B>) -> Result<Linear<B>> {
    check_dims(layer.weight.val().dims(), weights.weight.dims())?;
    layer.weight = Param::from_tensor(weights.weight);
    layer.bias   = match (layer.bias, weights.bias) {
        (Some(current), Some(bias)) => {
            check_dims(current.val().dims(), bias.dims())?;
            Some(Param::from_tensor(bias))
        }
        (None, None) => None,
        _ => bail!("bias presence differs between source and target layer"),
    };
    Ok(layer)
}

fn check_dims<const D: usize>(expected: [usize; D], got: [usize; D]) -> Result<()> {
    if expected != got {
        bail!("shape mismatch: layer is {:?}, weights are {:?}", expected, got);
    }
    Ok(())
}
